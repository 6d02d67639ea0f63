use crate::error::ClientError;
use termfix_types::{Concept, ConceptId};

/// Synchronous access to the terminology server. No retries at this layer.
pub trait TerminologyClient: Send + Sync {
    fn load_concept(&self, id: ConceptId, branch: &str) -> Result<Concept, ClientError>;

    /// Persist the whole concept. Returns the server's copy (new components get ids).
    fn update_concept(&self, concept: &Concept, branch: &str) -> Result<Concept, ClientError>;

    /// Delete one unreleased relationship or description by id.
    fn delete_component(&self, component_id: &str, branch: &str) -> Result<(), ClientError>;
}
