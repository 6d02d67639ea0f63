use crate::closure::ClosureCache;
use crate::error::{QueryError, SnapshotError};
use crate::query::HierarchyQuery;
use std::collections::{BTreeSet, HashMap};
use termfix_types::{CharacteristicType, Concept, ConceptId};
use tracing::info;

/// Immutable, bulk-loaded view of the ontology.
///
/// Holds every concept (active or not) sorted by id, plus one closure per characteristic type.
#[derive(Debug, Clone)]
pub struct Snapshot {
    concepts: Vec<Concept>,
    index: HashMap<ConceptId, usize>,
    stated: ClosureCache,
    inferred: ClosureCache,
}

impl Snapshot {
    pub fn from_concepts(mut concepts: Vec<Concept>) -> Result<Self, SnapshotError> {
        concepts.sort_by_key(|c| c.id);
        if let Some(w) = concepts.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(SnapshotError::DuplicateConcept(w[0].id));
        }

        let index = concepts
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        let stated = ClosureCache::build(&concepts, CharacteristicType::Stated)?;
        let inferred = ClosureCache::build(&concepts, CharacteristicType::Inferred)?;

        info!(concepts = concepts.len(), "snapshot loaded");
        Ok(Self {
            concepts,
            index,
            stated,
            inferred,
        })
    }

    /// Build a new snapshot from fresh concepts. Closures are rebuilt; `self` is untouched.
    pub fn reload(&self, concepts: Vec<Concept>) -> Result<Self, SnapshotError> {
        Self::from_concepts(concepts)
    }

    pub fn get_concept(&self, id: ConceptId) -> Option<&Concept> {
        self.index.get(&id).map(|i| &self.concepts[*i])
    }

    pub fn concept(&self, id: ConceptId) -> Result<&Concept, SnapshotError> {
        self.get_concept(id).ok_or(SnapshotError::UnknownConcept(id))
    }

    /// All concepts in id order.
    pub fn all_concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn contains(&self, id: ConceptId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn closure(&self, characteristic: CharacteristicType) -> &ClosureCache {
        match characteristic {
            CharacteristicType::Stated => &self.stated,
            CharacteristicType::Inferred => &self.inferred,
        }
    }

    /// The classified (inferred) hierarchy.
    pub fn hierarchy(&self) -> &ClosureCache {
        &self.inferred
    }

    /// Parse and evaluate a hierarchy expression against the inferred hierarchy.
    pub fn evaluate(&self, expr: &str) -> Result<BTreeSet<ConceptId>, QueryError> {
        HierarchyQuery::parse(expr)?.evaluate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_ids() {
        let err = Snapshot::from_concepts(vec![
            Concept::new(1, "A (x)"),
            Concept::new(1, "A again (x)"),
        ])
        .unwrap_err();
        assert_eq!(err, SnapshotError::DuplicateConcept(ConceptId(1)));
    }

    #[test]
    fn lookup_and_order() {
        let snap = Snapshot::from_concepts(vec![
            Concept::new(3, "C (x)").with_parent(ConceptId(1)),
            Concept::new(1, "A (x)"),
        ])
        .unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.all_concepts()[0].id, ConceptId(1));
        assert_eq!(snap.concept(ConceptId(3)).unwrap().fsn, "C (x)");
        assert!(snap.get_concept(ConceptId(2)).is_none());
        assert!(snap.hierarchy().is_ancestor(ConceptId(1), ConceptId(3)).unwrap());
    }

    #[test]
    fn reload_rebuilds_closures() {
        let snap = Snapshot::from_concepts(vec![
            Concept::new(1, "A (x)"),
            Concept::new(2, "B (x)"),
        ])
        .unwrap();
        assert!(!snap.hierarchy().is_ancestor(ConceptId(1), ConceptId(2)).unwrap());

        let next = snap
            .reload(vec![
                Concept::new(1, "A (x)"),
                Concept::new(2, "B (x)").with_parent(ConceptId(1)),
            ])
            .unwrap();
        assert!(next.hierarchy().is_ancestor(ConceptId(1), ConceptId(2)).unwrap());
        assert!(!snap.hierarchy().is_ancestor(ConceptId(1), ConceptId(2)).unwrap());
    }
}
