use crate::error::FixError;
use crate::subsumption::SubsumptionEngine;
use serde::Serialize;
use std::collections::BTreeMap;
use termfix_snapshot::Snapshot;
use termfix_types::{ActionType, Concept, ConceptId};

mod add_attribute;
mod redundant_parent;
mod remove_duplicates;
mod replace_term;

/// Fix parameters, `key=value` pairs from the config file and command line.
pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FixerMeta {
    pub fix_key: &'static str,
    pub description: &'static str,
    /// Parameter names the fixer reads. Optional ones end in `?`.
    pub params: &'static [&'static str],
}

/// Everything a fixer may read while deciding and applying a change.
#[derive(Debug, Clone)]
pub struct FixContext<'a> {
    pub snapshot: &'a Snapshot,
    pub params: &'a Params,
    pub subsumption: SubsumptionEngine<'a>,
}

impl<'a> FixContext<'a> {
    pub fn new(snapshot: &'a Snapshot, params: &'a Params) -> Self {
        Self {
            snapshot,
            params,
            subsumption: SubsumptionEngine::new(snapshot),
        }
    }

    pub fn param(&self, key: &str) -> Option<&'a str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn require_param(&self, key: &str) -> Result<&'a str, FixError> {
        self.param(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| FixError::Invalid(format!("missing parameter '{}'", key)))
    }

    pub fn concept_param(&self, key: &str) -> Result<ConceptId, FixError> {
        let raw = self.require_param(key)?;
        raw.parse::<ConceptId>()
            .map_err(|_| FixError::Invalid(format!("parameter '{}' is not a concept id: {}", key, raw)))
    }
}

/// One reportable change made by a fixer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNote {
    pub action: ActionType,
    pub detail: String,
}

impl ChangeNote {
    pub fn new(action: ActionType, detail: impl Into<String>) -> Self {
        Self {
            action,
            detail: detail.into(),
        }
    }
}

/// The mutated working copy and what changed on it.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub concept: Concept,
    pub changes: Vec<ChangeNote>,
}

impl Mutation {
    pub fn unchanged(concept: Concept) -> Self {
        Self {
            concept,
            changes: vec![],
        }
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

pub trait Fixer: Send + Sync {
    fn meta(&self) -> FixerMeta;

    /// Reject unusable parameters before any concept is touched.
    fn check_params(&self, _ctx: &FixContext<'_>) -> Result<(), FixError> {
        Ok(())
    }

    /// Whether `concept` (from the snapshot) still needs this fix.
    fn identify(&self, ctx: &FixContext<'_>, concept: &Concept) -> Result<bool, FixError>;

    /// Mutate a freshly loaded copy. Zero changes means nothing to do.
    fn apply(&self, ctx: &FixContext<'_>, concept: Concept) -> Result<Mutation, FixError>;

    /// `(a, b)` pairs: `b` must be edited in the same task as `a`, after it.
    fn dependencies(
        &self,
        _ctx: &FixContext<'_>,
        _candidates: &[&Concept],
    ) -> Vec<(ConceptId, ConceptId)> {
        vec![]
    }

    /// Key used to co-locate candidates when batching by key.
    fn group_key(&self, _ctx: &FixContext<'_>, concept: &Concept) -> Option<String> {
        Some(concept.semantic_tag().to_string())
    }
}

pub fn builtin_fixers() -> Vec<Box<dyn Fixer>> {
    vec![
        Box::new(replace_term::ReplaceTermFixer),
        Box::new(redundant_parent::RedundantParentFixer),
        Box::new(add_attribute::AddAttributeFixer),
        Box::new(remove_duplicates::RemoveDuplicatesFixer),
    ]
}

pub fn builtin_fixer_metas() -> Vec<FixerMeta> {
    let mut metas: Vec<FixerMeta> = builtin_fixers().iter().map(|f| f.meta()).collect();
    metas.sort_by_key(|m| m.fix_key);
    metas
}

pub fn find_fixer(fix_key: &str) -> Option<Box<dyn Fixer>> {
    builtin_fixers()
        .into_iter()
        .find(|f| f.meta().fix_key == fix_key)
}

/// Retire a relationship: released ones are inactivated, others dropped.
pub(crate) fn retire_relationship(concept: &mut Concept, idx: usize, changes: &mut Vec<ChangeNote>) {
    let rel = &mut concept.relationships[idx];
    let label = format!(
        "{} {} -> {} (group {})",
        rel.id.as_deref().unwrap_or("new"),
        rel.type_id,
        rel.target,
        rel.group
    );
    if rel.released {
        rel.active = false;
        changes.push(ChangeNote::new(ActionType::RelationshipInactivated, label));
    } else {
        concept.relationships.remove(idx);
        changes.push(ChangeNote::new(ActionType::RelationshipDeleted, label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_keys_are_unique_and_sorted() {
        let metas = builtin_fixer_metas();
        let keys: Vec<&str> = metas.iter().map(|m| m.fix_key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), builtin_fixers().len());
    }

    #[test]
    fn find_fixer_by_key() {
        assert!(find_fixer("relationship.remove_duplicates").is_some());
        assert!(find_fixer("nope").is_none());
    }

    #[test]
    fn retire_respects_release_status() {
        use termfix_types::{CharacteristicType, Relationship};
        let mut c = Concept::new(1, "x (finding)")
            .with_relationship(Relationship::is_a(ConceptId(2), CharacteristicType::Stated).released())
            .with_relationship(Relationship::is_a(ConceptId(3), CharacteristicType::Stated));
        let mut changes = vec![];
        retire_relationship(&mut c, 1, &mut changes);
        retire_relationship(&mut c, 0, &mut changes);
        assert_eq!(c.relationships.len(), 1);
        assert!(!c.relationships[0].active);
        assert_eq!(changes[0].action, ActionType::RelationshipDeleted);
        assert_eq!(changes[1].action, ActionType::RelationshipInactivated);
    }
}
