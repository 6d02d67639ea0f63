use crate::concept::ConceptId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work: concepts edited together on one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub index: usize,
    pub branch: String,
    pub concepts: Vec<ConceptId>,

    /// Soft bound; dependency placement may exceed it.
    pub max_size: usize,

    /// `(a, b)`: `b` must sit in this task after `a`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<(ConceptId, ConceptId)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
}

impl Task {
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn contains(&self, id: ConceptId) -> bool {
        self.concepts.contains(&id)
    }

    pub fn position(&self, id: ConceptId) -> Option<usize> {
        self.concepts.iter().position(|c| *c == id)
    }

    pub fn is_oversized(&self) -> bool {
        self.concepts.len() > self.max_size
    }

    /// Deterministic id: v5(namespace, ordered concept ids).
    pub fn deterministic_id(concepts: &[ConceptId]) -> String {
        const NAMESPACE: Uuid = Uuid::from_bytes([
            0x7e, 0x21, 0x4a, 0x90, 0x3c, 0x55, 0x4f, 0x1b, 0x9d, 0x02, 0x6a, 0xe3, 0x18, 0x47,
            0xc0, 0x5f,
        ]);
        let key = concepts
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Uuid::new_v5(&NAMESPACE, key.as_bytes()).to_string()
    }
}

/// Ordered tasks covering every selected concept exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn concept_count(&self) -> usize {
        self.tasks.iter().map(Task::len).sum()
    }

    pub fn task_of(&self, id: ConceptId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_id_depends_on_order() {
        let a = Task::deterministic_id(&[ConceptId(1), ConceptId(2)]);
        let b = Task::deterministic_id(&[ConceptId(1), ConceptId(2)]);
        let c = Task::deterministic_id(&[ConceptId(2), ConceptId(1)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
