use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Concept identifier (an SCTID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(pub u64);

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConceptId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(ConceptId)
    }
}

impl From<u64> for ConceptId {
    fn from(v: u64) -> Self {
        ConceptId(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefinitionStatus {
    #[default]
    Primitive,
    FullyDefined,
}

/// Whether an attribute was asserted by an author or derived by the classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacteristicType {
    #[default]
    Stated,
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipTarget {
    Concept(ConceptId),
    /// Literal concrete value, e.g. `#500` or `"tablet"`.
    Concrete(String),
}

impl RelationshipTarget {
    pub fn as_concept(&self) -> Option<ConceptId> {
        match self {
            RelationshipTarget::Concept(id) => Some(*id),
            RelationshipTarget::Concrete(_) => None,
        }
    }
}

impl fmt::Display for RelationshipTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipTarget::Concept(id) => write!(f, "{}", id),
            RelationshipTarget::Concrete(v) => write!(f, "{}", v),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// `None` until the server has assigned an id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub type_id: ConceptId,
    pub target: RelationshipTarget,

    #[serde(default)]
    pub characteristic: CharacteristicType,

    #[serde(default)]
    pub group: u16,

    #[serde(default = "default_true")]
    pub active: bool,

    /// Has appeared in a published release.
    #[serde(default)]
    pub released: bool,
}

impl Relationship {
    pub fn new(
        type_id: ConceptId,
        target: ConceptId,
        group: u16,
        characteristic: CharacteristicType,
    ) -> Self {
        Self {
            id: None,
            type_id,
            target: RelationshipTarget::Concept(target),
            characteristic,
            group,
            active: true,
            released: false,
        }
    }

    pub fn stated(type_id: ConceptId, target: ConceptId, group: u16) -> Self {
        Self::new(type_id, target, group, CharacteristicType::Stated)
    }

    pub fn inferred(type_id: ConceptId, target: ConceptId, group: u16) -> Self {
        Self::new(type_id, target, group, CharacteristicType::Inferred)
    }

    pub fn is_a(parent: ConceptId, characteristic: CharacteristicType) -> Self {
        Self::new(crate::ids::IS_A, parent, 0, characteristic)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn released(mut self) -> Self {
        self.released = true;
        self
    }

    pub fn is_is_a(&self) -> bool {
        self.type_id == crate::ids::IS_A
    }

    pub fn target_concept(&self) -> Option<ConceptId> {
        self.target.as_concept()
    }

    /// Identity used for the "no active duplicates" invariant.
    pub fn same_triple(&self, other: &Relationship) -> bool {
        self.type_id == other.type_id
            && self.target == other.target
            && self.group == other.group
            && self.characteristic == other.characteristic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DescriptionType {
    Fsn,
    #[default]
    Synonym,
    Definition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Acceptability {
    #[default]
    Preferred,
    Acceptable,
}

fn default_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub term: String,

    #[serde(default, rename = "type")]
    pub kind: DescriptionType,

    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub released: bool,

    #[serde(default)]
    pub acceptability: Acceptability,
}

impl Description {
    pub fn new(term: impl Into<String>, kind: DescriptionType) -> Self {
        Self {
            id: None,
            term: term.into(),
            kind,
            lang: default_lang(),
            active: true,
            released: false,
            acceptability: Acceptability::Preferred,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn released(mut self) -> Self {
        self.released = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,

    /// Fully specified name.
    pub fsn: String,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub definition_status: DefinitionStatus,

    #[serde(default)]
    pub released: bool,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    #[serde(default)]
    pub descriptions: Vec<Description>,
}

impl Concept {
    pub fn new(id: u64, fsn: impl Into<String>) -> Self {
        Self {
            id: ConceptId(id),
            fsn: fsn.into(),
            active: true,
            definition_status: DefinitionStatus::Primitive,
            released: false,
            relationships: vec![],
            descriptions: vec![],
        }
    }

    pub fn fully_defined(mut self) -> Self {
        self.definition_status = DefinitionStatus::FullyDefined;
        self
    }

    pub fn with_relationship(mut self, rel: Relationship) -> Self {
        self.relationships.push(rel);
        self
    }

    pub fn with_description(mut self, desc: Description) -> Self {
        self.descriptions.push(desc);
        self
    }

    /// Stated and inferred IS-A to each parent, the usual shape of a classified concept.
    pub fn with_parent(self, parent: ConceptId) -> Self {
        self.with_relationship(Relationship::is_a(parent, CharacteristicType::Stated))
            .with_relationship(Relationship::is_a(parent, CharacteristicType::Inferred))
    }

    pub fn is_primitive(&self) -> bool {
        self.definition_status == DefinitionStatus::Primitive
    }

    /// Trailing `(tag)` of the FSN, or `""` when the FSN carries none.
    pub fn semantic_tag(&self) -> &str {
        let fsn = self.fsn.trim_end();
        if !fsn.ends_with(')') {
            return "";
        }
        match fsn.rfind('(') {
            Some(start) => &fsn[start + 1..fsn.len() - 1],
            None => "",
        }
    }

    pub fn active_relationships(
        &self,
        characteristic: CharacteristicType,
    ) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.active && r.characteristic == characteristic)
    }

    /// Active IS-A targets, sorted and de-duplicated.
    pub fn parents(&self, characteristic: CharacteristicType) -> Vec<ConceptId> {
        let mut out: Vec<ConceptId> = self
            .active_relationships(characteristic)
            .filter(|r| r.is_is_a())
            .filter_map(Relationship::target_concept)
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn has_active_is_a(&self) -> bool {
        self.relationships.iter().any(|r| r.active && r.is_is_a())
    }

    /// Active relationships of one characteristic type grouped by group id, IS-A included.
    pub fn groups(&self, characteristic: CharacteristicType) -> Vec<RelationshipGroup> {
        RelationshipGroup::collect(self.active_relationships(characteristic), characteristic)
    }

    /// Like [`Concept::groups`] but without IS-A relationships.
    pub fn attribute_groups(&self, characteristic: CharacteristicType) -> Vec<RelationshipGroup> {
        RelationshipGroup::collect(
            self.active_relationships(characteristic)
                .filter(|r| !r.is_is_a()),
            characteristic,
        )
    }

    pub fn active_fsn(&self) -> Option<&Description> {
        self.descriptions
            .iter()
            .find(|d| d.active && d.kind == DescriptionType::Fsn)
    }
}

/// Relationships sharing a group id within one characteristic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipGroup {
    pub group_id: u16,
    pub characteristic: CharacteristicType,
    pub relationships: Vec<Relationship>,
}

impl RelationshipGroup {
    pub fn new(group_id: u16, characteristic: CharacteristicType) -> Self {
        Self {
            group_id,
            characteristic,
            relationships: vec![],
        }
    }

    pub fn with(mut self, rel: Relationship) -> Self {
        self.relationships.push(rel);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn is_self_grouped(&self) -> bool {
        self.group_id == 0
    }

    /// Group 0 behaves as one singleton group per relationship; other groups are returned as-is.
    pub fn into_singletons(self) -> Vec<RelationshipGroup> {
        if !self.is_self_grouped() {
            return vec![self];
        }
        let characteristic = self.characteristic;
        self.relationships
            .into_iter()
            .map(|r| RelationshipGroup::new(0, characteristic).with(r))
            .collect()
    }

    fn collect<'a>(
        rels: impl Iterator<Item = &'a Relationship>,
        characteristic: CharacteristicType,
    ) -> Vec<RelationshipGroup> {
        let mut by_group: BTreeMap<u16, RelationshipGroup> = BTreeMap::new();
        for r in rels {
            by_group
                .entry(r.group)
                .or_insert_with(|| RelationshipGroup::new(r.group, characteristic))
                .relationships
                .push(r.clone());
        }
        by_group.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IS_A;

    #[test]
    fn semantic_tag_extracts_trailing_parenthesis() {
        assert_eq!(Concept::new(1, "Asthma (disorder)").semantic_tag(), "disorder");
        assert_eq!(
            Concept::new(2, "Structure of (left) lung (body structure)").semantic_tag(),
            "body structure"
        );
        assert_eq!(Concept::new(3, "No tag here").semantic_tag(), "");
    }

    #[test]
    fn parents_are_sorted_and_active_only() {
        let mut inactive = Relationship::is_a(ConceptId(5), CharacteristicType::Stated);
        inactive.active = false;
        let c = Concept::new(1, "x (finding)")
            .with_relationship(Relationship::is_a(ConceptId(9), CharacteristicType::Stated))
            .with_relationship(Relationship::is_a(ConceptId(3), CharacteristicType::Stated))
            .with_relationship(inactive)
            .with_relationship(Relationship::is_a(ConceptId(7), CharacteristicType::Inferred));

        assert_eq!(
            c.parents(CharacteristicType::Stated),
            vec![ConceptId(3), ConceptId(9)]
        );
        assert_eq!(c.parents(CharacteristicType::Inferred), vec![ConceptId(7)]);
    }

    #[test]
    fn groups_split_by_group_id() {
        let c = Concept::new(1, "x (product)")
            .with_relationship(Relationship::stated(IS_A, ConceptId(2), 0))
            .with_relationship(Relationship::stated(ConceptId(10), ConceptId(11), 1))
            .with_relationship(Relationship::stated(ConceptId(12), ConceptId(13), 1))
            .with_relationship(Relationship::stated(ConceptId(10), ConceptId(14), 2));

        let groups = c.groups(CharacteristicType::Stated);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].group_id, 0);
        assert_eq!(groups[1].len(), 2);

        let attrs = c.attribute_groups(CharacteristicType::Stated);
        assert_eq!(attrs.len(), 2);
        assert!(attrs.iter().all(|g| g.group_id != 0));
    }

    #[test]
    fn self_grouped_expands_to_singletons() {
        let g = RelationshipGroup::new(0, CharacteristicType::Stated)
            .with(Relationship::stated(ConceptId(1), ConceptId(2), 0))
            .with(Relationship::stated(ConceptId(3), ConceptId(4), 0));
        assert_eq!(g.into_singletons().len(), 2);

        let g = RelationshipGroup::new(1, CharacteristicType::Stated)
            .with(Relationship::stated(ConceptId(1), ConceptId(2), 1))
            .with(Relationship::stated(ConceptId(3), ConceptId(4), 1));
        assert_eq!(g.into_singletons().len(), 1);
    }

    #[test]
    fn concept_id_parses_with_whitespace() {
        assert_eq!(" 123 ".parse::<ConceptId>().unwrap(), ConceptId(123));
        assert!("abc".parse::<ConceptId>().is_err());
    }
}
