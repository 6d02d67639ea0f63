use std::collections::{BTreeMap, BTreeSet};
use termfix_snapshot::{ClosureCache, Snapshot, SnapshotError};
use termfix_types::{
    CharacteristicType, Concept, ConceptId, Relationship, RelationshipGroup, RelationshipTarget,
};
use tracing::trace;

/// Subsumption reasoning over one hierarchy of a [`Snapshot`].
///
/// Pure: every method reads the snapshot and returns. The only failure is a reference to a
/// concept the snapshot does not know.
#[derive(Debug, Clone)]
pub struct SubsumptionEngine<'a> {
    snapshot: &'a Snapshot,
    characteristic: CharacteristicType,
    group_insensitive: BTreeSet<ConceptId>,
}

impl<'a> SubsumptionEngine<'a> {
    /// Engine over the inferred hierarchy.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            characteristic: CharacteristicType::Inferred,
            group_insensitive: BTreeSet::new(),
        }
    }

    pub fn with_characteristic(mut self, characteristic: CharacteristicType) -> Self {
        self.characteristic = characteristic;
        self
    }

    /// Attribute types matched on (type, target) alone by [`Self::find_equivalent_concept`].
    pub fn with_group_insensitive(mut self, types: impl IntoIterator<Item = ConceptId>) -> Self {
        self.group_insensitive.extend(types);
        self
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    fn closure(&self) -> &'a ClosureCache {
        self.snapshot.closure(self.characteristic)
    }

    /// `reference` is at least as general as `candidate`.
    pub fn is_relationship_subsumed_by(
        &self,
        candidate: &Relationship,
        reference: &Relationship,
    ) -> Result<bool, SnapshotError> {
        let closure = self.closure();
        if !closure.is_ancestor_or_self(reference.type_id, candidate.type_id)? {
            return Ok(false);
        }
        match (&candidate.target, &reference.target) {
            (RelationshipTarget::Concept(c), RelationshipTarget::Concept(r)) => {
                closure.is_ancestor_or_self(*r, *c)
            }
            (RelationshipTarget::Concrete(c), RelationshipTarget::Concrete(r)) => Ok(c == r),
            _ => Ok(false),
        }
    }

    /// Every relationship of `candidate` has a subsuming counterpart in `reference`.
    pub fn is_group_subsumed_by(
        &self,
        candidate: &RelationshipGroup,
        reference: &RelationshipGroup,
    ) -> Result<bool, SnapshotError> {
        for r in candidate.iter() {
            let mut found = false;
            for s in reference.iter() {
                if self.is_relationship_subsumed_by(r, s)? {
                    found = true;
                    break;
                }
            }
            if !found {
                trace!(type_id = %r.type_id, target = %r.target, "no subsuming counterpart");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Each candidate group is subsumed by some reference group. Group 0 on either side is
    /// treated as one singleton group per relationship.
    pub fn is_concept_subsumed_by(
        &self,
        candidate: &[RelationshipGroup],
        reference: &[RelationshipGroup],
    ) -> Result<bool, SnapshotError> {
        let candidate = expand(candidate);
        let reference = expand(reference);
        for c in &candidate {
            let mut found = false;
            for r in &reference {
                if self.is_group_subsumed_by(c, r)? {
                    found = true;
                    break;
                }
            }
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Most specific primitive ancestors of `concept`, sorted by id.
    ///
    /// Ancestors are taken through the concept's own IS-A parents, so a working copy whose
    /// parents differ from the snapshot is handled.
    pub fn proximal_primitive_parents(
        &self,
        concept: &Concept,
    ) -> Result<Vec<ConceptId>, SnapshotError> {
        let closure = self.closure();
        let mut ancestors = BTreeSet::new();
        for parent in concept.parents(self.characteristic) {
            ancestors.extend(closure.ancestors_or_self(parent)?);
        }

        let mut primitives = Vec::new();
        for id in ancestors {
            let c = self.snapshot.concept(id)?;
            if c.active && c.is_primitive() {
                primitives.push(id);
            }
        }

        let mut out = Vec::with_capacity(primitives.len());
        for &p in &primitives {
            let mut redundant = false;
            for &q in &primitives {
                if p != q && closure.is_ancestor(p, q)? {
                    redundant = true;
                    break;
                }
            }
            if !redundant {
                out.push(p);
            }
        }
        Ok(out)
    }

    /// A primitive concept sitting below a fully-defined one.
    pub fn is_intermediate_primitive(&self, id: ConceptId) -> Result<bool, SnapshotError> {
        for a in self.closure().ancestors(id)? {
            if !self.snapshot.concept(a)?.is_primitive() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Proximal primitive parents that are intermediate.
    pub fn intermediate_primitives(
        &self,
        concept: &Concept,
    ) -> Result<Vec<ConceptId>, SnapshotError> {
        let mut out = Vec::new();
        for p in self.proximal_primitive_parents(concept)? {
            if self.is_intermediate_primitive(p)? {
                out.push(p);
            }
        }
        Ok(out)
    }

    /// First concept in `known` (other than `candidate` itself) whose stated definition
    /// matches the candidate's.
    pub fn find_equivalent_concept<'k>(
        &self,
        candidate: &Concept,
        known: impl IntoIterator<Item = &'k Concept>,
    ) -> Option<&'k Concept> {
        let signature = structural_signature(candidate);
        known.into_iter().find(|k| {
            k.id != candidate.id
                && k.active
                && structural_signature(k) == signature
                && self.matches_definition(candidate, k)
        })
    }

    fn matches_definition(&self, candidate: &Concept, known: &Concept) -> bool {
        let cand = stated(candidate);
        let other = stated(known);

        let insensitive = |r: &&Relationship| self.group_insensitive.contains(&r.type_id);
        let other_loose: BTreeSet<(ConceptId, &RelationshipTarget)> = other
            .iter()
            .copied()
            .filter(insensitive)
            .map(|r| (r.type_id, &r.target))
            .collect();
        if !cand
            .iter()
            .copied()
            .filter(insensitive)
            .all(|r| other_loose.contains(&(r.type_id, &r.target)))
        {
            return false;
        }

        let sensitive = |r: &&Relationship| !self.group_insensitive.contains(&r.type_id);
        let other_zero: BTreeSet<(ConceptId, &RelationshipTarget)> = other
            .iter()
            .copied()
            .filter(sensitive)
            .filter(|r| r.group == 0)
            .map(|r| (r.type_id, &r.target))
            .collect();
        if !cand
            .iter()
            .copied()
            .filter(sensitive)
            .filter(|r| r.group == 0)
            .all(|r| other_zero.contains(&(r.type_id, &r.target)))
        {
            return false;
        }

        let other_groups = keyed_groups(&other, &self.group_insensitive);
        keyed_groups(&cand, &self.group_insensitive)
            .iter()
            .all(|g| other_groups.contains(g))
    }
}

fn expand(groups: &[RelationshipGroup]) -> Vec<RelationshipGroup> {
    groups
        .iter()
        .cloned()
        .flat_map(RelationshipGroup::into_singletons)
        .collect()
}

fn stated(concept: &Concept) -> Vec<&Relationship> {
    concept
        .active_relationships(CharacteristicType::Stated)
        .collect()
}

/// Non-zero groups as sorted (type, target) lists, group numbers dropped.
fn keyed_groups<'r>(
    rels: &[&'r Relationship],
    insensitive: &BTreeSet<ConceptId>,
) -> Vec<Vec<(ConceptId, &'r RelationshipTarget)>> {
    let mut by_group: BTreeMap<u16, Vec<(ConceptId, &RelationshipTarget)>> = BTreeMap::new();
    for r in rels {
        if r.group != 0 && !insensitive.contains(&r.type_id) {
            by_group
                .entry(r.group)
                .or_default()
                .push((r.type_id, &r.target));
        }
    }
    by_group
        .into_values()
        .map(|mut g| {
            g.sort();
            g
        })
        .collect()
}

/// Wrapping sum of `type + target` over the active stated relationships of a concept.
///
/// Equal definitions always have equal signatures; the converse needs a full comparison.
pub fn structural_signature(concept: &Concept) -> u64 {
    concept
        .active_relationships(CharacteristicType::Stated)
        .fold(0u64, |acc, r| {
            let target = match &r.target {
                RelationshipTarget::Concept(id) => id.0,
                RelationshipTarget::Concrete(v) => fnv1a(v.as_bytes()),
            };
            acc.wrapping_add(r.type_id.0.wrapping_add(target))
        })
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(PRIME))
}
