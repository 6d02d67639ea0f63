use crate::error::SnapshotError;
use std::collections::{BTreeSet, HashMap, VecDeque};
use termfix_types::{CharacteristicType, Concept, ConceptId};
use tracing::{debug, warn};

/// Transitive closure of one IS-A hierarchy.
///
/// Concepts are addressed by dense indices; each node stores its strict ancestors and
/// descendants as sorted index lists, so membership is a binary search over a short list.
/// Built once per snapshot and never mutated.
#[derive(Debug, Clone)]
pub struct ClosureCache {
    characteristic: CharacteristicType,
    ids: Vec<ConceptId>,
    index: HashMap<ConceptId, u32>,
    parents: Vec<Vec<u32>>,
    children: Vec<Vec<u32>>,
    ancestors: Vec<Vec<u32>>,
    descendants: Vec<Vec<u32>>,
}

impl ClosureCache {
    /// Build from active IS-A relationships of `characteristic` on active concepts.
    ///
    /// Edges to concepts missing from `concepts` are dropped. Fails on a cycle.
    pub fn build(
        concepts: &[Concept],
        characteristic: CharacteristicType,
    ) -> Result<Self, SnapshotError> {
        let ids: Vec<ConceptId> = concepts.iter().map(|c| c.id).collect();
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(*id, i as u32).is_some() {
                return Err(SnapshotError::DuplicateConcept(*id));
            }
        }

        let n = ids.len();
        let mut parents: Vec<Vec<u32>> = vec![Vec::new(); n];
        let mut children: Vec<Vec<u32>> = vec![Vec::new(); n];
        for (i, concept) in concepts.iter().enumerate() {
            if !concept.active {
                continue;
            }
            for parent in concept.parents(characteristic) {
                match index.get(&parent) {
                    Some(&p) if p as usize != i => {
                        parents[i].push(p);
                        children[p as usize].push(i as u32);
                    }
                    Some(_) => return Err(SnapshotError::Cycle(concept.id)),
                    None => {
                        warn!(concept = %concept.id, parent = %parent, "dropping IS-A to unknown parent");
                    }
                }
            }
        }
        for list in children.iter_mut() {
            list.sort_unstable();
            list.dedup();
        }

        let order = topological_order(&parents, &children)
            .map_err(|i| SnapshotError::Cycle(ids[i]))?;

        let mut ancestors: Vec<Vec<u32>> = vec![Vec::new(); n];
        for &node in &order {
            let mut acc: Vec<u32> = Vec::new();
            for &p in &parents[node] {
                acc.push(p);
                acc.extend_from_slice(&ancestors[p as usize]);
            }
            acc.sort_unstable();
            acc.dedup();
            ancestors[node] = acc;
        }

        let mut descendants: Vec<Vec<u32>> = vec![Vec::new(); n];
        for (node, ancs) in ancestors.iter().enumerate() {
            for &a in ancs {
                descendants[a as usize].push(node as u32);
            }
        }

        debug!(
            concepts = n,
            characteristic = ?characteristic,
            "built closure cache"
        );

        Ok(Self {
            characteristic,
            ids,
            index,
            parents,
            children,
            ancestors,
            descendants,
        })
    }

    pub fn characteristic(&self) -> CharacteristicType {
        self.characteristic
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ConceptId) -> bool {
        self.index.contains_key(&id)
    }

    fn idx(&self, id: ConceptId) -> Result<usize, SnapshotError> {
        self.index
            .get(&id)
            .map(|i| *i as usize)
            .ok_or(SnapshotError::UnknownConcept(id))
    }

    fn to_ids(&self, list: &[u32]) -> BTreeSet<ConceptId> {
        list.iter().map(|i| self.ids[*i as usize]).collect()
    }

    pub fn parents(&self, id: ConceptId) -> Result<BTreeSet<ConceptId>, SnapshotError> {
        let i = self.idx(id)?;
        Ok(self.to_ids(&self.parents[i]))
    }

    pub fn children(&self, id: ConceptId) -> Result<BTreeSet<ConceptId>, SnapshotError> {
        let i = self.idx(id)?;
        Ok(self.to_ids(&self.children[i]))
    }

    /// Strict ancestors.
    pub fn ancestors(&self, id: ConceptId) -> Result<BTreeSet<ConceptId>, SnapshotError> {
        let i = self.idx(id)?;
        Ok(self.to_ids(&self.ancestors[i]))
    }

    /// Strict descendants.
    pub fn descendants(&self, id: ConceptId) -> Result<BTreeSet<ConceptId>, SnapshotError> {
        let i = self.idx(id)?;
        Ok(self.to_ids(&self.descendants[i]))
    }

    pub fn ancestors_or_self(&self, id: ConceptId) -> Result<BTreeSet<ConceptId>, SnapshotError> {
        let mut out = self.ancestors(id)?;
        out.insert(id);
        Ok(out)
    }

    pub fn descendants_or_self(
        &self,
        id: ConceptId,
    ) -> Result<BTreeSet<ConceptId>, SnapshotError> {
        let mut out = self.descendants(id)?;
        out.insert(id);
        Ok(out)
    }

    /// `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: ConceptId, id: ConceptId) -> Result<bool, SnapshotError> {
        let a = self.idx(ancestor)? as u32;
        let i = self.idx(id)?;
        Ok(self.ancestors[i].binary_search(&a).is_ok())
    }

    pub fn is_ancestor_or_self(
        &self,
        ancestor: ConceptId,
        id: ConceptId,
    ) -> Result<bool, SnapshotError> {
        if ancestor == id {
            self.idx(id)?;
            return Ok(true);
        }
        self.is_ancestor(ancestor, id)
    }
}

/// Kahn's algorithm, roots first. `Err` carries a node left on a cycle.
fn topological_order(parents: &[Vec<u32>], children: &[Vec<u32>]) -> Result<Vec<usize>, usize> {
    let n = parents.len();
    let mut pending: Vec<usize> = parents
        .iter()
        .map(|p| {
            let mut p = p.clone();
            p.sort_unstable();
            p.dedup();
            p.len()
        })
        .collect();

    let mut queue: VecDeque<usize> = (0..n).filter(|i| pending[*i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &c in &children[node] {
            let c = c as usize;
            pending[c] -= 1;
            if pending[c] == 0 {
                queue.push_back(c);
            }
        }
    }

    if order.len() < n {
        let stuck = (0..n).find(|i| pending[*i] > 0).unwrap_or(0);
        return Err(stuck);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use termfix_types::CharacteristicType::Inferred;

    fn diamond() -> Vec<Concept> {
        //     1
        //    / \
        //   2   3
        //    \ /
        //     4
        vec![
            Concept::new(1, "Root (root)"),
            Concept::new(2, "Left (finding)").with_parent(ConceptId(1)),
            Concept::new(3, "Right (finding)").with_parent(ConceptId(1)),
            Concept::new(4, "Bottom (finding)")
                .with_parent(ConceptId(2))
                .with_parent(ConceptId(3)),
        ]
    }

    #[test]
    fn diamond_closure() {
        let cache = ClosureCache::build(&diamond(), Inferred).unwrap();

        let anc: Vec<u64> = cache
            .ancestors(ConceptId(4))
            .unwrap()
            .into_iter()
            .map(|c| c.0)
            .collect();
        assert_eq!(anc, vec![1, 2, 3]);

        let desc: Vec<u64> = cache
            .descendants_or_self(ConceptId(1))
            .unwrap()
            .into_iter()
            .map(|c| c.0)
            .collect();
        assert_eq!(desc, vec![1, 2, 3, 4]);

        assert!(cache.is_ancestor(ConceptId(1), ConceptId(4)).unwrap());
        assert!(!cache.is_ancestor(ConceptId(4), ConceptId(1)).unwrap());
        assert!(!cache.is_ancestor(ConceptId(2), ConceptId(3)).unwrap());
        assert!(cache.is_ancestor_or_self(ConceptId(3), ConceptId(3)).unwrap());
    }

    #[test]
    fn unknown_concept_is_an_error() {
        let cache = ClosureCache::build(&diamond(), Inferred).unwrap();
        assert_eq!(
            cache.ancestors(ConceptId(99)),
            Err(SnapshotError::UnknownConcept(ConceptId(99)))
        );
        assert!(cache.is_ancestor_or_self(ConceptId(99), ConceptId(99)).is_err());
    }

    #[test]
    fn cycle_is_detected() {
        let concepts = vec![
            Concept::new(1, "A (x)").with_parent(ConceptId(2)),
            Concept::new(2, "B (x)").with_parent(ConceptId(1)),
        ];
        assert!(matches!(
            ClosureCache::build(&concepts, Inferred),
            Err(SnapshotError::Cycle(_))
        ));
    }

    #[test]
    fn inactive_concepts_contribute_no_edges() {
        let mut concepts = diamond();
        concepts[3].active = false;
        let cache = ClosureCache::build(&concepts, Inferred).unwrap();
        assert!(cache.ancestors(ConceptId(4)).unwrap().is_empty());
        assert!(cache.contains(ConceptId(4)));
    }

    #[test]
    fn stated_and_inferred_hierarchies_are_independent() {
        let concepts = vec![
            Concept::new(1, "Root (root)"),
            Concept::new(2, "Mid (x)").with_parent(ConceptId(1)),
            Concept::new(3, "Leaf (x)").with_relationship(termfix_types::Relationship::is_a(
                ConceptId(2),
                CharacteristicType::Stated,
            )),
        ];
        let stated = ClosureCache::build(&concepts, CharacteristicType::Stated).unwrap();
        let inferred = ClosureCache::build(&concepts, Inferred).unwrap();
        assert!(stated.is_ancestor(ConceptId(1), ConceptId(3)).unwrap());
        assert!(!inferred.is_ancestor(ConceptId(1), ConceptId(3)).unwrap());
    }
}
