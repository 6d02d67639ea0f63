use crate::error::FixError;
use crate::fixers::{FixContext, Fixer, FixerMeta, Mutation, retire_relationship};
use std::collections::BTreeSet;
use termfix_types::{CharacteristicType, Concept, ConceptId};
use tracing::debug;

/// Drops stated IS-A parents already implied by another stated parent.
pub struct RedundantParentFixer;

impl RedundantParentFixer {
    const FIX_KEY: &'static str = "relationship.remove_redundant_parent";
    const DESCRIPTION: &'static str =
        "Removes stated parents that are ancestors of another stated parent";

    fn redundant(ctx: &FixContext<'_>, concept: &Concept) -> Result<BTreeSet<ConceptId>, FixError> {
        let closure = ctx.snapshot.closure(CharacteristicType::Stated);
        let parents = concept.parents(CharacteristicType::Stated);
        let mut out = BTreeSet::new();
        for &p in &parents {
            for &q in &parents {
                if p != q && closure.is_ancestor(p, q)? {
                    out.insert(p);
                    break;
                }
            }
        }
        Ok(out)
    }
}

impl Fixer for RedundantParentFixer {
    fn meta(&self) -> FixerMeta {
        FixerMeta {
            fix_key: Self::FIX_KEY,
            description: Self::DESCRIPTION,
            params: &[],
        }
    }

    fn identify(&self, ctx: &FixContext<'_>, concept: &Concept) -> Result<bool, FixError> {
        Ok(concept.active && !Self::redundant(ctx, concept)?.is_empty())
    }

    fn apply(&self, ctx: &FixContext<'_>, mut concept: Concept) -> Result<Mutation, FixError> {
        let redundant = Self::redundant(ctx, &concept)?;
        let mut changes = Vec::new();

        // Walk backwards so removals do not shift pending indices.
        for idx in (0..concept.relationships.len()).rev() {
            let r = &concept.relationships[idx];
            let hit = r.active
                && r.is_is_a()
                && r.characteristic == CharacteristicType::Stated
                && r.target_concept().is_some_and(|t| redundant.contains(&t));
            if hit {
                debug!(concept = %concept.id, parent = %r.target, "redundant stated parent");
                retire_relationship(&mut concept, idx, &mut changes);
            }
        }
        changes.reverse();

        Ok(Mutation { concept, changes })
    }

    /// A candidate's stated parent is fixed before the candidate.
    fn dependencies(
        &self,
        _ctx: &FixContext<'_>,
        candidates: &[&Concept],
    ) -> Vec<(ConceptId, ConceptId)> {
        let ids: BTreeSet<ConceptId> = candidates.iter().map(|c| c.id).collect();
        let mut out = Vec::new();
        for c in candidates {
            for p in c.parents(CharacteristicType::Stated) {
                if ids.contains(&p) {
                    out.push((p, c.id));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixers::Params;
    use termfix_snapshot::Snapshot;
    use termfix_types::{ActionType, Relationship};

    fn snapshot() -> Snapshot {
        Snapshot::from_concepts(vec![
            Concept::new(1, "Disease (disorder)"),
            Concept::new(2, "Lung disease (disorder)").with_parent(ConceptId(1)),
            Concept::new(3, "Asthma (disorder)")
                .with_relationship(
                    Relationship::is_a(ConceptId(1), CharacteristicType::Stated)
                        .with_id("r1")
                        .released(),
                )
                .with_relationship(Relationship::is_a(ConceptId(2), CharacteristicType::Stated))
                .with_relationship(Relationship::is_a(ConceptId(2), CharacteristicType::Inferred)),
        ])
        .unwrap()
    }

    #[test]
    fn inactivates_implied_parent() {
        let snap = snapshot();
        let params = Params::new();
        let ctx = FixContext::new(&snap, &params);
        let asthma = snap.concept(ConceptId(3)).unwrap().clone();

        assert!(RedundantParentFixer.identify(&ctx, &asthma).unwrap());
        let m = RedundantParentFixer.apply(&ctx, asthma).unwrap();
        assert_eq!(m.change_count(), 1);
        assert_eq!(m.changes[0].action, ActionType::RelationshipInactivated);
        assert_eq!(
            m.concept.parents(CharacteristicType::Stated),
            vec![ConceptId(2)]
        );

        assert!(!RedundantParentFixer.identify(&ctx, &m.concept).unwrap());
    }

    #[test]
    fn parents_precede_children() {
        let snap = snapshot();
        let params = Params::new();
        let ctx = FixContext::new(&snap, &params);
        let all: Vec<&Concept> = snap.all_concepts().iter().collect();
        let deps = RedundantParentFixer.dependencies(&ctx, &all);
        assert_eq!(
            deps,
            vec![
                (ConceptId(1), ConceptId(2)),
                (ConceptId(1), ConceptId(3)),
                (ConceptId(2), ConceptId(3)),
            ]
        );
    }
}
