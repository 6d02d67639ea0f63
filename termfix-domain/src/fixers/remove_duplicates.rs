use crate::error::FixError;
use crate::fixers::{FixContext, Fixer, FixerMeta, Mutation, retire_relationship};
use termfix_types::Concept;

/// Retires active relationships that repeat another active one.
pub struct RemoveDuplicatesFixer;

impl RemoveDuplicatesFixer {
    const FIX_KEY: &'static str = "relationship.remove_duplicates";
    const DESCRIPTION: &'static str =
        "Removes active duplicate relationships, keeping a released copy when there is one";

    /// Indices to retire, in ascending order.
    fn duplicates(concept: &Concept) -> Vec<usize> {
        let rels = &concept.relationships;
        let mut retire = Vec::new();
        let mut seen = vec![false; rels.len()];
        for i in 0..rels.len() {
            if seen[i] || !rels[i].active {
                continue;
            }
            let same: Vec<usize> = (i..rels.len())
                .filter(|&j| rels[j].active && rels[j].same_triple(&rels[i]))
                .collect();
            for &j in &same {
                seen[j] = true;
            }
            if same.len() < 2 {
                continue;
            }
            let keep = same
                .iter()
                .copied()
                .find(|&j| rels[j].released)
                .unwrap_or(same[0]);
            retire.extend(same.into_iter().filter(|&j| j != keep));
        }
        retire.sort_unstable();
        retire
    }
}

impl Fixer for RemoveDuplicatesFixer {
    fn meta(&self) -> FixerMeta {
        FixerMeta {
            fix_key: Self::FIX_KEY,
            description: Self::DESCRIPTION,
            params: &[],
        }
    }

    fn identify(&self, _ctx: &FixContext<'_>, concept: &Concept) -> Result<bool, FixError> {
        Ok(!Self::duplicates(concept).is_empty())
    }

    fn apply(&self, _ctx: &FixContext<'_>, mut concept: Concept) -> Result<Mutation, FixError> {
        let mut changes = Vec::new();
        for idx in Self::duplicates(&concept).into_iter().rev() {
            retire_relationship(&mut concept, idx, &mut changes);
        }
        changes.reverse();
        Ok(Mutation { concept, changes })
    }
}
