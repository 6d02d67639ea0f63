use crate::error::SelectError;
use crate::fixers::{FixContext, Fixer};
use std::collections::BTreeSet;
use std::fmt;
use termfix_snapshot::{HierarchyQuery, Snapshot};
use termfix_types::{Concept, ConceptId};
use tracing::{debug, warn};

type Predicate = Box<dyn Fn(&Concept) -> bool + Send + Sync>;

/// How candidates are chosen.
pub enum SelectionRule {
    Explicit(Vec<ConceptId>),
    Query(String),
    Predicate(Predicate),
}

impl SelectionRule {
    pub fn predicate(f: impl Fn(&Concept) -> bool + Send + Sync + 'static) -> Self {
        SelectionRule::Predicate(Box::new(f))
    }
}

impl fmt::Debug for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::Explicit(ids) => f.debug_tuple("Explicit").field(&ids.len()).finish(),
            SelectionRule::Query(q) => f.debug_tuple("Query").field(q).finish(),
            SelectionRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Produces a deterministic candidate list from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ComponentSelector<'a> {
    snapshot: &'a Snapshot,
    include_inactive: bool,
}

impl<'a> ComponentSelector<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            include_inactive: false,
        }
    }

    pub fn include_inactive(mut self, yes: bool) -> Self {
        self.include_inactive = yes;
        self
    }

    /// Candidates sorted by semantic tag, then FSN, then id.
    pub fn select(&self, rule: &SelectionRule) -> Result<Vec<&'a Concept>, SelectError> {
        let mut out: Vec<&'a Concept> = match rule {
            SelectionRule::Explicit(ids) => {
                let unique: BTreeSet<ConceptId> = ids.iter().copied().collect();
                unique
                    .into_iter()
                    .filter_map(|id| {
                        let found = self.snapshot.get_concept(id);
                        if found.is_none() {
                            warn!(concept = %id, "explicit id not in snapshot; dropped");
                        }
                        found
                    })
                    .collect()
            }
            SelectionRule::Query(expr) => {
                let ids = HierarchyQuery::parse(expr)?.evaluate(self.snapshot)?;
                ids.into_iter()
                    .filter_map(|id| self.snapshot.get_concept(id))
                    .collect()
            }
            SelectionRule::Predicate(f) => self
                .snapshot
                .all_concepts()
                .iter()
                .filter(|c| f(c))
                .collect(),
        };

        if !self.include_inactive {
            out.retain(|c| {
                if !c.active {
                    debug!(concept = %c.id, "skipping inactive concept");
                }
                c.active
            });
        }

        out.sort_by(|a, b| {
            a.semantic_tag()
                .cmp(b.semantic_tag())
                .then_with(|| a.fsn.cmp(&b.fsn))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(out)
    }

    /// [`Self::select`], keeping only candidates the fixer still identifies as needing work.
    pub fn select_for(
        &self,
        rule: &SelectionRule,
        fixer: &dyn Fixer,
        ctx: &FixContext<'_>,
    ) -> Result<Vec<&'a Concept>, SelectError> {
        let all = self.select(rule)?;
        let total = all.len();
        let mut out = Vec::with_capacity(total);
        for c in all {
            let needed = fixer
                .identify(ctx, c)
                .map_err(|source| SelectError::Prefilter {
                    concept: c.id,
                    source,
                })?;
            if needed {
                out.push(c);
            } else {
                debug!(concept = %c.id, fix = fixer.meta().fix_key, "already satisfied; skipped");
            }
        }
        debug!(selected = out.len(), total, "pre-filter applied");
        Ok(out)
    }
}
