use crate::error::FixError;
use crate::fixers::{ChangeNote, FixContext, Fixer, FixerMeta, Mutation};
use termfix_types::{ActionType, Concept, Description, DescriptionType};

pub struct ReplaceTermFixer;

impl ReplaceTermFixer {
    const FIX_KEY: &'static str = "description.replace_term";
    const DESCRIPTION: &'static str = "Replaces a substring in active description terms";
    const PARAMS: &'static [&'static str] = &["find", "replace"];

    fn terms<'a>(ctx: &FixContext<'a>) -> Result<(&'a str, &'a str), FixError> {
        let find = ctx.require_param("find")?;
        let replace = ctx.param("replace").unwrap_or("");
        Ok((find, replace))
    }
}

impl Fixer for ReplaceTermFixer {
    fn meta(&self) -> FixerMeta {
        FixerMeta {
            fix_key: Self::FIX_KEY,
            description: Self::DESCRIPTION,
            params: Self::PARAMS,
        }
    }

    fn check_params(&self, ctx: &FixContext<'_>) -> Result<(), FixError> {
        let (find, replace) = Self::terms(ctx)?;
        if replace.contains(find) {
            // Every replaced term would match again. Matches formed across a replacement
            // boundary are caught per description in `apply`.
            return Err(FixError::Invalid(format!(
                "replacement '{}' contains the search text '{}'",
                replace, find
            )));
        }
        Ok(())
    }

    fn identify(&self, ctx: &FixContext<'_>, concept: &Concept) -> Result<bool, FixError> {
        let (find, _) = Self::terms(ctx)?;
        Ok(concept
            .descriptions
            .iter()
            .any(|d| d.active && d.term.contains(find)))
    }

    fn apply(&self, ctx: &FixContext<'_>, mut concept: Concept) -> Result<Mutation, FixError> {
        let (find, replace) = Self::terms(ctx)?;
        let mut changes = Vec::new();
        let mut added = Vec::new();

        for d in concept.descriptions.iter_mut() {
            if !d.active || !d.term.contains(find) {
                continue;
            }
            let new_term = d.term.replace(find, replace);
            if new_term.contains(find) {
                return Err(FixError::Invalid(format!(
                    "replacing '{}' in '{}' gives '{}', which still contains it",
                    find, d.term, new_term
                )));
            }
            if d.released {
                d.active = false;
                changes.push(ChangeNote::new(
                    ActionType::DescriptionInactivated,
                    format!("{}: {}", d.id.as_deref().unwrap_or("new"), d.term),
                ));
                let mut fresh = Description::new(new_term.clone(), d.kind);
                fresh.lang = d.lang.clone();
                fresh.acceptability = d.acceptability;
                added.push(fresh);
                changes.push(ChangeNote::new(ActionType::DescriptionAdded, new_term.clone()));
            } else {
                changes.push(ChangeNote::new(
                    ActionType::DescriptionChangeMade,
                    format!("{} -> {}", d.term, new_term),
                ));
                d.term = new_term.clone();
            }
            if d.kind == DescriptionType::Fsn {
                concept.fsn = new_term;
            }
        }
        concept.descriptions.extend(added);

        Ok(Mutation { concept, changes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixers::Params;
    use termfix_snapshot::Snapshot;

    fn params(find: &str, replace: &str) -> Params {
        [("find", find), ("replace", replace)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn released_descriptions_are_replaced_unreleased_edited() {
        let snap = Snapshot::from_concepts(vec![]).unwrap();
        let p = params("tumour", "tumor");
        let ctx = FixContext::new(&snap, &p);

        let concept = Concept::new(1, "Brain tumour (disorder)")
            .with_description(
                Description::new("Brain tumour (disorder)", DescriptionType::Fsn)
                    .with_id("d1")
                    .released(),
            )
            .with_description(Description::new("Brain tumour", DescriptionType::Synonym));

        assert!(ReplaceTermFixer.identify(&ctx, &concept).unwrap());
        let m = ReplaceTermFixer.apply(&ctx, concept).unwrap();
        assert_eq!(m.change_count(), 3);
        assert_eq!(m.concept.fsn, "Brain tumor (disorder)");
        assert_eq!(m.concept.descriptions.len(), 3);
        assert!(!m.concept.descriptions[0].active);
        assert_eq!(m.concept.descriptions[1].term, "Brain tumor");
        assert_eq!(m.concept.descriptions[2].term, "Brain tumor (disorder)");
        assert_eq!(m.concept.descriptions[2].kind, DescriptionType::Fsn);

        let again = ReplaceTermFixer.apply(&ctx, m.concept).unwrap();
        assert_eq!(again.change_count(), 0);
    }

    #[test]
    fn replacement_forming_a_new_match_is_invalid() {
        let snap = Snapshot::from_concepts(vec![]).unwrap();
        let p = params("ab", "b");
        let ctx = FixContext::new(&snap, &p);
        ReplaceTermFixer.check_params(&ctx).unwrap();

        let concept = Concept::new(1, "aab (finding)")
            .with_description(Description::new("aab (finding)", DescriptionType::Fsn));
        let err = ReplaceTermFixer.apply(&ctx, concept).unwrap_err();
        assert!(matches!(err, FixError::Invalid(ref reason) if reason.contains("still contains")));
    }

    #[test]
    fn non_converging_replacement_is_rejected() {
        let snap = Snapshot::from_concepts(vec![]).unwrap();
        let p = params("a", "aa");
        assert!(ReplaceTermFixer
            .check_params(&FixContext::new(&snap, &p))
            .is_err());

        let empty = Params::new();
        assert!(ReplaceTermFixer
            .check_params(&FixContext::new(&snap, &empty))
            .is_err());
    }
}
