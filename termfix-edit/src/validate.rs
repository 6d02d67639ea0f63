use std::collections::BTreeSet;
use termfix_types::{CharacteristicType, Concept};

/// Check a mutated working copy against the loaded one.
///
/// Returns the first broken invariant as a human-readable reason.
pub fn validate_mutation(before: &Concept, after: &Concept) -> Result<(), String> {
    // Inferred rows are the classifier's; only stated parents keep a concept attached.
    if after.active
        && !before.parents(CharacteristicType::Stated).is_empty()
        && after.parents(CharacteristicType::Stated).is_empty()
    {
        return Err(format!(
            "concept {} would be left without an active stated IS-A relationship",
            after.id
        ));
    }

    let active: Vec<_> = after.relationships.iter().filter(|r| r.active).collect();
    for (i, a) in active.iter().enumerate() {
        if active[i + 1..].iter().any(|b| a.same_triple(b)) {
            return Err(format!(
                "duplicate active relationship {} -> {} (group {}, {:?})",
                a.type_id, a.target, a.group, a.characteristic
            ));
        }
    }

    let kept_rels: BTreeSet<&str> = after
        .relationships
        .iter()
        .filter_map(|r| r.id.as_deref())
        .collect();
    if let Some(gone) = before
        .relationships
        .iter()
        .filter(|r| r.released)
        .filter_map(|r| r.id.as_deref())
        .find(|id| !kept_rels.contains(id))
    {
        return Err(format!(
            "released relationship {} was removed; inactivate it instead",
            gone
        ));
    }

    let kept_descs: BTreeSet<&str> = after
        .descriptions
        .iter()
        .filter_map(|d| d.id.as_deref())
        .collect();
    if let Some(gone) = before
        .descriptions
        .iter()
        .filter(|d| d.released)
        .filter_map(|d| d.id.as_deref())
        .find(|id| !kept_descs.contains(id))
    {
        return Err(format!(
            "released description {} was removed; inactivate it instead",
            gone
        ));
    }

    if after.active && before.active_fsn().is_some() && after.active_fsn().is_none() {
        return Err(format!("concept {} would lose its active FSN", after.id));
    }

    Ok(())
}

/// Ids of unreleased components present in `before` and missing from `after`, relationships
/// first, each list in `before` order.
pub fn removed_components(before: &Concept, after: &Concept) -> Vec<String> {
    let rels: BTreeSet<&str> = after
        .relationships
        .iter()
        .filter_map(|r| r.id.as_deref())
        .collect();
    let descs: BTreeSet<&str> = after
        .descriptions
        .iter()
        .filter_map(|d| d.id.as_deref())
        .collect();

    let gone_rels = before
        .relationships
        .iter()
        .filter(|r| !r.released)
        .filter_map(|r| r.id.as_deref())
        .filter(|id| !rels.contains(id));
    let gone_descs = before
        .descriptions
        .iter()
        .filter(|d| !d.released)
        .filter_map(|d| d.id.as_deref())
        .filter(|id| !descs.contains(id));

    gone_rels.chain(gone_descs).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use termfix_types::{ConceptId, Description, DescriptionType, Relationship};

    fn base() -> Concept {
        Concept::new(1, "Asthma (disorder)")
            .with_relationship(
                Relationship::is_a(ConceptId(2), CharacteristicType::Stated)
                    .with_id("r1")
                    .released(),
            )
            .with_relationship(
                Relationship::stated(ConceptId(10), ConceptId(11), 1).with_id("r2"),
            )
            .with_description(
                Description::new("Asthma (disorder)", DescriptionType::Fsn)
                    .with_id("d1")
                    .released(),
            )
    }

    #[test]
    fn untouched_concept_is_valid() {
        assert_eq!(validate_mutation(&base(), &base()), Ok(()));
    }

    #[test]
    fn orphaning_is_rejected() {
        let mut after = base();
        after.relationships[0].active = false;
        let err = validate_mutation(&base(), &after).unwrap_err();
        assert!(err.contains("IS-A"));
    }

    #[test]
    fn inferred_parents_do_not_prevent_orphaning() {
        let before = Concept::new(5, "Wheeze (finding)").with_parent(ConceptId(2));
        let mut after = before.clone();
        for r in after
            .relationships
            .iter_mut()
            .filter(|r| r.characteristic == CharacteristicType::Stated)
        {
            r.active = false;
        }
        assert!(after.has_active_is_a());
        let err = validate_mutation(&before, &after).unwrap_err();
        assert!(err.contains("stated IS-A"));
    }

    #[test]
    fn duplicates_are_rejected() {
        let after = base().with_relationship(Relationship::stated(ConceptId(10), ConceptId(11), 1));
        assert!(validate_mutation(&base(), &after).unwrap_err().contains("duplicate"));

        let mut inactive = Relationship::stated(ConceptId(10), ConceptId(11), 1);
        inactive.active = false;
        assert_eq!(validate_mutation(&base(), &base().with_relationship(inactive)), Ok(()));
    }

    #[test]
    fn released_components_may_not_vanish() {
        let mut after = base().with_relationship(Relationship::is_a(
            ConceptId(3),
            CharacteristicType::Stated,
        ));
        after.relationships.remove(0);
        assert!(validate_mutation(&base(), &after).unwrap_err().contains("r1"));

        let mut after = base();
        after.descriptions.clear();
        assert!(validate_mutation(&base(), &after).unwrap_err().contains("d1"));
    }

    #[test]
    fn fsn_must_survive() {
        let mut after = base();
        after.descriptions[0].active = false;
        assert!(validate_mutation(&base(), &after).unwrap_err().contains("FSN"));
    }

    #[test]
    fn removed_lists_only_unreleased() {
        let mut after = base();
        after.relationships.remove(1);
        assert_eq!(removed_components(&base(), &after), vec!["r2".to_string()]);
        assert!(removed_components(&base(), &base()).is_empty());
    }
}
