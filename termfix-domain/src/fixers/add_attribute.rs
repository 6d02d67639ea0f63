use crate::error::FixError;
use crate::fixers::{ChangeNote, FixContext, Fixer, FixerMeta, Mutation};
use termfix_types::{ActionType, CharacteristicType, Concept, Relationship, RelationshipGroup};

/// Adds one stated attribute unless the concept already states it or something more specific.
pub struct AddAttributeFixer;

impl AddAttributeFixer {
    const FIX_KEY: &'static str = "relationship.add_attribute";
    const DESCRIPTION: &'static str =
        "Adds a stated attribute unless an equal or more specific one is already stated";
    const PARAMS: &'static [&'static str] = &["type", "target", "group?"];

    fn proposal(ctx: &FixContext<'_>) -> Result<Relationship, FixError> {
        let type_id = ctx.concept_param("type")?;
        let target = ctx.concept_param("target")?;
        let group = match ctx.param("group") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| FixError::Invalid(format!("parameter 'group' is not a number: {}", raw)))?,
            None => 0,
        };
        Ok(Relationship::stated(type_id, target, group))
    }

    /// Some stated attribute, taken as its own group, is subsumed by the proposal.
    fn satisfied(
        ctx: &FixContext<'_>,
        concept: &Concept,
        proposal: &Relationship,
    ) -> Result<bool, FixError> {
        let wanted = RelationshipGroup::new(proposal.group, CharacteristicType::Stated)
            .with(proposal.clone());
        let attributes = concept
            .active_relationships(CharacteristicType::Stated)
            .filter(|r| !r.is_is_a());
        for r in attributes {
            let single = RelationshipGroup::new(r.group, CharacteristicType::Stated).with(r.clone());
            if ctx.subsumption.is_group_subsumed_by(&single, &wanted)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Fixer for AddAttributeFixer {
    fn meta(&self) -> FixerMeta {
        FixerMeta {
            fix_key: Self::FIX_KEY,
            description: Self::DESCRIPTION,
            params: Self::PARAMS,
        }
    }

    fn check_params(&self, ctx: &FixContext<'_>) -> Result<(), FixError> {
        let p = Self::proposal(ctx)?;
        for id in [p.type_id, p.target_concept().unwrap_or(p.type_id)] {
            if !ctx.snapshot.contains(id) {
                return Err(FixError::Invalid(format!("concept {} is not in the snapshot", id)));
            }
        }
        Ok(())
    }

    fn identify(&self, ctx: &FixContext<'_>, concept: &Concept) -> Result<bool, FixError> {
        let p = Self::proposal(ctx)?;
        Ok(concept.active && !Self::satisfied(ctx, concept, &p)?)
    }

    fn apply(&self, ctx: &FixContext<'_>, mut concept: Concept) -> Result<Mutation, FixError> {
        let p = Self::proposal(ctx)?;
        if Self::satisfied(ctx, &concept, &p)? {
            return Ok(Mutation::unchanged(concept));
        }
        let note = ChangeNote::new(
            ActionType::RelationshipAdded,
            format!("{} -> {} (group {})", p.type_id, p.target, p.group),
        );
        concept.relationships.push(p);
        Ok(Mutation {
            concept,
            changes: vec![note],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixers::Params;
    use termfix_snapshot::Snapshot;
    use termfix_types::ConceptId;

    const ATTR: ConceptId = ConceptId(10);
    const SUBSTANCE: ConceptId = ConceptId(20);
    const ANALGESIC: ConceptId = ConceptId(21);
    const PARACETAMOL: ConceptId = ConceptId(22);

    fn snapshot() -> Snapshot {
        Snapshot::from_concepts(vec![
            Concept::new(1, "Root (root)"),
            Concept::new(ATTR.0, "Has ingredient (attribute)").with_parent(ConceptId(1)),
            Concept::new(SUBSTANCE.0, "Substance (substance)").with_parent(ConceptId(1)),
            Concept::new(ANALGESIC.0, "Analgesic (substance)").with_parent(SUBSTANCE),
            Concept::new(PARACETAMOL.0, "Paracetamol (substance)").with_parent(ANALGESIC),
            Concept::new(30, "Paracetamol product (product)").with_parent(ConceptId(1)),
        ])
        .unwrap()
    }

    fn params(target: ConceptId) -> Params {
        [("type", ATTR.to_string()), ("target", target.to_string()), ("group", "1".into())]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn adds_missing_attribute_once() {
        let snap = snapshot();
        let p = params(ANALGESIC);
        let ctx = FixContext::new(&snap, &p);
        AddAttributeFixer.check_params(&ctx).unwrap();

        let product = snap.concept(ConceptId(30)).unwrap().clone();
        assert!(AddAttributeFixer.identify(&ctx, &product).unwrap());
        let m = AddAttributeFixer.apply(&ctx, product).unwrap();
        assert_eq!(m.change_count(), 1);
        assert_eq!(m.changes[0].action, ActionType::RelationshipAdded);
        assert_eq!(m.concept.relationships.last().unwrap().group, 1);

        let again = AddAttributeFixer.apply(&ctx, m.concept).unwrap();
        assert_eq!(again.change_count(), 0);
    }

    #[test]
    fn more_specific_existing_attribute_satisfies_proposal() {
        let snap = snapshot();
        let p = params(ANALGESIC);
        let ctx = FixContext::new(&snap, &p);
        let product = snap
            .concept(ConceptId(30))
            .unwrap()
            .clone()
            .with_relationship(Relationship::stated(ATTR, PARACETAMOL, 2));
        assert!(!AddAttributeFixer.identify(&ctx, &product).unwrap());
    }

    #[test]
    fn unknown_parameter_concepts_are_rejected() {
        let snap = snapshot();
        let p = params(ConceptId(999));
        assert!(AddAttributeFixer
            .check_params(&FixContext::new(&snap, &p))
            .is_err());
    }
}
