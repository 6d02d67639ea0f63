//! End-to-end behaviour of subsumption and batching on small hand-built hierarchies.

use pretty_assertions::assert_eq;
use termfix_domain::{SubsumptionEngine, TaskBatcher, verify_batch};
use termfix_snapshot::Snapshot;
use termfix_types::{CharacteristicType, Concept, ConceptId, Relationship, RelationshipGroup};

const ROOT: ConceptId = ConceptId(1);
const HAS_ACTIVE_INGREDIENT: ConceptId = ConceptId(10);
const ANALGESIC: ConceptId = ConceptId(20);
const PARACETAMOL: ConceptId = ConceptId(21);

fn group(target: ConceptId) -> RelationshipGroup {
    RelationshipGroup::new(1, CharacteristicType::Stated)
        .with(Relationship::stated(HAS_ACTIVE_INGREDIENT, target, 1))
}

#[test]
fn ingredient_subsumption() {
    let snap = Snapshot::from_concepts(vec![
        Concept::new(ROOT.0, "Root (root)"),
        Concept::new(HAS_ACTIVE_INGREDIENT.0, "Has active ingredient (attribute)").with_parent(ROOT),
        Concept::new(ANALGESIC.0, "Analgesic (substance)").with_parent(ROOT),
        Concept::new(PARACETAMOL.0, "Paracetamol (substance)").with_parent(ANALGESIC),
    ])
    .expect("snapshot");
    let engine = SubsumptionEngine::new(&snap);

    let a = group(PARACETAMOL);
    let b = group(ANALGESIC);
    assert!(engine.is_group_subsumed_by(&a, &b).expect("known"));
    assert!(!engine.is_group_subsumed_by(&b, &a).expect("known"));
}

#[test]
fn intermediate_primitive_detection() {
    //  Root (primitive)
    //   ├─ P1 (primitive)
    //   └─ FD (fully defined)
    //        └─ P2 (primitive)
    let snap = Snapshot::from_concepts(vec![
        Concept::new(ROOT.0, "Root (root)"),
        Concept::new(2, "P1 (finding)").with_parent(ROOT),
        Concept::new(3, "FD (finding)").with_parent(ROOT).fully_defined(),
        Concept::new(4, "P2 (finding)").with_parent(ConceptId(3)),
        Concept::new(5, "Child of P1 (finding)").with_parent(ConceptId(2)),
        Concept::new(6, "Child of P2 (finding)").with_parent(ConceptId(4)),
    ])
    .expect("snapshot");
    let engine = SubsumptionEngine::new(&snap);

    assert!(!engine.is_intermediate_primitive(ConceptId(2)).expect("known"));
    assert!(engine.is_intermediate_primitive(ConceptId(4)).expect("known"));

    let under_p1 = snap.concept(ConceptId(5)).expect("known");
    assert_eq!(
        engine.proximal_primitive_parents(under_p1).expect("known"),
        vec![ConceptId(2)]
    );
    assert!(engine.intermediate_primitives(under_p1).expect("known").is_empty());

    let under_p2 = snap.concept(ConceptId(6)).expect("known");
    assert_eq!(
        engine.intermediate_primitives(under_p2).expect("known"),
        vec![ConceptId(4)]
    );
}

#[test]
fn five_candidates_with_one_dependency() {
    let batcher = TaskBatcher::new(2, "MAIN/PROJ").expect("max size");
    let c: Vec<ConceptId> = (1..=5).map(ConceptId).collect();
    let deps = vec![(c[0], c[2])];
    let batch = batcher.batch(&c, &deps).expect("batch");

    verify_batch(&batch, &c, &deps).expect("postconditions");
    for task in &batch.tasks {
        if task.contains(c[0]) {
            assert!(task.contains(c[2]));
            assert!(task.position(c[0]) < task.position(c[2]));
            assert!(task.len() <= 3);
        } else {
            assert!(task.len() <= 2);
        }
    }
}

#[test]
fn equivalent_concept_matches_across_group_numbers() {
    let snap = Snapshot::from_concepts(vec![Concept::new(ROOT.0, "Root (root)")]).expect("snapshot");
    let form = ConceptId(30);
    let engine = SubsumptionEngine::new(&snap).with_group_insensitive([form]);

    let candidate = Concept::new(100, "Paracetamol tablet (product)")
        .with_relationship(Relationship::is_a(ROOT, CharacteristicType::Stated))
        .with_relationship(Relationship::stated(HAS_ACTIVE_INGREDIENT, PARACETAMOL, 1))
        .with_relationship(Relationship::stated(form, ConceptId(31), 1));
    let same = Concept::new(200, "Paracetamol oral tablet (product)")
        .with_relationship(Relationship::is_a(ROOT, CharacteristicType::Stated))
        .with_relationship(Relationship::stated(HAS_ACTIVE_INGREDIENT, PARACETAMOL, 3))
        .with_relationship(Relationship::stated(form, ConceptId(31), 0));
    let different = Concept::new(300, "Analgesic tablet (product)")
        .with_relationship(Relationship::is_a(ROOT, CharacteristicType::Stated))
        .with_relationship(Relationship::stated(HAS_ACTIVE_INGREDIENT, ANALGESIC, 1))
        .with_relationship(Relationship::stated(form, ConceptId(31), 1));

    let known = [different.clone(), candidate.clone(), same.clone()];
    let found = engine.find_equivalent_concept(&candidate, known.iter());
    assert_eq!(found.map(|c| c.id), Some(same.id));

    let only_different = [different];
    assert!(engine
        .find_equivalent_concept(&candidate, only_different.iter())
        .is_none());
}
