use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Write;
use termfix_snapshot::{Snapshot, load_snapshot};
use termfix_types::{Concept, ConceptId};

fn utf8(path: &std::path::Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf8 path")
}

#[test]
fn loads_json_array() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snapshot.json");
    let concepts = vec![
        Concept::new(1, "Root (root)"),
        Concept::new(2, "Child (finding)").with_parent(ConceptId(1)),
    ];
    std::fs::write(&path, serde_json::to_string(&concepts).expect("json")).expect("write");

    let snap = load_snapshot(&utf8(&path)).expect("load");
    assert_eq!(snap.len(), 2);
    assert_eq!(
        snap.hierarchy().ancestors(ConceptId(2)).expect("ancestors"),
        [ConceptId(1)].into_iter().collect()
    );
}

#[test]
fn loads_json_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snapshot.jsonl");
    let mut f = std::fs::File::create(&path).expect("create");
    writeln!(f, r#"{{"id": 1, "fsn": "Root (root)"}}"#).expect("write");
    writeln!(f).expect("write");
    writeln!(
        f,
        r#"{{"id": 2, "fsn": "Child (finding)", "relationships": [{{"type_id": 116680003, "target": {{"concept": 1}}, "characteristic": "INFERRED"}}]}}"#
    )
    .expect("write");
    drop(f);

    let snap = load_snapshot(&utf8(&path)).expect("load");
    assert!(
        snap.hierarchy()
            .is_ancestor(ConceptId(1), ConceptId(2))
            .expect("known")
    );
}

#[test]
fn load_errors_name_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").expect("write");

    let err = load_snapshot(&utf8(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));

    let missing = dir.path().join("missing.json");
    assert!(load_snapshot(&utf8(&missing)).is_err());
}

/// Random DAG: concept `i` may only have parents with a smaller index.
fn dag() -> impl Strategy<Value = Vec<Concept>> {
    (2usize..24).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<prop::sample::Index>(), 0..3), n)
            .prop_map(move |parent_picks| {
                parent_picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let mut c = Concept::new(i as u64 + 1, format!("C{i} (x)"));
                        if i > 0 {
                            for p in picks {
                                c = c.with_parent(ConceptId(p.index(i) as u64 + 1));
                            }
                        }
                        c
                    })
                    .collect()
            })
    })
}

proptest! {
    #[test]
    fn ancestors_and_descendants_are_inverse(concepts in dag()) {
        let snap = Snapshot::from_concepts(concepts.clone()).expect("acyclic");
        let closure = snap.hierarchy();
        for a in &concepts {
            for b in &concepts {
                let up = closure.is_ancestor(a.id, b.id).expect("known");
                let down = closure.descendants(a.id).expect("known").contains(&b.id);
                prop_assert_eq!(up, down);
            }
            prop_assert!(closure.ancestors_or_self(a.id).expect("known").contains(&a.id));
            prop_assert!(!closure.is_ancestor(a.id, a.id).expect("known"));
        }
    }

    #[test]
    fn closure_is_transitive(concepts in dag()) {
        let snap = Snapshot::from_concepts(concepts.clone()).expect("acyclic");
        let closure = snap.hierarchy();
        for c in &concepts {
            let ancestors = closure.ancestors(c.id).expect("known");
            for a in &ancestors {
                for aa in closure.ancestors(*a).expect("known") {
                    prop_assert!(ancestors.contains(&aa));
                }
            }
        }
    }
}
