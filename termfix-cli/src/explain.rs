//! Fix explanations for the `termfix explain` command.

/// Long-form documentation of a built-in fixer.
#[derive(Debug, Clone)]
pub struct FixExplanation {
    /// Fix key as accepted by `run --fix`.
    pub fix_key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// `(name, meaning)` pairs in declaration order.
    pub params: &'static [(&'static str, &'static str)],
    /// When the fixer considers a concept already done.
    pub satisfied_when: &'static str,
    /// How batching treats its candidates.
    pub batching: &'static str,
}

pub static FIX_REGISTRY: &[FixExplanation] = &[
    FixExplanation {
        fix_key: "description.replace_term",
        title: "Replace Term",
        description: r#"Replaces every occurrence of a substring in the active descriptions of a
concept.

Unreleased descriptions are edited in place. Released descriptions are never
rewritten: the old description is inactivated and a new one carrying the
replacement term is added with the same language and acceptability. When the
FSN changes, the concept's FSN follows. A replacement that leaves the search text
in a term (e.g. find "ab", replace "b" on "aab") marks the concept invalid."#,
        params: &[
            ("find", "Text to search for (required)."),
            ("replace", "Replacement text (default: empty, i.e. delete)."),
        ],
        satisfied_when: "No active description contains the search text.",
        batching: "No ordering constraints. With --group-by-key, concepts sharing a semantic tag share tasks.",
    },
    FixExplanation {
        fix_key: "relationship.remove_redundant_parent",
        title: "Remove Redundant Parent",
        description: r#"Removes stated IS-A parents that are already ancestors of another stated
parent of the same concept.

Released relationships are inactivated; unreleased ones are deleted. The
concept always keeps at least one active parent."#,
        params: &[],
        satisfied_when: "No stated parent is a stated ancestor of another stated parent.",
        batching: "A candidate that is a stated parent of another candidate is edited first, in the same task.",
    },
    FixExplanation {
        fix_key: "relationship.add_attribute",
        title: "Add Attribute",
        description: r#"Adds a stated attribute relationship `type -> target` to the concept.

An existing stated attribute that is the same as, or more specific than, the
proposed one already satisfies the concept, so nothing is added."#,
        params: &[
            ("type", "Attribute type concept id (required)."),
            ("target", "Attribute value concept id (required)."),
            ("group", "Relationship group number (default: 0)."),
        ],
        satisfied_when: "An existing stated attribute is subsumed by the proposed one.",
        batching: "No ordering constraints.",
    },
    FixExplanation {
        fix_key: "relationship.remove_duplicates",
        title: "Remove Duplicate Relationships",
        description: r#"Removes active relationships that repeat another active relationship's
type, target, group and characteristic.

A released copy is kept in preference to an unreleased one; otherwise the
first copy is kept. Removed released copies are inactivated."#,
        params: &[],
        satisfied_when: "No two active relationships share type, target, group and characteristic.",
        batching: "No ordering constraints.",
    },
];

/// Find a fix by key (`relationship.add_attribute`), by the part after the dot
/// (`add_attribute`), or with hyphens for underscores.
pub fn lookup_fix(query: &str) -> Option<&'static FixExplanation> {
    let q = query.trim().to_lowercase().replace('-', "_");
    FIX_REGISTRY
        .iter()
        .find(|fix| fix.fix_key == q || fix.fix_key.ends_with(&format!(".{}", q)))
}

pub fn list_fix_keys() -> Vec<&'static str> {
    FIX_REGISTRY.iter().map(|f| f.fix_key).collect()
}
