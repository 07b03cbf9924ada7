//! Dependency relation labels.
//!
//! Encoders keep one parameter set per relation. The set below is the label
//! inventory of the English dependency scheme the encoders were designed
//! around, including the empty label some parsers emit for unattached
//! tokens. Labels outside it are still accepted; encoders create their
//! parameters on first use.

/// Label carried by the root token.
pub const ROOT_LABEL: &str = "ROOT";

/// The closed inventory of relation labels.
pub const DEPENDENCY_LABELS: [&str; 46] = [
    "compound", "punct", "nsubj", "ROOT", "det", "attr", "cc", "npadvmod", "appos", "prep",
    "pobj", "amod", "advmod", "acl", "nsubjpass", "auxpass", "agent", "advcl", "aux", "xcomp",
    "nmod", "dobj", "relcl", "nummod", "mark", "pcomp", "conj", "poss", "ccomp", "oprd",
    "acomp", "neg", "parataxis", "dep", "expl", "preconj", "case", "dative", "prt", "quantmod",
    "meta", "intj", "csubj", "predet", "csubjpass", "",
];

/// True if `label` belongs to [`DEPENDENCY_LABELS`].
pub fn is_known_label(label: &str) -> bool {
    DEPENDENCY_LABELS.contains(&label)
}

/// Map the lowercase root label used by Universal Dependencies onto
/// [`ROOT_LABEL`]. Other labels pass through unchanged.
pub fn normalize_label(label: &str) -> &str {
    if label.eq_ignore_ascii_case("root") {
        ROOT_LABEL
    } else {
        label
    }
}
