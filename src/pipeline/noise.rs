/// Text longer than this is almost always an embedded script or markup dump,
/// never human-visible pricing copy.
const MAX_FRAGMENT_LEN: usize = 300;

/// Substrings that mark a fragment as script/markup debris: minified-bundle
/// markers, templating directives, form-library initializers, CDATA.
const SCRIPT_SIGNATURES: &[&str] = &[
    "self.__next_f",
    "<![CDATA[",
    "gform.",
    "jQuery(",
    "__next_f",
    "window.__NEXT",
    "function(",
];

/// Returns true if the fragment is JS/HTML noise rather than visible copy.
/// Pure predicate; never fails. Length is measured in characters, so
/// multibyte copy is not penalized.
pub fn is_noise(text: &str) -> bool {
    if text.chars().take(MAX_FRAGMENT_LEN + 1).count() > MAX_FRAGMENT_LEN {
        return true;
    }
    SCRIPT_SIGNATURES.iter().any(|sig| text.contains(sig))
}

// ── Tests ──
