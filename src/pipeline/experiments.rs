/// Markup fingerprints of the common A/B testing and experimentation
/// frameworks: script hosts, loader filenames, global object names.
const AB_FRAMEWORK_SIGNATURES: &[(&str, &[&str])] = &[
    ("optimizely", &["optimizely", "cdn.optimizely.com"]),
    ("vwo", &["visualwebsiteoptimizer", "dev.visualwebsiteoptimizer", "vwo"]),
    ("google_optimize", &["googleoptimize", "optimize.js", "gtm-optimize"]),
    ("launchdarkly", &["launchdarkly", "ldclient", "app.launchdarkly.com"]),
    ("adobe_target", &["adobetarget", "at.js", "tt.omtrdc.net"]),
    ("split", &["cdn.split.io", "splitio", "split.io"]),
    ("convert", &["convert.com", "convertglobal", "cdn-4.convertexperiments.com"]),
];

/// Scan raw HTML (scripts included, so this runs before any noise filtering)
/// for framework fingerprints. Case-insensitive; each framework reported at
/// most once, in table order.
pub fn detect_frameworks(html: &str) -> Vec<&'static str> {
    let haystack = html.to_lowercase();
    AB_FRAMEWORK_SIGNATURES
        .iter()
        .filter(|(_, signatures)| signatures.iter().any(|sig| haystack.contains(sig)))
        .map(|(name, _)| *name)
        .collect()
}

// ── Tests ──
