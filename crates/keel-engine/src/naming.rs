//! Task names derived from subproject paths.

/// Derive the camel-case task suffix for a subproject path.
///
/// The path is split on `/` and `-`; each segment gets its first character
/// upper-cased and the segments are concatenated. Empty segments contribute
/// nothing.
///
/// `examples/kmm-sample` → `ExamplesKmmSample`.
pub fn derive_task_name(path: &str) -> String {
    path.split(['/', '-']).map(capitalize).collect()
}

/// The task name of a kind's per-subproject task: `<prefix><DerivedName>`.
pub fn subproject_task_name(prefix: &str, path: &str) -> String {
    format!("{prefix}{}", derive_task_name(path))
}

/// The Gradle project path for a subproject directory.
///
/// `examples/kmm-sample` → `:examples:kmm-sample`.
pub fn gradle_project_path(path: &str) -> String {
    format!(":{}", path.replace('/', ":"))
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split a camel-case name into its humps: `ktlintCheckPackages` →
/// `["ktlint", "Check", "Packages"]`.
pub(crate) fn camel_humps(name: &str) -> Vec<&str> {
    let mut humps = Vec::new();
    let mut start = 0;
    for (i, c) in name.char_indices() {
        if i > start && (c.is_uppercase() || c.is_ascii_digit()) {
            if let Some(hump) = name.get(start..i) {
                humps.push(hump);
            }
            start = i;
        }
    }
    if let Some(rest) = name.get(start..) {
        if !rest.is_empty() {
            humps.push(rest);
        }
    }
    humps
}

/// Whether `abbrev` abbreviates `name` hump by hump (`kCP` matches
/// `ktlintCheckPackages`, `detBench` matches `detektBenchmarks`).
pub(crate) fn matches_abbreviation(abbrev: &str, name: &str) -> bool {
    let wanted = camel_humps(abbrev);
    let humps = camel_humps(name);
    if wanted.is_empty() || wanted.len() > humps.len() {
        return false;
    }
    wanted
        .iter()
        .zip(humps.iter())
        .all(|(w, h)| h.starts_with(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_segment() {
        assert_eq!(derive_task_name("packages"), "Packages");
        assert_eq!(derive_task_name("benchmarks"), "Benchmarks");
    }

    #[test]
    fn slash_and_dash_segments() {
        assert_eq!(derive_task_name("examples/kmm-sample"), "ExamplesKmmSample");
    }

    #[test]
    fn rest_of_segment_is_untouched() {
        assert_eq!(derive_task_name("test-apps/iOS-app"), "TestAppsIOSApp");
        assert_eq!(derive_task_name("cinterop"), "Cinterop");
    }

    #[test]
    fn empty_segments_vanish() {
        assert_eq!(derive_task_name("a--b"), "AB");
        assert_eq!(derive_task_name("-lead"), "Lead");
    }

    #[test]
    fn dash_and_slash_collide() {
        assert_eq!(derive_task_name("a-b"), derive_task_name("a/b"));
    }

    #[test]
    fn subproject_task_names() {
        assert_eq!(
            subproject_task_name("ktlintCheck", "examples/kmm-sample"),
            "ktlintCheckExamplesKmmSample"
        );
        assert_eq!(subproject_task_name("detekt", "benchmarks"), "detektBenchmarks");
    }

    #[test]
    fn gradle_paths() {
        assert_eq!(gradle_project_path("packages"), ":packages");
        assert_eq!(
            gradle_project_path("examples/kmm-sample"),
            ":examples:kmm-sample"
        );
    }

    #[test]
    fn humps() {
        assert_eq!(
            camel_humps("ktlintCheckExamplesKmmSample"),
            vec!["ktlint", "Check", "Examples", "Kmm", "Sample"]
        );
        assert_eq!(camel_humps("detekt"), vec!["detekt"]);
        assert!(camel_humps("").is_empty());
    }

    #[test]
    fn abbreviations() {
        assert!(matches_abbreviation("kC", "ktlintCheck"));
        assert!(matches_abbreviation("kCP", "ktlintCheckPackages"));
        assert!(matches_abbreviation("detBench", "detektBenchmarks"));
        assert!(!matches_abbreviation("kF", "ktlintCheck"));
        assert!(!matches_abbreviation("ktlintCheckPackagesX", "ktlintCheckPackages"));
        assert!(!matches_abbreviation("", "detekt"));
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(path in "[a-z0-9]{1,8}([/-][a-z0-9]{1,8}){0,4}") {
            prop_assert_eq!(derive_task_name(&path), derive_task_name(&path));
        }

        #[test]
        fn derivation_is_idempotent(path in "[a-z0-9]{1,8}([/-][a-z0-9]{1,8}){0,4}") {
            let once = derive_task_name(&path);
            prop_assert_eq!(derive_task_name(&once), once.clone());
        }

        #[test]
        fn derived_name_has_no_separators(path in "[a-zA-Z0-9]{1,8}([/-][a-zA-Z0-9]{1,8}){0,4}") {
            let name = derive_task_name(&path);
            prop_assert!(!name.contains('/') && !name.contains('-'));
            let expected_len: usize = path.split(['/', '-']).map(str::len).sum();
            prop_assert_eq!(name.len(), expected_len);
        }

        #[test]
        fn arbitrary_input_never_panics(path in "\\PC{0,40}") {
            let _ = derive_task_name(&path);
        }
    }
}
