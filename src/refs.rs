//! Symbolic references
//!
//! A symbolic reference is a `$ref` whose string value is wrapped in braces,
//! e.g. `"$ref": "{Address}"`. It names a schema in the registry rather than a
//! URI. Plain `$ref` values are not symbolic and are left to the schema engine.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::bytes::{Captures, Regex};

fn symbolic_ref() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""\$ref"\s*:\s*"\{([^"]+?)\}""#).expect("symbolic reference pattern is valid")
    })
}

/// Collect the names of every symbolic reference in `source`.
pub fn find_references(source: &[u8]) -> BTreeSet<String> {
    symbolic_ref()
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|name| String::from_utf8_lossy(name.as_bytes()).into_owned())
        .collect()
}

/// Replace every symbolic reference with `"$ref":"<replace(name)>"`.
///
/// Bytes outside of symbolic references are copied unchanged. The replacement
/// is written verbatim into a JSON string, so it must not need escaping.
pub fn rewrite_references<'a, F>(source: &'a [u8], mut replace: F) -> Cow<'a, [u8]>
where
    F: FnMut(&str) -> String,
{
    symbolic_ref().replace_all(source, |caps: &Captures<'_>| {
        let name = String::from_utf8_lossy(&caps[1]);
        format!(r#""$ref":"{}""#, replace(&name)).into_bytes()
    })
}
