//! Minimal `MANIFEST.MF` reader: extracts one main-section attribute.

/// Attribute carrying the bundle's authoritative version.
pub const BUNDLE_VERSION: &str = "Bundle-Version";

/// Value of `name` in the manifest's main section.
///
/// Header lines are `Name: value`; a line starting with a single space
/// continues the previous value. The main section ends at the first blank
/// line. Names compare case-insensitively.
pub fn main_attribute(content: &str, name: &str) -> Option<String> {
    let mut current: Option<(String, String)> = None;

    for raw in content.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.is_empty() {
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continuation);
            }
            continue;
        }
        if let Some(found) = take_if_named(current.take(), name) {
            return Some(found);
        }
        current = line
            .split_once(':')
            .map(|(key, value)| return (key.trim().to_string(), value.trim_start().to_string()));
    }

    return take_if_named(current, name);
}

/// The header's value if its name matches.
fn take_if_named(header: Option<(String, String)>, name: &str) -> Option<String> {
    let (key, value) = header?;
    if key.eq_ignore_ascii_case(name) {
        return Some(value.trim_end().to_string());
    }
    return None;
}
