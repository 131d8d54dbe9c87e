//! Naming-convention transforms used during class/object registration.
//!
//! Pure and deterministic; the registry itself treats event names as opaque
//! strings and only consults this module when scanning located handlers.

/// Marker prefix that makes a method name a handler candidate.
pub const DEFAULT_HANDLER_PREFIX: &str = "on";

/// Convert a camel-case or snake_case name to hyphen-separated lower case.
///
/// `FileChange` and `file_change` both map to `file-change`. Consecutive
/// word breaks collapse to a single hyphen.
pub fn hyphen_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '_' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Derive an event name from a conventionally named handler method.
///
/// Matches only when `method` starts with `prefix` at a word boundary (the
/// next character is uppercase or `_`) and a non-empty remainder follows:
/// `onStart` -> `start`, `on_file_change` -> `file-change`, while `once`
/// and the bare prefix are not handler names.
pub fn event_for_method(method: &str, prefix: &str) -> Option<String> {
    let rest = method.strip_prefix(prefix)?;
    let boundary = rest.chars().next()?;
    if !(boundary.is_ascii_uppercase() || boundary == '_') {
        return None;
    }
    let event = hyphen_case(rest);
    if event.is_empty() {
        None
    } else {
        Some(event)
    }
}
