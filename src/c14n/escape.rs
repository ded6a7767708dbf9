//! Character escaping applied to canonical output.

/// Escape character data: `&`, `<`, `>` and CR.
pub fn escape_text(value: &str) -> String {
    escape_with(value, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '\r' => Some("&#xD;"),
        _ => None,
    })
}

/// Escape an attribute value: `&`, `<`, `"`, TAB, LF and CR.
pub fn escape_attr(value: &str) -> String {
    escape_with(value, |c| match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '"' => Some("&quot;"),
        '\t' => Some("&#x9;"),
        '\n' => Some("&#xA;"),
        '\r' => Some("&#xD;"),
        _ => None,
    })
}

fn escape_with(value: &str, replacement: impl Fn(char) -> Option<&'static str>) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for c in value.chars() {
        match replacement(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}
