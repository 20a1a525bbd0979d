/// Strip a trailing `;` or `//` comment and surrounding whitespace.
///
/// Returns `None` when nothing is left, so callers can drop blank lines with `filter_map`.
pub fn normalize_line(raw: &str) -> Option<&str> {
    let end = [raw.find(';'), raw.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(raw.len());

    let line = raw[..end].trim();
    (!line.is_empty()).then_some(line)
}

/// First whitespace-delimited token and the trimmed remainder.
pub(crate) fn split_first_token(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(at) => (&line[..at], line[at..].trim()),
        None => (line, ""),
    }
}
