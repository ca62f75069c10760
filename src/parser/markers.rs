//! Substring-marker extraction used by the field parser

/// Return the text between the first `start` marker and the next `end`
/// marker after it. Missing markers yield an empty string, never an error.
pub fn text_between<'a>(line: &'a str, start: &str, end: &str) -> &'a str {
    let Some(begin) = line.find(start).map(|idx| idx + start.len()) else {
        return "";
    };
    let rest = &line[begin..];
    match rest.find(end) {
        Some(len) => &rest[..len],
        None => "",
    }
}

/// First `count` characters of `line` (fewer when the line is shorter)
pub fn leading_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
