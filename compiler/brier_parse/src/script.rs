//! Whole-script helpers.

/// Split script text into lines, joining `\`-continued lines.
///
/// A line ending in a backslash (ignoring trailing whitespace) continues on
/// the next line; the backslash is dropped and the two are joined with a
/// single space.
pub fn split_script(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for raw in text.lines() {
        let trimmed = raw.trim_end();
        let (content, continues) = match trimmed.strip_suffix('\\') {
            Some(head) => (head, true),
            None => (raw, false),
        };
        let line = match pending.take() {
            Some(mut head) => {
                head.push(' ');
                head.push_str(content.trim_start());
                head
            }
            None => content.to_string(),
        };
        if continues {
            pending = Some(line);
        } else {
            lines.push(line);
        }
    }
    if let Some(rest) = pending {
        lines.push(rest);
    }
    lines
}
