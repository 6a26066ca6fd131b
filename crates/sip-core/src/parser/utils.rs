use std::borrow::Cow;

/// Join folded header lines (RFC 3261 §7.3.1): a line break followed by
/// space or tab continues the previous line and becomes a single space.
pub fn unfold_lws(input: &str) -> Cow<'_, str> {
    if !input.contains("\n ") && !input.contains("\n\t") {
        return Cow::Borrowed(input);
    }

    let mut unfolded = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        let line_break = match c {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                true
            }
            '\n' => true,
            _ => false,
        };
        if !line_break {
            unfolded.push(c);
            continue;
        }
        if matches!(chars.peek(), Some(' ' | '\t')) {
            while matches!(chars.peek(), Some(' ' | '\t')) {
                chars.next();
            }
            let trimmed = unfolded.trim_end_matches([' ', '\t']).len();
            unfolded.truncate(trimmed);
            unfolded.push(' ');
        } else {
            unfolded.push_str("\r\n");
        }
    }
    Cow::Owned(unfolded)
}
