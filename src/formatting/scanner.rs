#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    /// `E'...'`, where a backslash escapes the next byte.
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// How a placeholder's value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Regular SQL literal.
    Default,
    /// Text injected verbatim (`:raw`, `^`).
    Raw,
    /// Quoted identifier (`:name`, `~`).
    Name,
    /// JSON literal (`:json`).
    Json,
    /// Comma-separated literals (`:csv`, `:list`).
    Csv,
    /// Escaped text without surrounding quotes (`:value`, `#`).
    Value,
}

pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

/// Read an optional modifier right after a placeholder's digits, returning the
/// modifier and the index just past it. `$1::int` is a cast, not a modifier.
pub(super) fn scan_modifier(bytes: &[u8], start: usize) -> (Modifier, usize) {
    match bytes.get(start) {
        Some(b'^') => return (Modifier::Raw, start + 1),
        Some(b'~') => return (Modifier::Name, start + 1),
        Some(b'#') => return (Modifier::Value, start + 1),
        Some(b':') if bytes.get(start + 1) != Some(&b':') => {}
        _ => return (Modifier::Default, start),
    }

    let word_start = start + 1;
    let mut idx = word_start;
    while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
        idx += 1;
    }
    let modifier = match &bytes[word_start..idx] {
        b"raw" => Modifier::Raw,
        b"name" | b"alias" => Modifier::Name,
        b"json" => Modifier::Json,
        b"csv" | b"list" => Modifier::Csv,
        b"value" => Modifier::Value,
        _ => return (Modifier::Default, start),
    };
    (modifier, idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_and_casts() {
        assert_eq!(scan_modifier(b"$1:raw x", 2), (Modifier::Raw, 6));
        assert_eq!(scan_modifier(b"$1^", 2), (Modifier::Raw, 3));
        assert_eq!(scan_modifier(b"$1::int", 2), (Modifier::Default, 2));
        assert_eq!(scan_modifier(b"$1:bogus", 2), (Modifier::Default, 2));
        assert_eq!(scan_modifier(b"$1:csv)", 2), (Modifier::Csv, 6));
    }
}
