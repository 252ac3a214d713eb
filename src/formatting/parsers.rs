pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

/// `E'...'` or `e'...'` where the prefix is not the tail of an identifier.
pub(super) fn is_escape_string_start(bytes: &[u8], idx: usize) -> bool {
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80;
    bytes.get(idx) == Some(&b'\'')
        && idx >= 1
        && matches!(bytes[idx - 1], b'E' | b'e')
        && (idx == 1 || !is_ident(bytes[idx - 2]))
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Recognize `$tag$` / `$$` at `start`. Tags never begin with a digit, which
/// keeps `$1` free for placeholders.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..=end].starts_with(tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_never_open_a_dollar_quote() {
        assert!(try_start_dollar_quote(b"$1$", 0).is_none());
        assert_eq!(
            try_start_dollar_quote(b"$fn$ body $fn$", 0),
            Some(("fn".to_string(), 3))
        );
        assert_eq!(try_start_dollar_quote(b"$$x$$", 0), Some((String::new(), 1)));
    }
}
