//! Paren/quote-aware text scanning helpers shared by the parser. These work
//! directly on source text (rather than reassembling tokens) so that
//! verbatim substrings (`CASE ... END` bodies, function argument lists,
//! window `OVER (...)` bodies) are preserved exactly as written, per
//! spec.md §4.L / §4.P.

/// Find the next occurrence of `word` at paren-depth 0 and outside quotes,
/// starting at `from`, matched case-insensitively on word boundaries.
/// Returns the byte offset of the match start.
pub fn find_keyword_at_depth0(text: &str, word: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let n = bytes.len();
    let wlen = word.len();
    let mut depth = 0i32;
    let mut in_quote: Option<u8> = None;
    let mut i = from;
    while i < n {
        let c = bytes[i];
        if let Some(q) = in_quote {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == q {
                in_quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            b'\'' | b'"' | b'`' => {
                in_quote = Some(c);
                i += 1;
                continue;
            }
            b'(' => {
                depth += 1;
                i += 1;
                continue;
            }
            b')' => {
                depth -= 1;
                i += 1;
                continue;
            }
            _ => {}
        }
        if depth == 0 && i + wlen <= n {
            let candidate = &text[i..i + wlen];
            if candidate.eq_ignore_ascii_case(word) {
                let before_ok = i == 0 || !is_ident_byte(bytes[i - 1]);
                let after_ok = i + wlen == n || !is_ident_byte(bytes[i + wlen]);
                if before_ok && after_ok {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Split `text` on top-level occurrences of `sep` (a single character),
/// ignoring separators inside parens or quotes.
pub fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote: Option<char> = None;
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = in_quote {
            current.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                in_quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            _ if c == sep && depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Like `find_keyword_at_depth0` but scans case-insensitively for any of a
/// list of multi-word keyword phrases, returning the matched phrase and its
/// start offset — used for compound clause keywords like `GROUP BY`,
/// `ORDER BY`, `LEFT JOIN`, `FULL OUTER JOIN`.
pub fn find_first_of(text: &str, phrases: &[&str], from: usize) -> Option<(usize, String)> {
    let mut best: Option<(usize, String)> = None;
    for p in phrases {
        if let Some(pos) = find_keyword_at_depth0(text, p, from) {
            if best.is_none() || pos < best.as_ref().unwrap().0 {
                best = Some((pos, p.to_string()));
            }
        }
    }
    best
}

/// Strip a matching pair of outer parentheses, if the whole string is
/// wrapped by one.
pub fn strip_outer_parens(s: &str) -> &str {
    let t = s.trim();
    if t.starts_with('(') && t.ends_with(')') {
        let inner = &t[1..t.len() - 1];
        // Verify the opening paren actually matches the closing one (depth
        // never touches zero before the end).
        let mut depth = 0i32;
        let mut in_quote: Option<char> = None;
        for (idx, c) in inner.char_indices() {
            if let Some(q) = in_quote {
                if c == q {
                    in_quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' | '`' => in_quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return t;
                    }
                    let _ = idx;
                }
                _ => {}
            }
        }
        if depth == 0 {
            return inner.trim();
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_top_level_commas_only() {
        let parts = split_top_level("a, f(1,2), 'x,y'", ',');
        assert_eq!(parts, vec!["a", "f(1,2)", "'x,y'"]);
    }

    #[test]
    fn finds_keyword_outside_parens_and_quotes() {
        let sql = "SELECT a FROM t WHERE x = 'FROM'";
        let pos = find_keyword_at_depth0(sql, "WHERE", 0).unwrap();
        assert_eq!(&sql[pos..pos + 5], "WHERE");
    }
}
