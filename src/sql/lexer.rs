use super::token::{classify_word, Token, TokenKind};

/// Tokenises raw SQL text into a flat stream, stripping comments but
/// preserving the original source text for everything else (the parser
/// needs to reconstruct expressions like `CASE ... END` verbatim).
pub fn tokenize(sql: &str) -> Vec<Token> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let n = chars.len();

    while i < n {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            while i < n && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::new(
                TokenKind::Whitespace,
                chars[start..i].iter().collect::<String>(),
                start,
            ));
            continue;
        }

        // line comments
        if c == '-' && i + 1 < n && chars[i + 1] == '-' {
            while i < n && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '#' {
            while i < n && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        // block comments
        if c == '/' && i + 1 < n && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < n && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i = (i + 2).min(n);
            continue;
        }

        // quoted strings
        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            while i < n {
                if chars[i] == '\\' && i + 1 < n {
                    i += 2;
                    continue;
                }
                if chars[i] == quote {
                    if i + 1 < n && chars[i + 1] == quote {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            tokens.push(Token::new(
                TokenKind::String,
                chars[start..i].iter().collect::<String>(),
                start,
            ));
            continue;
        }

        // backtick identifiers — preserved verbatim, classified as Name
        if c == '`' {
            i += 1;
            while i < n && chars[i] != '`' {
                i += 1;
            }
            i = (i + 1).min(n);
            tokens.push(Token::new(
                TokenKind::Name,
                chars[start..i].iter().collect::<String>(),
                start,
            ));
            continue;
        }

        // numbers
        if c.is_ascii_digit() {
            while i < n && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::new(
                TokenKind::Number,
                chars[start..i].iter().collect::<String>(),
                start,
            ));
            continue;
        }

        // names / keywords (identifiers, possibly qualified with '.')
        if c.is_alphabetic() || c == '_' || c == '$' {
            while i < n && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(Token::new(classify_word(&word), word, start));
            continue;
        }

        // multi-char comparison/operators
        let two: String = chars[i..(i + 2).min(n)].iter().collect();
        if ["<=", ">=", "<>", "!=", "||"].contains(&two.as_str()) {
            tokens.push(Token::new(TokenKind::Comparison, two, start));
            i += 2;
            continue;
        }

        match c {
            '=' | '<' | '>' => {
                tokens.push(Token::new(TokenKind::Comparison, c.to_string(), start));
                i += 1;
            }
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::new(TokenKind::Operator, c.to_string(), start));
                i += 1;
            }
            '(' | ')' | ',' | '.' | ';' => {
                tokens.push(Token::new(TokenKind::Punctuation, c.to_string(), start));
                i += 1;
            }
            _ => {
                // unrecognised single character; keep as punctuation rather than
                // silently dropping it.
                tokens.push(Token::new(TokenKind::Punctuation, c.to_string(), start));
                i += 1;
            }
        }
    }

    tokens
}

/// Tokens with whitespace and comments removed — what the parser consumes.
pub fn tokenize_significant(sql: &str) -> Vec<Token> {
    tokenize(sql)
        .into_iter()
        .filter(|t| !t.is_whitespace_or_comment())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_select() {
        let toks = tokenize_significant("SELECT a, b FROM t WHERE a = 1");
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["SELECT", "a", ",", "b", "FROM", "t", "WHERE", "a", "=", "1"]
        );
    }

    #[test]
    fn strips_comments() {
        let toks = tokenize_significant("SELECT 1 -- trailing\nFROM t # hash\n");
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["SELECT", "1", "FROM", "t"]);
    }

    #[test]
    fn keeps_commas_inside_quotes_and_parens_as_one_token() {
        let toks = tokenize_significant("SELECT 'a,b', f(1,2)");
        let strs: Vec<&str> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::String)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(strs, vec!["'a,b'"]);
    }
}
