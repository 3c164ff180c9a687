/// A single lexical token along with its source position and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    DmlKeyword,
    Name,
    Number,
    String,
    Operator,
    Comparison,
    Punctuation,
    Whitespace,
    Comment,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn is_whitespace_or_comment(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn text_upper(&self) -> String {
        self.text.to_uppercase()
    }
}

pub const DML_KEYWORDS: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE", "SHOW", "USE"];

pub const CLAUSE_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "BY", "JOIN", "INNER", "LEFT",
    "RIGHT", "FULL", "OUTER", "CROSS", "ON", "AS", "AND", "OR", "NOT", "IN", "IS", "NULL",
    "LIKE", "BETWEEN", "DISTINCT", "CASE", "WHEN", "THEN", "ELSE", "END", "OVER", "PARTITION",
    "ASC", "DESC", "EXISTS", "OFFSET", "REGEXP", "RLIKE", "SEPARATOR",
];

pub fn classify_word(word: &str) -> TokenKind {
    let upper = word.to_uppercase();
    if DML_KEYWORDS.contains(&upper.as_str()) {
        TokenKind::DmlKeyword
    } else if CLAUSE_KEYWORDS.contains(&upper.as_str()) {
        TokenKind::Keyword
    } else {
        TokenKind::Name
    }
}
