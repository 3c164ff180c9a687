//! Scalar/boolean expression mini-compiler. Statement-level clauses (SELECT
//! items, function arguments, CASE branches, HAVING's `FUNC(arg) OP value`
//! shape) hand raw SQL text fragments here; this module tokenises and
//! compiles them into MongoDB aggregation expressions, recursing through
//! nested function calls via `functions::dispatch_scalar`. Boolean
//! comparisons/AND/OR compile to `$expr`-style documents (`$eq`, `$and`,
//! ...) rather than match-doc shapes, since they are meant for use inside
//! `$cond`/`$switch`, not a top-level `$match`.

use crate::error::{MongoSqlError, Result};
use crate::functions::{self, conditional, datetime};
use crate::sql::ast::Value;
use crate::sql::scan::split_top_level;
use bson::{doc, Bson};

/// Compile an arbitrary scalar SQL expression fragment (a SELECT item's
/// body, a function argument, a CASE branch) into a MongoDB expression.
pub fn compile(text: &str) -> Result<Bson> {
    let mut p = ExprParser::new(text);
    let result = p.parse_or()?;
    p.skip_ws();
    Ok(result)
}

struct ExprParser<'a> {
    chars: Vec<char>,
    pos: usize,
    src: &'a str,
}

impl<'a> ExprParser<'a> {
    fn new(src: &'a str) -> Self {
        ExprParser {
            chars: src.chars().collect(),
            pos: 0,
            src,
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn eat_word(&mut self, word: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        if rest.len() >= word.len()
            && rest[..word.len()].eq_ignore_ascii_case(word)
            && rest[word.len()..]
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric() && c != '_')
                .unwrap_or(true)
        {
            self.pos += word.chars().count();
            true
        } else {
            false
        }
    }

    fn eat_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // or_expr := and_expr (OR and_expr)*
    fn parse_or(&mut self) -> Result<Bson> {
        let mut left = self.parse_and()?;
        loop {
            let save = self.pos;
            if self.eat_word("OR") {
                let right = self.parse_and()?;
                left = Bson::Document(doc! { "$or": [left, right] });
            } else {
                self.pos = save;
                break;
            }
        }
        Ok(left)
    }

    // and_expr := not_expr (AND not_expr)*
    fn parse_and(&mut self) -> Result<Bson> {
        let mut left = self.parse_not()?;
        loop {
            let save = self.pos;
            if self.eat_word("AND") {
                let right = self.parse_not()?;
                left = Bson::Document(doc! { "$and": [left, right] });
            } else {
                self.pos = save;
                break;
            }
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Bson> {
        let save = self.pos;
        if self.eat_word("NOT") {
            let inner = self.parse_not()?;
            return Ok(Bson::Document(doc! { "$not": [inner] }));
        }
        self.pos = save;
        self.parse_comparison()
    }

    // comparison := additive ( (=|!=|<>|<=|>=|<|>|IS NULL|IS NOT NULL|LIKE) additive? )?
    fn parse_comparison(&mut self) -> Result<Bson> {
        let left = self.parse_additive()?;
        self.skip_ws();

        if self.eat_word("IS") {
            if self.eat_word("NOT") {
                self.eat_word("NULL");
                return Ok(Bson::Document(doc! { "$ne": [left, Bson::Null] }));
            }
            self.eat_word("NULL");
            return Ok(Bson::Document(doc! { "$eq": [left, Bson::Null] }));
        }

        let ops: &[(&str, &str)] = &[
            ("<=", "$lte"),
            (">=", "$gte"),
            ("<>", "$ne"),
            ("!=", "$ne"),
            ("=", "$eq"),
            ("<", "$lt"),
            (">", "$gt"),
        ];
        for (sym, mongo_op) in ops {
            let save = self.pos;
            self.skip_ws();
            let rest = self.rest();
            if rest.starts_with(sym) {
                self.pos += sym.chars().count();
                let right = self.parse_additive()?;
                return Ok(Bson::Document(
                    doc! { mongo_op.to_string(): [left, right] },
                ));
            }
            self.pos = save;
        }

        Ok(left)
    }

    // additive := multiplicative ((+|-) multiplicative)*
    fn parse_additive(&mut self) -> Result<Bson> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    let right = self.parse_multiplicative()?;
                    left = Bson::Document(doc! { "$add": [left, right] });
                }
                Some('-') => {
                    self.pos += 1;
                    let right = self.parse_multiplicative()?;
                    left = Bson::Document(doc! { "$subtract": [left, right] });
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // multiplicative := unary ((*|/|%) unary)*
    fn parse_multiplicative(&mut self) -> Result<Bson> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    left = Bson::Document(doc! { "$multiply": [left, right] });
                }
                Some('/') => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    left = Bson::Document(doc! { "$divide": [left, right] });
                }
                Some('%') => {
                    self.pos += 1;
                    let right = self.parse_unary()?;
                    left = Bson::Document(doc! { "$mod": [left, right] });
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Bson> {
        self.skip_ws();
        if self.peek() == Some('-') {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Bson::Document(doc! { "$multiply": [inner, -1] }));
        }
        if self.peek() == Some('+') {
            self.pos += 1;
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Bson> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.eat_char(')');
                Ok(inner)
            }
            Some('\'') | Some('"') => self.parse_string_literal(),
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            _ => self.parse_word_based(),
        }
    }

    fn parse_string_literal(&mut self) -> Result<Bson> {
        let quote = self.peek().unwrap();
        self.pos += 1;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                if let Some(n) = self.peek() {
                    s.push(n);
                    self.pos += 1;
                }
                continue;
            }
            if c == quote {
                self.pos += 1;
                if self.peek() == Some(quote) {
                    s.push(quote);
                    self.pos += 1;
                    continue;
                }
                break;
            }
            s.push(c);
            self.pos += 1;
        }
        Ok(Bson::String(s))
    }

    fn parse_number(&mut self) -> Result<Bson> {
        let start = self.pos;
        while self
            .peek()
            .map(|c| c.is_ascii_digit() || c == '.')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if let Ok(i) = text.parse::<i64>() {
            Ok(Bson::Int64(i))
        } else {
            Ok(Bson::Double(text.parse::<f64>().unwrap_or(0.0)))
        }
    }

    fn parse_word_based(&mut self) -> Result<Bson> {
        self.skip_ws();
        if self.eat_word("CASE") {
            return self.parse_case();
        }
        if self.eat_word("NULL") {
            return Ok(Bson::Null);
        }
        if self.eat_word("TRUE") {
            return Ok(Bson::Boolean(true));
        }
        if self.eat_word("FALSE") {
            return Ok(Bson::Boolean(false));
        }

        let start = self.pos;
        while self
            .peek()
            .map(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(MongoSqlError::translation(format!(
                "could not parse expression near position {} in `{}`",
                start, self.src
            )));
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        self.skip_ws();
        if self.peek() == Some('(') {
            return self.parse_function_call(&word);
        }

        Ok(Value::FieldRef(word).to_bson())
    }

    fn matching_paren(&self, open: usize) -> usize {
        let mut depth = 0i32;
        let mut in_quote: Option<char> = None;
        let mut i = open;
        while i < self.chars.len() {
            let c = self.chars[i];
            if let Some(q) = in_quote {
                if c == q {
                    in_quote = None;
                }
                i += 1;
                continue;
            }
            match c {
                '\'' | '"' => in_quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return i;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.chars.len().saturating_sub(1)
    }

    fn parse_function_call(&mut self, name: &str) -> Result<Bson> {
        let open = self.pos;
        let close = self.matching_paren(open);
        let args_text: String = self.chars[open + 1..close].iter().collect();
        self.pos = close + 1;

        let upper = name.to_uppercase();
        let raw_args = split_top_level(&args_text, ',');
        let raw_args: Vec<String> = raw_args.into_iter().filter(|a| !a.is_empty()).collect();

        if upper == "COUNT" || upper == "SUM" || upper == "AVG" || upper == "MIN" || upper == "MAX"
        {
            // An aggregate appearing mid-expression: the group-by compiler
            // handles the top-level case; nested use is out of scope
            // ("non-aggregate arithmetic on aggregates... out of scope",
            // spec.md §4.G), so fail loud rather than silently mistranslate.
            return Err(MongoSqlError::unsupported(
                "aggregate functions may not be nested inside another expression",
            ));
        }

        if datetime::INTERVAL_ARG_FUNCTIONS.contains(&upper.as_str()) && raw_args.len() >= 2 {
            let mut compiled = Vec::new();
            for a in &raw_args[..raw_args.len() - 1] {
                compiled.push(compile(a)?);
            }
            compiled.push(compile_interval(raw_args.last().unwrap())?);
            return functions::dispatch_scalar(&upper, &compiled);
        }

        let condition_first = conditional::CONDITION_FIRST_ARG.contains(&upper.as_str());
        let mut compiled = Vec::with_capacity(raw_args.len());
        for (i, a) in raw_args.iter().enumerate() {
            if condition_first && i == 0 {
                compiled.push(compile(a)?);
            } else {
                compiled.push(compile(a)?);
            }
        }
        functions::dispatch_scalar(&upper, &compiled)
    }

    fn parse_case(&mut self) -> Result<Bson> {
        let mut branches = Vec::new();
        loop {
            self.skip_ws();
            if self.eat_word("WHEN") {
                let cond = self.parse_or()?;
                self.eat_word("THEN");
                let then_val = self.parse_or()?;
                branches.push(doc! { "case": cond, "then": then_val });
            } else if self.eat_word("ELSE") {
                let else_val = self.parse_or()?;
                self.eat_word("END");
                return Ok(Bson::Document(doc! {
                    "$switch": { "branches": branches, "default": else_val }
                }));
            } else if self.eat_word("END") {
                return Ok(Bson::Document(doc! {
                    "$switch": { "branches": branches, "default": Bson::Null }
                }));
            } else {
                return Err(MongoSqlError::parse(
                    self.pos,
                    "malformed CASE expression: expected WHEN, ELSE, or END",
                ));
            }
        }
    }
}

/// Parse an `INTERVAL n UNIT` clause into `{amount, unit}`, where `unit` is
/// lower-cased to MongoDB's unit vocabulary.
fn compile_interval(text: &str) -> Result<Bson> {
    let t = text.trim();
    let rest = t
        .strip_prefix("INTERVAL")
        .or_else(|| {
            if t.len() >= 8 && t[..8].eq_ignore_ascii_case("INTERVAL") {
                Some(&t[8..])
            } else {
                None
            }
        })
        .ok_or_else(|| MongoSqlError::translation(format!("expected INTERVAL clause, got `{t}`")))?
        .trim();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let amount_str = parts
        .next()
        .ok_or_else(|| MongoSqlError::translation("INTERVAL missing amount"))?;
    let unit_str = parts
        .next()
        .ok_or_else(|| MongoSqlError::translation("INTERVAL missing unit"))?
        .trim();
    let amount: i64 = amount_str
        .parse()
        .map_err(|_| MongoSqlError::translation(format!("invalid INTERVAL amount `{amount_str}`")))?;
    let unit = normalize_unit(unit_str);
    Ok(Bson::Document(doc! { "amount": amount, "unit": unit }))
}

fn normalize_unit(unit: &str) -> String {
    match unit.to_uppercase().as_str() {
        "YEAR" => "year",
        "QUARTER" => "quarter",
        "MONTH" => "month",
        "WEEK" => "week",
        "DAY" => "day",
        "HOUR" => "hour",
        "MINUTE" => "minute",
        "SECOND" => "second",
        "MICROSECOND" | "MILLISECOND" => "millisecond",
        other => return other.to_lowercase(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_arithmetic() {
        let b = compile("1+1").unwrap();
        assert_eq!(b, Bson::Document(doc! { "$add": [1i64, 1i64] }));
    }

    #[test]
    fn compiles_nested_function_call() {
        let b = compile("UPPER(CONCAT(a,b))").unwrap();
        assert!(matches!(b, Bson::Document(_)));
    }

    #[test]
    fn compiles_case_expression() {
        let b = compile("CASE WHEN x > 1 THEN 'a' ELSE 'b' END").unwrap();
        assert!(matches!(b, Bson::Document(_)));
    }
}
