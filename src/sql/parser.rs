//! Statement-level parser (P). Turns a verbatim SQL string into a `Query`
//! tree. Works directly on source text via `scan`'s paren/quote-aware
//! helpers rather than re-assembling a token stream, so that things like
//! `CASE` bodies, function argument lists, and window `OVER` clauses survive
//! with their original spacing intact for diagnostics and for `expr::compile`
//! to re-parse later.
//!
//! Scalar/boolean expression compilation (text -> `bson::Bson`) is not this
//! module's job; it hands raw text fragments to `crate::expr` and, for
//! function-name classification, to `crate::functions`.

use crate::error::{MongoSqlError, Result};
use crate::functions;
use crate::sql::ast::*;
use crate::sql::scan::{find_first_of, find_keyword_at_depth0, split_top_level, strip_outer_parens};

pub fn parse(sql: &str) -> Result<Query> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(MongoSqlError::sql_syntax("empty statement"));
    }
    let first_word = leading_word(trimmed).to_uppercase();
    match first_word.as_str() {
        "SELECT" => parse_select(trimmed),
        "INSERT" => Ok(Query {
            kind: StatementKind::Insert,
            ..Query::empty(StatementKind::Insert, trimmed)
        }),
        "UPDATE" => Ok(Query {
            kind: StatementKind::Update,
            ..Query::empty(StatementKind::Update, trimmed)
        }),
        "DELETE" => Ok(Query {
            kind: StatementKind::Delete,
            ..Query::empty(StatementKind::Delete, trimmed)
        }),
        "SHOW" => Ok(Query::empty(StatementKind::Show, trimmed)),
        "USE" => Ok(Query::empty(StatementKind::Use, trimmed)),
        other => Err(MongoSqlError::sql_syntax(format!(
            "unsupported statement type `{other}`"
        ))),
    }
}

/// Parse a bare predicate fragment (no surrounding `WHERE`/`HAVING`
/// keyword) — used by statement kinds whose own clause parsing is
/// text-based rather than routed through `parse_select` (`UPDATE ... WHERE
/// ...`, `DELETE ... WHERE ...`).
pub fn parse_predicate_text(text: &str, query: &mut Query) -> Result<Predicate> {
    parse_predicate(text, query)
}

fn leading_word(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}

/// The major SELECT-level clause keywords, used to locate clause
/// boundaries at paren-depth 0. Order matters only for the "next clause"
/// search, not for evaluation order.
const CLAUSE_STARTS: &[&str] = &[
    "FROM", "WHERE", "GROUP BY", "HAVING", "ORDER BY", "LIMIT",
];

fn parse_select(text: &str) -> Result<Query> {
    let select_kw_end = 6; // len("SELECT")
    let mut distinct = false;
    let mut rest = text[select_kw_end..].trim_start();
    if rest.to_uppercase().starts_with("DISTINCT") {
        distinct = true;
        rest = rest[8..].trim_start();
    }

    let clause_start = find_first_of(rest, CLAUSE_STARTS, 0).map(|(pos, _)| pos);
    let (columns_text, after_columns) = match clause_start {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, ""),
    };

    let columns = split_top_level(columns_text, ',')
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(|c| parse_column(&c))
        .collect::<Result<Vec<_>>>()?;

    let mut query = Query::empty(StatementKind::Select, text);
    query.distinct = distinct;
    query.columns = columns;

    let mut cursor = after_columns;

    if let Some(pos) = find_keyword_at_depth0(cursor, "FROM", 0) {
        let after_from = &cursor[pos + 4..];
        let next = find_first_of(after_from, &CLAUSE_STARTS[1..], 0).map(|(p, _)| p);
        let from_clause = match next {
            Some(p) => &after_from[..p],
            None => after_from,
        };
        parse_from_and_joins(from_clause.trim(), &mut query)?;
        cursor = match next {
            Some(p) => &after_from[p..],
            None => "",
        };
    }

    if let Some(pos) = find_keyword_at_depth0(cursor, "WHERE", 0) {
        let after_where = &cursor[pos + 5..];
        let next = find_first_of(after_where, &["GROUP BY", "HAVING", "ORDER BY", "LIMIT"], 0)
            .map(|(p, _)| p);
        let where_text = match next {
            Some(p) => &after_where[..p],
            None => after_where,
        };
        query.where_pred = Some(parse_predicate(where_text.trim(), &mut query)?);
        cursor = match next {
            Some(p) => &after_where[p..],
            None => "",
        };
    }

    if let Some(pos) = find_keyword_at_depth0(cursor, "GROUP BY", 0) {
        let after_gb = &cursor[pos + 8..];
        let next = find_first_of(after_gb, &["HAVING", "ORDER BY", "LIMIT"], 0).map(|(p, _)| p);
        let gb_text = match next {
            Some(p) => &after_gb[..p],
            None => after_gb,
        };
        query.group_by = split_top_level(gb_text.trim(), ',')
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        cursor = match next {
            Some(p) => &after_gb[p..],
            None => "",
        };
    }

    if let Some(pos) = find_keyword_at_depth0(cursor, "HAVING", 0) {
        let after_having = &cursor[pos + 6..];
        let next = find_first_of(after_having, &["ORDER BY", "LIMIT"], 0).map(|(p, _)| p);
        let having_text = match next {
            Some(p) => &after_having[..p],
            None => after_having,
        };
        query.having = Some(Having::Raw(having_text.trim().to_string()));
        cursor = match next {
            Some(p) => &after_having[p..],
            None => "",
        };
    }

    if let Some(pos) = find_keyword_at_depth0(cursor, "ORDER BY", 0) {
        let after_ob = &cursor[pos + 8..];
        let next = find_keyword_at_depth0(after_ob, "LIMIT", 0);
        let ob_text = match next {
            Some(p) => &after_ob[..p],
            None => after_ob,
        };
        query.order_by = split_top_level(ob_text.trim(), ',')
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(parse_order_item)
            .collect();
        cursor = match next {
            Some(p) => &after_ob[p..],
            None => "",
        };
    }

    if let Some(pos) = find_keyword_at_depth0(cursor, "LIMIT", 0) {
        let after_limit = cursor[pos + 5..].trim();
        query.limit = Some(parse_limit(after_limit)?);
    }

    Ok(query)
}

fn parse_order_item(s: String) -> OrderByItem {
    let upper = s.to_uppercase();
    if let Some(stripped) = upper.strip_suffix(" DESC") {
        OrderByItem {
            field: s[..stripped.len()].trim().to_string(),
            dir: Direction::Desc,
        }
    } else if let Some(stripped) = upper.strip_suffix(" ASC") {
        OrderByItem {
            field: s[..stripped.len()].trim().to_string(),
            dir: Direction::Asc,
        }
    } else {
        OrderByItem {
            field: s.trim().to_string(),
            dir: Direction::Asc,
        }
    }
}

fn parse_limit(s: &str) -> Result<Limit> {
    let parts = split_top_level(s, ',');
    if parts.len() == 2 {
        // LIMIT offset, count
        let offset: i64 = parts[0]
            .trim()
            .parse()
            .map_err(|_| MongoSqlError::sql_syntax(format!("invalid LIMIT offset `{}`", parts[0])))?;
        let count: i64 = parts[1]
            .trim()
            .parse()
            .map_err(|_| MongoSqlError::sql_syntax(format!("invalid LIMIT count `{}`", parts[1])))?;
        return Ok(Limit {
            count,
            offset: Some(offset),
        });
    }
    if let Some(pos) = find_keyword_at_depth0(s, "OFFSET", 0) {
        let count: i64 = s[..pos]
            .trim()
            .parse()
            .map_err(|_| MongoSqlError::sql_syntax(format!("invalid LIMIT count `{}`", &s[..pos])))?;
        let offset: i64 = s[pos + 6..]
            .trim()
            .parse()
            .map_err(|_| MongoSqlError::sql_syntax("invalid OFFSET"))?;
        return Ok(Limit {
            count,
            offset: Some(offset),
        });
    }
    let count: i64 = s
        .trim()
        .parse()
        .map_err(|_| MongoSqlError::sql_syntax(format!("invalid LIMIT `{s}`")))?;
    Ok(Limit {
        count,
        offset: None,
    })
}

fn parse_from_and_joins(from_clause: &str, query: &mut Query) -> Result<()> {
    const JOIN_PHRASES: &[&str] = &[
        "INNER JOIN",
        "LEFT OUTER JOIN",
        "LEFT JOIN",
        "RIGHT OUTER JOIN",
        "RIGHT JOIN",
        "FULL OUTER JOIN",
        "FULL JOIN",
        "CROSS JOIN",
        "JOIN",
    ];

    let first_join = find_first_of(from_clause, JOIN_PHRASES, 0);
    let (base, mut joins_text) = match first_join {
        Some((pos, _)) => (from_clause[..pos].trim(), &from_clause[pos..]),
        None => (from_clause.trim(), ""),
    };
    let (table, alias) = parse_table_ref(base);
    query.from_table = Some(table);
    query.from_alias = alias;

    while !joins_text.is_empty() {
        let (phrase, phrase_len) = JOIN_PHRASES
            .iter()
            .filter(|p| joins_text.to_uppercase().starts_with(&p.to_uppercase()))
            .map(|p| (*p, p.len()))
            .max_by_key(|(_, l)| *l)
            .ok_or_else(|| MongoSqlError::sql_syntax("malformed JOIN clause"))?;
        let kind = match phrase {
            "INNER JOIN" | "JOIN" => JoinKind::Inner,
            "LEFT JOIN" | "LEFT OUTER JOIN" => JoinKind::Left,
            "RIGHT JOIN" | "RIGHT OUTER JOIN" => JoinKind::Right,
            "FULL JOIN" | "FULL OUTER JOIN" => JoinKind::Full,
            "CROSS JOIN" => JoinKind::Cross,
            _ => unreachable!(),
        };
        let after_kw = joins_text[phrase_len..].trim_start();
        let next_join = find_first_of(after_kw, JOIN_PHRASES, 0).map(|(p, _)| p);
        let on_pos = find_keyword_at_depth0(after_kw, "ON", 0);
        let (table_part, on_part, remainder) = match (on_pos, next_join) {
            (Some(on), Some(nj)) if on < nj => (&after_kw[..on], Some(&after_kw[on + 2..nj]), &after_kw[nj..]),
            (Some(on), None) => (&after_kw[..on], Some(&after_kw[on + 2..]), ""),
            (_, Some(nj)) => (&after_kw[..nj], None, &after_kw[nj..]),
            (None, None) => (after_kw, None, ""),
        };
        let (right_table, right_alias) = parse_table_ref(table_part.trim());
        let conditions = match on_part {
            Some(cond_text) => parse_join_conditions(cond_text.trim()),
            None => Vec::new(),
        };
        let left_table = query.from_table.clone().unwrap_or_default();
        query.joins.push(JoinOp {
            kind,
            left_table,
            right_table,
            left_alias: query.from_alias.clone(),
            right_alias,
            conditions,
        });
        joins_text = remainder;
    }

    Ok(())
}

fn parse_table_ref(s: &str) -> (String, Option<String>) {
    let s = s.trim();
    if let Some(pos) = find_keyword_at_depth0(s, "AS", 0) {
        let table = s[..pos].trim().to_string();
        let alias = s[pos + 2..].trim().to_string();
        return (table, Some(alias));
    }
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() == 2 {
        return (parts[0].to_string(), Some(parts[1].to_string()));
    }
    (s.to_string(), None)
}

fn parse_join_conditions(cond_text: &str) -> Vec<JoinCond> {
    // ON clauses are `a.x = b.y [AND c.z = d.w ...]`; split on AND then on `=`.
    let ands: Vec<String> = split_on_word(cond_text, "AND");
    ands.into_iter()
        .filter_map(|clause| {
            let sides = split_top_level(&clause, '=');
            if sides.len() != 2 {
                return None;
            }
            let (lt, lc) = split_qualified(sides[0].trim());
            let (rt, rc) = split_qualified(sides[1].trim());
            Some(JoinCond {
                left_table: lt,
                left_col: lc,
                right_table: rt,
                right_col: rc,
            })
        })
        .collect()
}

fn split_on_word(text: &str, word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;
    loop {
        match find_keyword_at_depth0(rest, word, 0) {
            Some(pos) => {
                parts.push(rest[..pos].trim().to_string());
                rest = &rest[pos + word.len()..];
            }
            None => {
                parts.push(rest.trim().to_string());
                break;
            }
        }
    }
    parts.into_iter().filter(|s| !s.is_empty()).collect()
}

fn split_qualified(s: &str) -> (String, String) {
    match s.split_once('.') {
        Some((t, c)) => (t.to_string(), c.to_string()),
        None => (String::new(), s.to_string()),
    }
}

/// Parse a single SELECT list item into a `Column`.
fn parse_column(raw: &str) -> Result<Column> {
    let (body, alias) = extract_alias(raw.trim());
    let body = body.trim();

    if body == "*" {
        return Ok(Column::Star);
    }

    if body.to_uppercase().starts_with("CASE") {
        return parse_case_column(body, alias);
    }

    if let Some((left, op, right)) = parse_regexp_infix(body) {
        return Ok(Column::RegexpInfix {
            left,
            operator: op,
            right,
            alias,
        });
    }

    if let Some(open) = body.find('(') {
        let name_candidate = body[..open].trim();
        if !name_candidate.is_empty()
            && name_candidate
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_')
            && body.trim_end().ends_with(')')
        {
            let close = body.rfind(')').unwrap();
            let args_text = body[open + 1..close].to_string();
            let name = name_candidate.to_uppercase();
            let is_aggregate = functions::is_aggregate(&name);
            let is_window = functions::is_window(&name);
            let after_close = body[close + 1..].trim();
            let window_spec = if after_close.to_uppercase().starts_with("OVER") {
                Some(parse_window_spec(&after_close[4..].trim())?)
            } else {
                None
            };
            return Ok(Column::Function {
                name,
                args_text,
                alias,
                original_text: body.to_string(),
                is_aggregate,
                is_window,
                window_spec,
            });
        }
    }

    // Plain column reference, possibly table-qualified.
    if body
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && !body.is_empty()
    {
        let (qualifier, name) = match body.split_once('.') {
            Some((t, c)) => (Some(t.to_string()), c.to_string()),
            None => (None, body.to_string()),
        };
        return Ok(Column::Plain {
            name,
            table_qualifier: qualifier,
            alias,
        });
    }

    Ok(Column::Raw {
        text: body.to_string(),
        alias,
    })
}

fn extract_alias(s: &str) -> (String, Option<String>) {
    if let Some(pos) = find_keyword_at_depth0(s, "AS", 0) {
        let body = s[..pos].trim().to_string();
        let alias = s[pos + 2..].trim().to_string();
        return (body, Some(alias));
    }
    // Trailing bareword heuristic: `expr alias` with no AS, where the last
    // whitespace-separated token is a plain identifier and the remainder
    // still looks like a complete expression (balanced parens).
    if let Some(last_space) = s.trim_end().rfind(char::is_whitespace) {
        let candidate = s[last_space..].trim();
        let head = s[..last_space].trim();
        let balanced = head.matches('(').count() == head.matches(')').count();
        let is_bareword = !candidate.is_empty()
            && candidate.chars().all(|c| c.is_alphanumeric() || c == '_')
            && !is_reserved_trailing(candidate);
        if balanced && is_bareword && !head.is_empty() {
            return (head.to_string(), Some(candidate.to_string()));
        }
    }
    (s.to_string(), None)
}

fn is_reserved_trailing(word: &str) -> bool {
    matches!(
        word.to_uppercase().as_str(),
        "ASC" | "DESC" | "END" | "NULL" | "TRUE" | "FALSE"
    )
}

fn parse_case_column(body: &str, alias: Option<String>) -> Result<Column> {
    let after_case = body[4..].trim_start();
    let mut when_clauses = Vec::new();
    let mut cursor = after_case;
    loop {
        if let Some(pos) = find_keyword_at_depth0(cursor, "WHEN", 0) {
            if pos != 0 {
                return Err(MongoSqlError::sql_syntax(
                    "malformed CASE: expected WHEN, ELSE, or END",
                ));
            }
            let after_when = &cursor[4..];
            let then_pos = find_keyword_at_depth0(after_when, "THEN", 0).ok_or_else(|| {
                MongoSqlError::sql_syntax("CASE WHEN missing THEN")
            })?;
            let cond = after_when[..then_pos].trim().to_string();
            let after_then = &after_when[then_pos + 4..];
            let next = find_first_of(after_then, &["WHEN", "ELSE", "END"], 0)
                .ok_or_else(|| MongoSqlError::sql_syntax("CASE missing END"))?;
            let then = after_then[..next.0].trim().to_string();
            when_clauses.push(WhenClause { cond, then });
            cursor = &after_then[next.0..];
        } else {
            break;
        }
    }
    let else_ = if cursor.to_uppercase().starts_with("ELSE") {
        let after_else = &cursor[4..];
        let end_pos = find_keyword_at_depth0(after_else, "END", 0)
            .ok_or_else(|| MongoSqlError::sql_syntax("CASE ELSE missing END"))?;
        Some(after_else[..end_pos].trim().to_string())
    } else {
        None
    };
    Ok(Column::Case {
        when_clauses,
        else_,
        alias,
    })
}

fn parse_regexp_infix(body: &str) -> Option<(String, RegexpOp, String)> {
    let upper = body.to_uppercase();
    let (op, kw) = if let Some(p) = find_keyword_at_depth0(&upper, "NOT REGEXP", 0) {
        (RegexpOp::NotRegexp, (p, "NOT REGEXP".len()))
    } else if let Some(p) = find_keyword_at_depth0(&upper, "REGEXP", 0) {
        (RegexpOp::Regexp, (p, "REGEXP".len()))
    } else if let Some(p) = find_keyword_at_depth0(&upper, "RLIKE", 0) {
        (RegexpOp::Rlike, (p, "RLIKE".len()))
    } else {
        return None;
    };
    let (pos, len) = kw;
    let left = body[..pos].trim().to_string();
    let right = body[pos + len..].trim().to_string();
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, op, right))
}

fn parse_window_spec(raw_paren: &str) -> Result<WindowSpec> {
    let inner = strip_outer_parens(raw_paren.trim());
    let raw = inner.to_string();
    let mut partition_by = Vec::new();
    let mut order_by = Vec::new();

    let pb_pos = find_keyword_at_depth0(inner, "PARTITION BY", 0);
    let ob_pos = find_keyword_at_depth0(inner, "ORDER BY", 0);

    if let Some(p) = pb_pos {
        let after = &inner[p + "PARTITION BY".len()..];
        let end = ob_pos.map(|o| o.saturating_sub(p + "PARTITION BY".len()));
        let text = match end {
            Some(e) if e <= after.len() => &after[..e],
            _ => after,
        };
        partition_by = split_top_level(text.trim(), ',')
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(o) = ob_pos {
        let text = &inner[o + "ORDER BY".len()..];
        order_by = split_top_level(text.trim(), ',')
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(parse_order_item)
            .collect();
    }

    Ok(WindowSpec {
        raw,
        partition_by,
        order_by,
    })
}

/// Parse a WHERE/HAVING predicate tree. Per the documented ambiguity in
/// spec.md §9, a mixed run of AND/OR at the same nesting level collapses
/// into a single flat `Compound { op: And, .. }` rather than respecting
/// SQL's AND-binds-tighter-than-OR precedence — this is carried over
/// deliberately, not fixed, since it is a named "do not guess intent"
/// behaviour.
fn parse_predicate(text: &str, query: &mut Query) -> Result<Predicate> {
    let text = strip_outer_parens(text.trim());
    let or_parts = split_on_word(text, "OR");
    if or_parts.len() > 1 {
        let and_parts = split_on_word(text, "AND");
        if and_parts.len() > 1 {
            // Mixed AND/OR at the same level: flatten to a single AND, per
            // the preserved ambiguity above.
            let children = split_top_level_bool(text, &["AND", "OR"])
                .into_iter()
                .map(|p| parse_predicate(&p, query))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Predicate::Compound {
                op: BoolOp::And,
                children,
            });
        }
        let children = or_parts
            .into_iter()
            .map(|p| parse_predicate(&p, query))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Predicate::Compound {
            op: BoolOp::Or,
            children,
        });
    }

    let and_parts = split_on_word(text, "AND");
    if and_parts.len() > 1 {
        let children = and_parts
            .into_iter()
            .map(|p| parse_predicate(&p, query))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Predicate::Compound {
            op: BoolOp::And,
            children,
        });
    }

    parse_simple_predicate(text.trim(), query)
}

fn split_top_level_bool(text: &str, words: &[&str]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text;
    loop {
        match find_first_of(rest, words, 0) {
            Some((pos, word)) => {
                parts.push(rest[..pos].trim().to_string());
                rest = &rest[pos + word.len()..];
            }
            None => {
                parts.push(rest.trim().to_string());
                break;
            }
        }
    }
    parts.into_iter().filter(|s| !s.is_empty()).collect()
}

fn parse_simple_predicate(text: &str, query: &mut Query) -> Result<Predicate> {
    let text = strip_outer_parens(text);
    let upper = text.to_uppercase();

    if let Some(pos) = find_keyword_at_depth0(&upper, "NOT BETWEEN", 0) {
        return build_between(text, pos, "NOT BETWEEN".len(), true);
    }
    if let Some(pos) = find_keyword_at_depth0(&upper, "BETWEEN", 0) {
        return build_between(text, pos, "BETWEEN".len(), false);
    }

    if let Some(pos) = find_keyword_at_depth0(&upper, "NOT IN", 0) {
        return build_in(text, pos, "NOT IN".len(), true, query);
    }
    if let Some(pos) = find_keyword_at_depth0(&upper, "IN", 0) {
        return build_in(text, pos, "IN".len(), false, query);
    }

    if find_keyword_at_depth0(&upper, "EXISTS", 0) == Some(0) {
        let rest = text[6..].trim();
        let inner = strip_outer_parens(rest);
        let sub = register_subquery(query, SubqueryKind::Exists, inner, None, None);
        return Ok(Predicate::Simple {
            field: sub,
            op: CompareOp::Eq,
            value: PredicateValue::None,
        });
    }

    if let Some(pos) = find_keyword_at_depth0(&upper, "NOT LIKE", 0) {
        let field = text[..pos].trim().to_string();
        let pattern = text[pos + 8..].trim();
        return Ok(Predicate::Simple {
            field,
            op: CompareOp::NotLike,
            value: PredicateValue::Single(literal_value(pattern)),
        });
    }
    if let Some(pos) = find_keyword_at_depth0(&upper, "LIKE", 0) {
        let field = text[..pos].trim().to_string();
        let pattern = text[pos + 4..].trim();
        return Ok(Predicate::Simple {
            field,
            op: CompareOp::Like,
            value: PredicateValue::Single(literal_value(pattern)),
        });
    }

    if let Some(pos) = find_keyword_at_depth0(&upper, "IS NOT NULL", 0) {
        let field = text[..pos].trim().to_string();
        return Ok(Predicate::Simple {
            field,
            op: CompareOp::IsNotNull,
            value: PredicateValue::None,
        });
    }
    if let Some(pos) = find_keyword_at_depth0(&upper, "IS NULL", 0) {
        let field = text[..pos].trim().to_string();
        return Ok(Predicate::Simple {
            field,
            op: CompareOp::IsNull,
            value: PredicateValue::None,
        });
    }

    if let Some((left, op, right)) = parse_regexp_infix(text) {
        let cmp = match op {
            RegexpOp::Regexp => CompareOp::Regexp,
            RegexpOp::Rlike => CompareOp::Rlike,
            RegexpOp::NotRegexp => CompareOp::NotRegexp,
        };
        return Ok(Predicate::Simple {
            field: left,
            op: cmp,
            value: PredicateValue::Single(literal_value(&right)),
        });
    }

    const CMP_OPS: &[(&str, CompareOp)] = &[
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("<>", CompareOp::Ne),
        ("!=", CompareOp::Ne),
        ("=", CompareOp::Eq),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ];
    for (sym, op) in CMP_OPS {
        if let Some(pos) = find_top_level_operator(text, sym) {
            let field = text[..pos].trim().to_string();
            let rhs = text[pos + sym.len()..].trim();
            if rhs.trim_start().starts_with('(') {
                let rhs_inner = strip_outer_parens(rhs);
                if rhs_inner.to_uppercase().starts_with("SELECT") {
                    let sub = register_subquery(query, SubqueryKind::Scalar, rhs_inner, Some(field.clone()), Some(*op));
                    return Ok(Predicate::Simple {
                        field: sub,
                        op: *op,
                        value: PredicateValue::None,
                    });
                }
            }
            return Ok(Predicate::Simple {
                field,
                op: *op,
                value: PredicateValue::Single(literal_value(rhs)),
            });
        }
    }

    Err(MongoSqlError::sql_syntax(format!(
        "could not parse predicate `{text}`"
    )))
}

fn find_top_level_operator(text: &str, op: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
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
            b'\'' | b'"' | b'`' => in_quote = Some(c),
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && in_quote.is_none() && text[i..].starts_with(op) {
            // Avoid matching `=` inside `<=`, `>=`, `<>`, `!=` when searching
            // for the bare `=` operator.
            if op == "=" && i > 0 && matches!(bytes[i - 1], b'<' | b'>' | b'!') {
                i += 1;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

fn build_between(text: &str, kw_pos: usize, kw_len: usize, negate: bool) -> Result<Predicate> {
    let field = text[..kw_pos].trim().to_string();
    let rest = text[kw_pos + kw_len..].trim();
    let and_pos = find_keyword_at_depth0(rest, "AND", 0)
        .ok_or_else(|| MongoSqlError::sql_syntax("BETWEEN missing AND"))?;
    let lo = literal_value(rest[..and_pos].trim());
    let hi = literal_value(rest[and_pos + 3..].trim());
    Ok(Predicate::Simple {
        field,
        op: if negate {
            CompareOp::NotBetween
        } else {
            CompareOp::Between
        },
        value: PredicateValue::Between(lo, hi),
    })
}

fn build_in(
    text: &str,
    kw_pos: usize,
    kw_len: usize,
    negate: bool,
    query: &mut Query,
) -> Result<Predicate> {
    let field = text[..kw_pos].trim().to_string();
    let rest = text[kw_pos + kw_len..].trim();
    let inner = strip_outer_parens(rest);
    let op = if negate {
        CompareOp::NotIn
    } else {
        CompareOp::In
    };
    if inner.to_uppercase().starts_with("SELECT") {
        let sub = register_subquery(query, SubqueryKind::InList, inner, Some(field), None);
        return Ok(Predicate::Simple {
            field: sub,
            op,
            value: PredicateValue::None,
        });
    }
    let values = split_top_level(inner, ',')
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| literal_value(&s))
        .collect();
    Ok(Predicate::Simple {
        field,
        op,
        value: PredicateValue::List(values),
    })
}

fn literal_value(s: &str) -> Value {
    let s = s.trim();
    if (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
        || (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
    {
        return Value::from_literal(&s[1..s.len() - 1], true);
    }
    Value::from_literal(s, false)
}

/// Register a subquery on the enclosing `Query`, deriving correlation
/// fields from any `outer_alias.column` references found in the inner
/// WHERE clause rather than assuming a fixed table name.
fn register_subquery(
    query: &mut Query,
    kind: SubqueryKind,
    inner_sql: &str,
    outer_field: Option<String>,
    comparison_op: Option<CompareOp>,
) -> String {
    let inner_collection = find_keyword_at_depth0(inner_sql, "FROM", 0)
        .map(|p| {
            let after = inner_sql[p + 4..].trim_start();
            let end = after
                .char_indices()
                .find(|(_, c)| c.is_whitespace())
                .map(|(i, _)| i)
                .unwrap_or(after.len());
            after[..end].to_string()
        })
        .unwrap_or_default();

    let correlation_fields = find_correlated_fields(inner_sql);

    let alias = format!("__subquery_{}", query.subqueries.len());
    query.subqueries.push(Subquery {
        kind,
        outer_field,
        inner_sql: inner_sql.to_string(),
        inner_collection,
        inner_field: None,
        comparison_op,
        correlation_fields,
        alias: Some(alias.clone()),
    });
    alias
}

/// Scan the inner query's WHERE clause for `alias.column` references that
/// look like they point outside the inner FROM — a best-effort heuristic,
/// since full scope resolution would need the outer query's alias table.
fn find_correlated_fields(inner_sql: &str) -> Vec<String> {
    let mut fields = Vec::new();
    if let Some(pos) = find_keyword_at_depth0(inner_sql, "WHERE", 0) {
        let where_text = &inner_sql[pos + 5..];
        let chars: Vec<char> = where_text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i].is_alphabetic() || chars[i] == '_' {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if i < chars.len() && chars[i] == '.' {
                    let mut j = i + 1;
                    while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                        j += 1;
                    }
                    let qualified: String = chars[start..j].iter().collect();
                    fields.push(qualified);
                    i = j;
                    continue;
                }
                let _ = start;
            } else {
                i += 1;
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select() {
        let q = parse("SELECT a, b FROM t WHERE a = 1").unwrap();
        assert_eq!(q.columns.len(), 2);
        assert_eq!(q.from_table.as_deref(), Some("t"));
        assert!(q.where_pred.is_some());
    }

    #[test]
    fn parses_select_with_alias_and_group_by() {
        let q = parse("SELECT COUNT(*) AS cnt FROM orders GROUP BY customer_id").unwrap();
        assert_eq!(q.group_by, vec!["customer_id".to_string()]);
        match &q.columns[0] {
            Column::Function { name, alias, .. } => {
                assert_eq!(name, "COUNT");
                assert_eq!(alias.as_deref(), Some("cnt"));
            }
            other => panic!("expected Function column, got {other:?}"),
        }
    }

    #[test]
    fn parses_join_with_on_condition() {
        let q = parse(
            "SELECT a.x FROM a JOIN b ON a.id = b.a_id WHERE a.x > 1",
        )
        .unwrap();
        assert_eq!(q.joins.len(), 1);
        assert_eq!(q.joins[0].kind, JoinKind::Inner);
        assert_eq!(q.joins[0].conditions[0].left_col, "id");
    }

    #[test]
    fn parses_between_predicate() {
        let q = parse("SELECT a FROM t WHERE x BETWEEN 1 AND 10").unwrap();
        match q.where_pred.unwrap() {
            Predicate::Simple { op, .. } => assert_eq!(op, CompareOp::Between),
            other => panic!("expected Simple predicate, got {other:?}"),
        }
    }

    #[test]
    fn parses_in_subquery() {
        let q = parse(
            "SELECT a FROM t WHERE id IN (SELECT t2.id FROM t2 WHERE t2.active = 1)",
        )
        .unwrap();
        assert_eq!(q.subqueries.len(), 1);
        assert_eq!(q.subqueries[0].kind, SubqueryKind::InList);
    }

    #[test]
    fn parses_case_column() {
        let q = parse("SELECT CASE WHEN a > 1 THEN 'big' ELSE 'small' END AS size FROM t").unwrap();
        match &q.columns[0] {
            Column::Case { when_clauses, alias, .. } => {
                assert_eq!(when_clauses.len(), 1);
                assert_eq!(alias.as_deref(), Some("size"));
            }
            other => panic!("expected Case column, got {other:?}"),
        }
    }
}
