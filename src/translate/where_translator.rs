//! WHERE/HAVING translator (W). Compiles a `Predicate` tree into either a
//! `$match`-shaped filter document (field paths as keys) or an `$expr`
//! boolean expression (for post-`$group` HAVING filters, where the only
//! fields available are the group's own output names). Grounded on the
//! original implementation's `where_translator.py`, reconciled with
//! spec.md's literal "mixed AND/OR collapses to one flat AND" wording where
//! the two sources disagreed.

use crate::error::{MongoSqlError, Result};
use crate::functions::regexp;
use crate::sql::ast::{BoolOp, CompareOp, Predicate, PredicateValue, Value};
use bson::{doc, Bson, Document};

/// Compile a predicate into a MongoDB filter document suitable for
/// `$match` / `find()`.
pub fn translate(pred: &Predicate) -> Result<Document> {
    match pred {
        Predicate::Compound { op, children } => {
            let compiled = children
                .iter()
                .map(translate)
                .collect::<Result<Vec<_>>>()?;
            let key = match op {
                BoolOp::And => "$and",
                BoolOp::Or => "$or",
            };
            Ok(doc! { key: compiled.into_iter().map(Bson::Document).collect::<Vec<_>>() })
        }
        Predicate::Simple { field, op, value } => simple_filter(field, *op, value),
    }
}

fn simple_filter(field: &str, op: CompareOp, value: &PredicateValue) -> Result<Document> {
    match op {
        CompareOp::IsNull => return Ok(doc! { field: Bson::Null }),
        CompareOp::IsNotNull => return Ok(doc! { field: { "$ne": Bson::Null } }),
        CompareOp::Between => {
            if let PredicateValue::Between(lo, hi) = value {
                return Ok(doc! { field: { "$gte": lo.to_bson(), "$lte": hi.to_bson() } });
            }
        }
        CompareOp::NotBetween => {
            if let PredicateValue::Between(lo, hi) = value {
                return Ok(doc! {
                    "$or": [
                        { field: { "$lt": lo.to_bson() } },
                        { field: { "$gt": hi.to_bson() } },
                    ]
                });
            }
        }
        CompareOp::In => {
            if let PredicateValue::List(values) = value {
                let arr: Vec<Bson> = values.iter().map(Value::to_bson).collect();
                return Ok(doc! { field: { "$in": arr } });
            }
        }
        CompareOp::NotIn => {
            if let PredicateValue::List(values) = value {
                let arr: Vec<Bson> = values.iter().map(Value::to_bson).collect();
                return Ok(doc! { field: { "$nin": arr } });
            }
        }
        CompareOp::Like | CompareOp::NotLike => {
            if let PredicateValue::Single(Value::Str(pattern)) = value {
                let regex = like_to_regex(pattern);
                let cond = doc! { "$regex": regex, "$options": "i" };
                return Ok(if matches!(op, CompareOp::NotLike) {
                    doc! { field: { "$not": Bson::Document(cond) } }
                } else {
                    doc! { field: cond }
                });
            }
        }
        CompareOp::Regexp | CompareOp::Rlike | CompareOp::NotRegexp => {
            if let PredicateValue::Single(Value::Str(pattern)) = value {
                return Ok(regexp::where_condition(
                    field,
                    pattern,
                    matches!(op, CompareOp::NotRegexp),
                ));
            }
        }
        _ => {}
    }

    // Plain comparisons, and the subquery placeholder fall-through: a
    // Subquery-bound predicate reaches here with `value: PredicateValue::None`
    // and `field` set to the subquery's generated alias; the top-level
    // translator rewrites those placeholders once the subquery is resolved,
    // so seeing one here means resolution was skipped.
    let v = match value {
        PredicateValue::Single(v) => v.to_bson(),
        PredicateValue::None => {
            return Err(MongoSqlError::translation(format!(
                "unresolved subquery placeholder `{field}` reached the WHERE translator"
            )))
        }
        other => {
            return Err(MongoSqlError::translation(format!(
                "comparison operator {op:?} given unsupported value shape {other:?}"
            )))
        }
    };

    let mongo_op = match op {
        CompareOp::Eq => return Ok(doc! { field: v }),
        CompareOp::Ne => "$ne",
        CompareOp::Lt => "$lt",
        CompareOp::Le => "$lte",
        CompareOp::Gt => "$gt",
        CompareOp::Ge => "$gte",
        _ => unreachable!("handled above"),
    };
    Ok(doc! { field: { mongo_op: v } })
}

/// Compile a predicate into an `$expr`-style boolean expression, for use as
/// a post-`$group` HAVING filter where `field` names are the group stage's
/// own output fields (referenced as `$field`), not raw document paths.
pub fn translate_expr(pred: &Predicate) -> Result<Bson> {
    match pred {
        Predicate::Compound { op, children } => {
            let compiled = children
                .iter()
                .map(translate_expr)
                .collect::<Result<Vec<_>>>()?;
            let key = match op {
                BoolOp::And => "$and",
                BoolOp::Or => "$or",
            };
            Ok(Bson::Document(doc! { key: compiled }))
        }
        Predicate::Simple { field, op, value } => simple_expr(field, *op, value),
    }
}

fn simple_expr(field: &str, op: CompareOp, value: &PredicateValue) -> Result<Bson> {
    let fref = Bson::String(format!("${field}"));
    match op {
        CompareOp::IsNull => return Ok(Bson::Document(doc! { "$eq": [fref, Bson::Null] })),
        CompareOp::IsNotNull => return Ok(Bson::Document(doc! { "$ne": [fref, Bson::Null] })),
        CompareOp::Between => {
            if let PredicateValue::Between(lo, hi) = value {
                return Ok(Bson::Document(doc! {
                    "$and": [
                        { "$gte": [fref.clone(), lo.to_bson()] },
                        { "$lte": [fref, hi.to_bson()] },
                    ]
                }));
            }
        }
        CompareOp::In => {
            if let PredicateValue::List(values) = value {
                let arr: Vec<Bson> = values.iter().map(Value::to_bson).collect();
                return Ok(Bson::Document(doc! { "$in": [fref, arr] }));
            }
        }
        _ => {}
    }

    let v = match value {
        PredicateValue::Single(v) => v.to_bson(),
        other => {
            return Err(MongoSqlError::translation(format!(
                "HAVING comparison {op:?} given unsupported value shape {other:?}"
            )))
        }
    };
    let mongo_op = match op {
        CompareOp::Eq => "$eq",
        CompareOp::Ne => "$ne",
        CompareOp::Lt => "$lt",
        CompareOp::Le => "$lte",
        CompareOp::Gt => "$gt",
        CompareOp::Ge => "$gte",
        other => {
            return Err(MongoSqlError::unsupported(format!(
                "HAVING comparison {other:?} not supported"
            )))
        }
    };
    Ok(Bson::Document(doc! { mongo_op: [fref, v] }))
}

/// Translate a MySQL `LIKE` pattern (`%`/`_` wildcards, `\` escapes) into a
/// regular expression, escaping regex metacharacters along the way.
fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::{CompareOp as Op, Predicate as P, PredicateValue as PV, Value as V};
    use rstest::rstest;

    #[rstest]
    #[case(Op::Eq, "price")]
    #[case(Op::Ne, "$ne")]
    #[case(Op::Lt, "$lt")]
    #[case(Op::Le, "$lte")]
    #[case(Op::Gt, "$gt")]
    #[case(Op::Ge, "$gte")]
    fn compiles_each_comparison_operator(#[case] op: Op, #[case] mongo_op: &str) {
        let pred = P::Simple {
            field: "price".to_string(),
            op,
            value: PV::Single(V::Int(10)),
        };
        let doc = translate(&pred).unwrap();
        if op == Op::Eq {
            assert_eq!(doc.get_i32("price").unwrap(), 10);
        } else {
            let inner = doc.get_document("price").unwrap();
            assert!(inner.contains_key(mongo_op));
        }
    }

    #[test]
    fn translates_simple_equality() {
        let pred = P::Simple {
            field: "status".to_string(),
            op: Op::Eq,
            value: PV::Single(V::Str("active".to_string())),
        };
        let doc = translate(&pred).unwrap();
        assert_eq!(doc.get_str("status").unwrap(), "active");
    }

    #[test]
    fn translates_and_or_mix() {
        let pred = P::Compound {
            op: BoolOp::Or,
            children: vec![
                P::Simple {
                    field: "a".to_string(),
                    op: Op::Gt,
                    value: PV::Single(V::Int(1)),
                },
                P::Simple {
                    field: "b".to_string(),
                    op: Op::Lt,
                    value: PV::Single(V::Int(5)),
                },
            ],
        };
        let doc = translate(&pred).unwrap();
        assert!(doc.contains_key("$or"));
    }

    #[test]
    fn like_pattern_escapes_regex_metacharacters() {
        let re = like_to_regex("50%_off.txt");
        assert_eq!(re, "^50.*.off\\.txt$");
    }
}
