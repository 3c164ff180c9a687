//! FROM-less expression evaluator (E). A `SELECT <exprs>` with no FROM
//! clause has nothing to send to MongoDB — `crate::expr` still compiles
//! each column into the same aggregation-expression shape used elsewhere,
//! but here that tree is folded locally over literals instead of being
//! run by the server. Grounded on the original implementation's
//! `_handle_no_table_query`: each column is evaluated independently, and a
//! column whose expression uses an operator this evaluator doesn't know
//! degrades to `NULL` rather than failing the whole row — matching a
//! client that would still rather print `NULL` next to eight correct
//! columns than refuse all nine.

use crate::error::{MongoSqlError, Result};
use bson::Bson;

/// Evaluate every compiled column expression, degrading individually on
/// failure. Always succeeds at the row level; a failing column's value is
/// `Bson::Null`.
pub fn evaluate(columns: &[(String, Bson)]) -> Vec<(String, Bson)> {
    columns
        .iter()
        .map(|(label, expr)| {
            let value = eval_bson(expr).unwrap_or(Bson::Null);
            (label.clone(), value)
        })
        .collect()
}

fn eval_bson(b: &Bson) -> Result<Bson> {
    match b {
        Bson::Document(d) if d.len() == 1 && d.keys().next().unwrap().starts_with('$') => {
            let (op, operand) = d.iter().next().unwrap();
            eval_operator(op, operand)
        }
        Bson::Array(items) => {
            let evaluated = items
                .iter()
                .map(eval_bson)
                .collect::<Result<Vec<_>>>()?;
            Ok(Bson::Array(evaluated))
        }
        other => Ok(other.clone()),
    }
}

fn eval_args(operand: &Bson) -> Result<Vec<Bson>> {
    match operand {
        Bson::Array(items) => items.iter().map(eval_bson).collect(),
        other => Ok(vec![eval_bson(other)?]),
    }
}

fn eval_operator(op: &str, operand: &Bson) -> Result<Bson> {
    match op {
        "$add" | "$subtract" | "$multiply" | "$divide" | "$mod" => {
            let args = eval_args(operand)?;
            arithmetic(op, &args)
        }
        "$abs" => numeric_unary(operand, f64::abs),
        "$ceil" => numeric_unary(operand, f64::ceil),
        "$floor" => numeric_unary(operand, f64::floor),
        "$sqrt" => numeric_unary(operand, f64::sqrt),
        "$sin" => numeric_unary(operand, f64::sin),
        "$cos" => numeric_unary(operand, f64::cos),
        "$tan" => numeric_unary(operand, f64::tan),
        "$ln" => numeric_unary(operand, f64::ln),
        "$exp" => numeric_unary(operand, f64::exp),
        "$pow" => {
            let args = eval_args(operand)?;
            let base = to_f64(&args[0])?;
            let exp = to_f64(args.get(1).ok_or_else(missing_arg)?)?;
            Ok(Bson::Double(base.powf(exp)))
        }
        "$log" => {
            let args = eval_args(operand)?;
            let x = to_f64(&args[0])?;
            let base = to_f64(args.get(1).ok_or_else(missing_arg)?)?;
            Ok(Bson::Double(x.log(base)))
        }
        "$round" => {
            let args = eval_args(operand)?;
            let x = to_f64(&args[0])?;
            let places = args.get(1).map(to_i64).transpose()?.unwrap_or(0);
            let factor = 10f64.powi(places as i32);
            Ok(Bson::Double((x * factor).round() / factor))
        }
        "$max" => {
            let args = eval_args(operand)?;
            reduce_numeric(&args, f64::max)
        }
        "$min" => {
            let args = eval_args(operand)?;
            reduce_numeric(&args, f64::min)
        }
        "$concat" => {
            let args = eval_args(operand)?;
            let mut s = String::new();
            for a in &args {
                s.push_str(&to_display_string(a)?);
            }
            Ok(Bson::String(s))
        }
        "$toUpper" => Ok(Bson::String(to_display_string(&eval_bson(operand)?)?.to_uppercase())),
        "$toLower" => Ok(Bson::String(to_display_string(&eval_bson(operand)?)?.to_lowercase())),
        "$strLenCP" => Ok(Bson::Int64(
            to_display_string(&eval_bson(operand)?)?.chars().count() as i64,
        )),
        "$substrCP" => {
            let args = eval_args(operand)?;
            let s = to_display_string(&args[0])?;
            let start = to_i64(args.get(1).ok_or_else(missing_arg)?)?.max(0) as usize;
            let len = to_i64(args.get(2).ok_or_else(missing_arg)?)?.max(0) as usize;
            let chars: Vec<char> = s.chars().collect();
            let end = (start + len).min(chars.len());
            let start = start.min(chars.len());
            Ok(Bson::String(chars[start..end].iter().collect()))
        }
        "$indexOfCP" => {
            let args = eval_args(operand)?;
            let haystack = to_display_string(&args[0])?;
            let needle = to_display_string(args.get(1).ok_or_else(missing_arg)?)?;
            let chars: Vec<char> = haystack.chars().collect();
            let needle_chars: Vec<char> = needle.chars().collect();
            if needle_chars.is_empty() {
                return Ok(Bson::Int64(0));
            }
            for i in 0..=chars.len().saturating_sub(needle_chars.len()) {
                if chars[i..i + needle_chars.len()] == needle_chars[..] {
                    return Ok(Bson::Int64(i as i64));
                }
            }
            Ok(Bson::Int64(-1))
        }
        "$replaceAll" => {
            let doc = operand
                .as_document()
                .ok_or_else(|| MongoSqlError::translation("$replaceAll expects a document"))?;
            let input = to_display_string(&eval_bson(doc.get("input").ok_or_else(missing_arg)?)?)?;
            let find = to_display_string(&eval_bson(doc.get("find").ok_or_else(missing_arg)?)?)?;
            let replacement =
                to_display_string(&eval_bson(doc.get("replacement").ok_or_else(missing_arg)?)?)?;
            Ok(Bson::String(input.replace(&find, &replacement)))
        }
        "$trim" | "$ltrim" | "$rtrim" => {
            let doc = operand
                .as_document()
                .ok_or_else(|| MongoSqlError::translation("trim expects a document"))?;
            let input = to_display_string(&eval_bson(doc.get("input").ok_or_else(missing_arg)?)?)?;
            Ok(Bson::String(match op {
                "$ltrim" => input.trim_start().to_string(),
                "$rtrim" => input.trim_end().to_string(),
                _ => input.trim().to_string(),
            }))
        }
        "$reverse" => Ok(Bson::String(
            to_display_string(&eval_bson(operand)?)?.chars().rev().collect(),
        )),
        "$repeat" => {
            let args = eval_args(operand)?;
            let s = to_display_string(&args[0])?;
            let n = to_i64(args.get(1).ok_or_else(missing_arg)?)?.max(0) as usize;
            Ok(Bson::String(s.repeat(n)))
        }
        "$space" => {
            let n = to_i64(&eval_bson(operand)?)?.max(0) as usize;
            Ok(Bson::String(" ".repeat(n)))
        }
        "$cmp" => {
            let args = eval_args(operand)?;
            let a = to_display_string(&args[0])?;
            let b = to_display_string(args.get(1).ok_or_else(missing_arg)?)?;
            Ok(Bson::Int32(match a.cmp(&b) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }))
        }
        "$eq" | "$ne" | "$lt" | "$lte" | "$gt" | "$gte" => {
            let args = eval_args(operand)?;
            compare(op, &args[0], args.get(1).ok_or_else(missing_arg)?)
        }
        "$and" => {
            let args = eval_args(operand)?;
            Ok(Bson::Boolean(args.iter().all(truthy)))
        }
        "$or" => {
            let args = eval_args(operand)?;
            Ok(Bson::Boolean(args.iter().any(truthy)))
        }
        "$not" => {
            let args = eval_args(operand)?;
            Ok(Bson::Boolean(!truthy(&args[0])))
        }
        "$ifNull" => {
            let args = eval_args(operand)?;
            for a in &args {
                if !matches!(a, Bson::Null) {
                    return Ok(a.clone());
                }
            }
            Ok(Bson::Null)
        }
        "$cond" => eval_cond(operand),
        "$switch" => eval_switch(operand),
        _ => Err(MongoSqlError::unsupported(format!(
            "operator {op} has no local (FROM-less) evaluator"
        ))),
    }
}

fn missing_arg() -> MongoSqlError {
    MongoSqlError::translation("missing operator argument")
}

fn eval_cond(operand: &Bson) -> Result<Bson> {
    match operand {
        Bson::Array(items) if items.len() == 3 => {
            let cond = eval_bson(&items[0])?;
            if truthy(&cond) {
                eval_bson(&items[1])
            } else {
                eval_bson(&items[2])
            }
        }
        Bson::Document(d) => {
            let cond = eval_bson(d.get("if").ok_or_else(missing_arg)?)?;
            if truthy(&cond) {
                eval_bson(d.get("then").ok_or_else(missing_arg)?)
            } else {
                eval_bson(d.get("else").ok_or_else(missing_arg)?)
            }
        }
        _ => Err(MongoSqlError::translation("malformed $cond")),
    }
}

fn eval_switch(operand: &Bson) -> Result<Bson> {
    let doc = operand
        .as_document()
        .ok_or_else(|| MongoSqlError::translation("$switch expects a document"))?;
    let branches = doc
        .get_array("branches")
        .map_err(|_| MongoSqlError::translation("$switch missing branches"))?;
    for branch in branches {
        let b = branch
            .as_document()
            .ok_or_else(|| MongoSqlError::translation("malformed $switch branch"))?;
        let cond = eval_bson(b.get("case").ok_or_else(missing_arg)?)?;
        if truthy(&cond) {
            return eval_bson(b.get("then").ok_or_else(missing_arg)?);
        }
    }
    match doc.get("default") {
        Some(d) => eval_bson(d),
        None => Ok(Bson::Null),
    }
}

fn arithmetic(op: &str, args: &[Bson]) -> Result<Bson> {
    if args.is_empty() {
        return Err(missing_arg());
    }
    let all_int = args.iter().all(|a| matches!(a, Bson::Int32(_) | Bson::Int64(_)));
    if all_int && op != "$divide" {
        let mut acc = to_i64(&args[0])?;
        for a in &args[1..] {
            let v = to_i64(a)?;
            acc = match op {
                "$add" => acc + v,
                "$subtract" => acc - v,
                "$multiply" => acc * v,
                "$mod" => acc % v,
                _ => unreachable!(),
            };
        }
        return Ok(Bson::Int64(acc));
    }
    let mut acc = to_f64(&args[0])?;
    for a in &args[1..] {
        let v = to_f64(a)?;
        acc = match op {
            "$add" => acc + v,
            "$subtract" => acc - v,
            "$multiply" => acc * v,
            "$divide" => acc / v,
            "$mod" => acc % v,
            _ => unreachable!(),
        };
    }
    Ok(Bson::Double(acc))
}

fn numeric_unary(operand: &Bson, f: impl Fn(f64) -> f64) -> Result<Bson> {
    let v = to_f64(&eval_bson(operand)?)?;
    Ok(Bson::Double(f(v)))
}

fn reduce_numeric(args: &[Bson], f: impl Fn(f64, f64) -> f64) -> Result<Bson> {
    if args.is_empty() {
        return Err(missing_arg());
    }
    let mut acc = to_f64(&args[0])?;
    for a in &args[1..] {
        acc = f(acc, to_f64(a)?);
    }
    Ok(Bson::Double(acc))
}

fn compare(op: &str, a: &Bson, b: &Bson) -> Result<Bson> {
    let ordering = match (to_f64(a), to_f64(b)) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y),
        _ => to_display_string(a)?.partial_cmp(&to_display_string(b)?),
    };
    let ordering = ordering.ok_or_else(|| MongoSqlError::translation("values are not comparable"))?;
    use std::cmp::Ordering::*;
    Ok(Bson::Boolean(match op {
        "$eq" => ordering == Equal,
        "$ne" => ordering != Equal,
        "$lt" => ordering == Less,
        "$lte" => ordering != Greater,
        "$gt" => ordering == Greater,
        "$gte" => ordering != Less,
        _ => unreachable!(),
    }))
}

fn truthy(b: &Bson) -> bool {
    match b {
        Bson::Null => false,
        Bson::Boolean(v) => *v,
        Bson::Int32(v) => *v != 0,
        Bson::Int64(v) => *v != 0,
        Bson::Double(v) => *v != 0.0,
        Bson::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn to_f64(b: &Bson) -> Result<f64> {
    match b {
        Bson::Int32(v) => Ok(*v as f64),
        Bson::Int64(v) => Ok(*v as f64),
        Bson::Double(v) => Ok(*v),
        Bson::String(s) => s
            .parse()
            .map_err(|_| MongoSqlError::translation(format!("`{s}` is not numeric"))),
        other => Err(MongoSqlError::translation(format!(
            "{other:?} is not numeric"
        ))),
    }
}

fn to_i64(b: &Bson) -> Result<i64> {
    match b {
        Bson::Int32(v) => Ok(*v as i64),
        Bson::Int64(v) => Ok(*v),
        Bson::Double(v) => Ok(*v as i64),
        other => Err(MongoSqlError::translation(format!(
            "{other:?} is not an integer"
        ))),
    }
}

fn to_display_string(b: &Bson) -> Result<String> {
    Ok(match b {
        Bson::String(s) => s.clone(),
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Double(v) => v.to_string(),
        Bson::Boolean(v) => v.to_string(),
        Bson::Null => String::new(),
        other => return Err(MongoSqlError::translation(format!("cannot stringify {other:?}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn evaluates_arithmetic() {
        let cols = vec![("x".to_string(), Bson::Document(doc! { "$add": [1i64, 2i64] }))];
        let result = evaluate(&cols);
        assert_eq!(result[0].1, Bson::Int64(3));
    }

    #[test]
    fn degrades_unknown_operator_to_null() {
        let cols = vec![(
            "x".to_string(),
            Bson::Document(doc! { "$totallyUnknownOperator": [1i64] }),
        )];
        let result = evaluate(&cols);
        assert_eq!(result[0].1, Bson::Null);
    }

    #[test]
    fn evaluates_string_concat() {
        let cols = vec![(
            "greeting".to_string(),
            Bson::Document(doc! { "$concat": ["hello ", "world"] }),
        )];
        let result = evaluate(&cols);
        assert_eq!(result[0].1, Bson::String("hello world".to_string()));
    }
}
