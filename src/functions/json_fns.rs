//! JSON function family. A MariaDB-style path (`$.a.b[2].c`) is parsed into
//! a sequence of object-key/array-index segments. Literal JSON text is
//! navigated in-process at compile time (emitted as `$literal`); field
//! references build a dynamic `$getField`/`$arrayElemAt` expression chain.

use super::string_fns::arg;
use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &[
    "JSON_EXTRACT",
    "JSON_OBJECT",
    "JSON_ARRAY",
    "JSON_UNQUOTE",
    "JSON_KEYS",
    "JSON_LENGTH",
    "JSON_SET",
    "JSON_REPLACE",
    "JSON_MERGE",
    "JSON_SEARCH",
];

#[derive(Debug, Clone)]
pub enum PathSeg {
    Key(String),
    Index(i64),
}

/// Parse a MariaDB JSON path like `$.a.b[2].c` into ordered segments.
pub fn parse_json_path(path: &str) -> Vec<PathSeg> {
    let trimmed = path.strip_prefix('$').unwrap_or(path);
    let mut segs = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segs.push(PathSeg::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segs.push(PathSeg::Key(std::mem::take(&mut current)));
                }
                let mut idx = String::new();
                for c2 in chars.by_ref() {
                    if c2 == ']' {
                        break;
                    }
                    idx.push(c2);
                }
                if let Ok(i) = idx.parse::<i64>() {
                    segs.push(PathSeg::Index(i));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segs.push(PathSeg::Key(current));
    }
    segs
}

fn navigate_json(value: &serde_json::Value, segs: &[PathSeg]) -> Option<serde_json::Value> {
    let mut cur = value.clone();
    for seg in segs {
        cur = match seg {
            PathSeg::Key(k) => cur.get(k)?.clone(),
            PathSeg::Index(i) => cur.get(*i as usize)?.clone(),
        };
    }
    Some(cur)
}

fn json_value_to_bson(v: &serde_json::Value) -> Bson {
    match v {
        serde_json::Value::Null => Bson::Null,
        serde_json::Value::Bool(b) => Bson::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else {
                Bson::Double(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Bson::String(s.clone()),
        serde_json::Value::Array(a) => Bson::Array(a.iter().map(json_value_to_bson).collect()),
        serde_json::Value::Object(o) => {
            let mut d = bson::Document::new();
            for (k, v) in o.iter() {
                d.insert(k.clone(), json_value_to_bson(v));
            }
            Bson::Document(d)
        }
    }
}

fn dynamic_path_expr(field: Bson, segs: &[PathSeg]) -> Bson {
    let mut expr = field;
    for seg in segs {
        expr = match seg {
            PathSeg::Key(k) => Bson::Document(doc! { "$getField": { "field": k, "input": expr } }),
            PathSeg::Index(i) => Bson::Document(doc! { "$arrayElemAt": [expr, *i] }),
        };
    }
    expr
}

/// Try to interpret `doc_arg` as a literal JSON document navigated at
/// compile time; otherwise treat it as a dynamic field-path expression.
fn extract(doc_arg: &Bson, path: &Bson) -> Result<Bson> {
    let path_str = match path {
        Bson::String(s) => s.clone(),
        other => {
            return Err(MongoSqlError::translation(format!(
                "JSON path must be a literal string, got {other:?}"
            )))
        }
    };
    let segs = parse_json_path(&path_str);

    if let Bson::String(json_text) = doc_arg {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(json_text) {
            return Ok(match navigate_json(&parsed, &segs) {
                Some(v) => json_value_to_bson(&v),
                None => Bson::Null,
            });
        }
    }
    Ok(dynamic_path_expr(doc_arg.clone(), &segs))
}

pub fn call(name: &str, args: &[Bson]) -> Result<Bson> {
    match name {
        "JSON_EXTRACT" => extract(&arg(args, 0)?, &arg(args, 1)?),
        "JSON_UNQUOTE" => {
            let v = arg(args, 0)?;
            match v {
                Bson::String(s) => {
                    if let Ok(serde_json::Value::String(inner)) =
                        serde_json::from_str::<serde_json::Value>(&s)
                    {
                        Ok(Bson::String(inner))
                    } else {
                        Ok(Bson::String(s))
                    }
                }
                other => Ok(other),
            }
        }
        "JSON_KEYS" => {
            let v = arg(args, 0)?;
            if let Bson::String(s) = &v {
                if let Ok(serde_json::Value::Object(map)) =
                    serde_json::from_str::<serde_json::Value>(s)
                {
                    let keys: Vec<Bson> = map.keys().map(|k| Bson::String(k.clone())).collect();
                    return Ok(Bson::Array(keys));
                }
            }
            Ok(Bson::Document(
                doc! { "$map": { "input": { "$objectToArray": v }, "in": "$$this.k" } },
            ))
        }
        "JSON_LENGTH" => {
            let v = arg(args, 0)?;
            if let Bson::String(s) = &v {
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(s) {
                    let len = match &parsed {
                        serde_json::Value::Array(a) => a.len(),
                        serde_json::Value::Object(o) => o.len(),
                        _ => 1,
                    };
                    return Ok(Bson::Int64(len as i64));
                }
            }
            Ok(Bson::Document(doc! { "$size": v }))
        }
        "JSON_OBJECT" => {
            if args.is_empty() {
                return Ok(Bson::String("{}".to_string()));
            }
            let all_literal = args.iter().all(|a| {
                !matches!(a, Bson::String(s) if s.starts_with('$') && !s.starts_with("$."))
            });
            if all_literal {
                let mut map = serde_json::Map::new();
                for pair in args.chunks(2) {
                    if pair.len() == 2 {
                        if let Bson::String(k) = &pair[0] {
                            map.insert(k.clone(), bson_to_json(&pair[1]));
                        }
                    }
                }
                Ok(Bson::String(
                    serde_json::to_string(&serde_json::Value::Object(map)).unwrap_or_default(),
                ))
            } else {
                let mut pieces = vec![Bson::String("{".to_string())];
                for (i, pair) in args.chunks(2).enumerate() {
                    if i > 0 {
                        pieces.push(Bson::String(",".to_string()));
                    }
                    if pair.len() == 2 {
                        pieces.push(pair[0].clone());
                        pieces.push(Bson::String(":".to_string()));
                        pieces.push(Bson::Document(doc! { "$toString": pair[1].clone() }));
                    }
                }
                pieces.push(Bson::String("}".to_string()));
                Ok(Bson::Document(doc! { "$concat": pieces }))
            }
        }
        "JSON_ARRAY" => {
            let all_literal = args.iter().all(|a| matches!(a, Bson::String(s) if !s.starts_with('$')) || !matches!(a, Bson::String(_)));
            if all_literal {
                let json_vals: Vec<serde_json::Value> = args.iter().map(bson_to_json).collect();
                Ok(Bson::String(
                    serde_json::to_string(&serde_json::Value::Array(json_vals)).unwrap_or_default(),
                ))
            } else {
                Ok(Bson::Array(args.to_vec()))
            }
        }
        "JSON_SET" | "JSON_REPLACE" => {
            let target = arg(args, 0)?;
            let path = match arg(args, 1)? {
                Bson::String(s) => s,
                other => {
                    return Err(MongoSqlError::translation(format!(
                        "JSON path must be a literal string, got {other:?}"
                    )))
                }
            };
            let value = arg(args, 2)?;
            let segs = parse_json_path(&path);
            let field_name = match segs.last() {
                Some(PathSeg::Key(k)) => k.clone(),
                _ => {
                    return Err(MongoSqlError::unsupported(
                        "JSON_SET/JSON_REPLACE only support a trailing key segment",
                    ))
                }
            };
            Ok(Bson::Document(
                doc! { "$setField": { "field": field_name, "input": target, "value": value } },
            ))
        }
        "JSON_MERGE" => Ok(Bson::Document(doc! { "$mergeObjects": args.to_vec() })),
        "JSON_SEARCH" => {
            // Best-effort: search a literal JSON document's string values for
            // an exact match and return the first matching path, else null.
            let doc_arg = arg(args, 0)?;
            let needle = arg(args, 2)?;
            if let (Bson::String(json_text), Bson::String(target)) = (&doc_arg, &needle) {
                if let Ok(serde_json::Value::Object(map)) =
                    serde_json::from_str::<serde_json::Value>(json_text)
                {
                    for (k, v) in map.iter() {
                        if v.as_str() == Some(target.as_str()) {
                            return Ok(Bson::String(format!("$.{k}")));
                        }
                    }
                }
            }
            Ok(Bson::Null)
        }
        _ => Err(MongoSqlError::unsupported(format!(
            "JSON function {name} not supported"
        ))),
    }
}

fn bson_to_json(b: &Bson) -> serde_json::Value {
    match b {
        Bson::Null => serde_json::Value::Null,
        Bson::Boolean(v) => serde_json::Value::Bool(*v),
        Bson::Int32(v) => serde_json::Value::from(*v),
        Bson::Int64(v) => serde_json::Value::from(*v),
        Bson::Double(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Bson::String(v) => serde_json::Value::String(v.clone()),
        Bson::Array(a) => serde_json::Value::Array(a.iter().map(bson_to_json).collect()),
        Bson::Document(d) => {
            let mut map = serde_json::Map::new();
            for (k, v) in d.iter() {
                map.insert(k.clone(), bson_to_json(v));
            }
            serde_json::Value::Object(map)
        }
        other => serde_json::Value::String(format!("{other:?}")),
    }
}
