//! Window function family. Output expressions for a `$setWindowFields`
//! stage; `translate::window` builds the stage itself (sortBy from the
//! OVER clause's ORDER BY — PARTITION BY is recognised syntactically but,
//! per spec.md §9, not emitted).

use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &["ROW_NUMBER", "RANK", "DENSE_RANK", "NTILE", "LAG", "LEAD"];

pub fn output_expr(name: &str, args: &[Bson]) -> Result<Bson> {
    match name {
        "ROW_NUMBER" => Ok(Bson::Document(doc! { "$documentNumber": {} })),
        "RANK" => Ok(Bson::Document(doc! { "$rank": {} })),
        "DENSE_RANK" => Ok(Bson::Document(doc! { "$denseRank": {} })),
        "NTILE" => {
            let n = args
                .first()
                .cloned()
                .ok_or_else(|| MongoSqlError::translation("NTILE requires an argument"))?;
            Ok(Bson::Document(doc! { "$ntile": n }))
        }
        "LAG" | "LEAD" => {
            let field = args
                .first()
                .cloned()
                .ok_or_else(|| MongoSqlError::translation(format!("{name} requires a field")))?;
            let offset = args.get(1).cloned().unwrap_or(Bson::Int64(1));
            let offset_signed = if name == "LAG" {
                negate(&offset)
            } else {
                offset
            };
            let mut shift = doc! { "output": field, "by": offset_signed };
            if let Some(default) = args.get(2) {
                shift.insert("default", default.clone());
            }
            Ok(Bson::Document(doc! { "$shift": shift }))
        }
        _ => Err(MongoSqlError::unsupported(format!(
            "window function {name} not supported"
        ))),
    }
}

fn negate(b: &Bson) -> Bson {
    match b {
        Bson::Int32(i) => Bson::Int32(-i),
        Bson::Int64(i) => Bson::Int64(-i),
        Bson::Double(f) => Bson::Double(-f),
        other => other.clone(),
    }
}
