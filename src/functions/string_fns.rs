//! String function family. `CONCAT_WS` lives in `extended_string` per
//! spec.md §4.F's "Extended string" bullet even though it's also named in
//! passing under "String".

use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &[
    "CONCAT",
    "SUBSTRING",
    "SUBSTR",
    "MID",
    "LENGTH",
    "CHAR_LENGTH",
    "CHARACTER_LENGTH",
    "UPPER",
    "UCASE",
    "LOWER",
    "LCASE",
    "TRIM",
    "LTRIM",
    "RTRIM",
    "REPLACE",
    "LEFT",
    "RIGHT",
    "INSTR",
    "LOCATE",
    "POSITION",
    "STRCMP",
    "REVERSE",
    "REPEAT",
    "SPACE",
];

pub fn call(name: &str, args: &[Bson]) -> Result<Bson> {
    match name {
        "CONCAT" => Ok(Bson::Document(doc! { "$concat": args.to_vec() })),
        "SUBSTRING" | "SUBSTR" | "MID" => {
            let s = arg(args, 0)?;
            let pos = arg(args, 1)?;
            // MySQL 1-based -> MongoDB 0-based offset.
            let offset = Bson::Document(doc! { "$subtract": [pos, 1] });
            let len = args.get(2).cloned();
            let substr_args = match len {
                Some(l) => vec![s, offset, l],
                None => vec![
                    s.clone(),
                    offset,
                    Bson::Document(doc! { "$strLenCP": s }),
                ],
            };
            Ok(Bson::Document(doc! { "$substrCP": substr_args }))
        }
        "LENGTH" | "CHAR_LENGTH" | "CHARACTER_LENGTH" => {
            Ok(Bson::Document(doc! { "$strLenCP": arg(args, 0)? }))
        }
        "UPPER" | "UCASE" => Ok(Bson::Document(doc! { "$toUpper": arg(args, 0)? })),
        "LOWER" | "LCASE" => Ok(Bson::Document(doc! { "$toLower": arg(args, 0)? })),
        "TRIM" => Ok(Bson::Document(doc! { "$trim": { "input": arg(args, 0)? } })),
        "LTRIM" => Ok(Bson::Document(doc! { "$ltrim": { "input": arg(args, 0)? } })),
        "RTRIM" => Ok(Bson::Document(doc! { "$rtrim": { "input": arg(args, 0)? } })),
        "REPLACE" => Ok(Bson::Document(doc! {
            "$replaceAll": { "input": arg(args, 0)?, "find": arg(args, 1)?, "replacement": arg(args, 2)? }
        })),
        "LEFT" => Ok(Bson::Document(doc! {
            "$substrCP": [arg(args, 0)?, 0, arg(args, 1)?]
        })),
        "RIGHT" => {
            let s = arg(args, 0)?;
            let n = arg(args, 1)?;
            let start = Bson::Document(doc! {
                "$subtract": [{ "$strLenCP": s.clone() }, n.clone()]
            });
            Ok(Bson::Document(doc! {
                "$substrCP": [s, start, n]
            }))
        }
        "INSTR" | "LOCATE" | "POSITION" => {
            // LOCATE/POSITION take (substr, str); INSTR takes (str, substr).
            let (haystack, needle) = if name == "INSTR" {
                (arg(args, 0)?, arg(args, 1)?)
            } else {
                (arg(args, 1)?, arg(args, 0)?)
            };
            Ok(Bson::Document(doc! {
                "$add": [{ "$indexOfCP": [haystack, needle] }, 1]
            }))
        }
        "STRCMP" => {
            // Custom marker — only meaningful via the local evaluator (§9).
            Ok(Bson::Document(
                doc! { "$cmp": [arg(args, 0)?, arg(args, 1)?] },
            ))
        }
        "REVERSE" => Ok(Bson::Document(doc! { "$reverse": arg(args, 0)? })),
        "REPEAT" => Ok(Bson::Document(doc! { "$repeat": [arg(args, 0)?, arg(args, 1)?] })),
        "SPACE" => Ok(Bson::Document(doc! { "$space": arg(args, 0)? })),
        _ => Err(MongoSqlError::unsupported(format!(
            "string function {name} not supported"
        ))),
    }
}

pub(crate) fn arg(args: &[Bson], i: usize) -> Result<Bson> {
    args.get(i)
        .cloned()
        .ok_or_else(|| MongoSqlError::translation(format!("missing argument {i}")))
}
