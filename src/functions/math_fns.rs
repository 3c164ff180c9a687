use super::string_fns::arg;
use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &[
    "ABS", "ROUND", "CEIL", "CEILING", "FLOOR", "SQRT", "POW", "POWER", "SIN", "COS", "TAN",
    "LOG", "LN", "EXP", "GREATEST", "LEAST", "MOD", "SIGN", "RADIANS", "DEGREES", "PI",
];

pub fn call(name: &str, args: &[Bson]) -> Result<Bson> {
    match name {
        "ABS" => Ok(Bson::Document(doc! { "$abs": arg(args, 0)? })),
        "ROUND" => {
            if let Some(p) = args.get(1) {
                Ok(Bson::Document(doc! { "$round": [arg(args, 0)?, p] }))
            } else {
                Ok(Bson::Document(doc! { "$round": arg(args, 0)? }))
            }
        }
        "CEIL" | "CEILING" => Ok(Bson::Document(doc! { "$ceil": arg(args, 0)? })),
        "FLOOR" => Ok(Bson::Document(doc! { "$floor": arg(args, 0)? })),
        "SQRT" => Ok(Bson::Document(doc! { "$sqrt": arg(args, 0)? })),
        "POW" | "POWER" => Ok(Bson::Document(doc! { "$pow": [arg(args, 0)?, arg(args, 1)?] })),
        "SIN" => Ok(Bson::Document(doc! { "$sin": arg(args, 0)? })),
        "COS" => Ok(Bson::Document(doc! { "$cos": arg(args, 0)? })),
        "TAN" => Ok(Bson::Document(doc! { "$tan": arg(args, 0)? })),
        "LOG" => {
            if let Some(base) = args.get(1) {
                Ok(Bson::Document(doc! { "$log": [arg(args, 0)?, base] }))
            } else {
                Ok(Bson::Document(doc! { "$ln": arg(args, 0)? }))
            }
        }
        "LN" => Ok(Bson::Document(doc! { "$ln": arg(args, 0)? })),
        "EXP" => Ok(Bson::Document(doc! { "$exp": arg(args, 0)? })),
        "GREATEST" => Ok(Bson::Document(doc! { "$max": args.to_vec() })),
        "LEAST" => Ok(Bson::Document(doc! { "$min": args.to_vec() })),
        "MOD" => Ok(Bson::Document(doc! { "$mod": [arg(args, 0)?, arg(args, 1)?] })),
        "SIGN" => Ok(Bson::Document(doc! {
            "$switch": {
                "branches": [
                    { "case": { "$gt": [arg(args, 0)?, 0] }, "then": 1 },
                    { "case": { "$lt": [arg(args, 0)?, 0] }, "then": -1 },
                ],
                "default": 0
            }
        })),
        "RADIANS" => Ok(Bson::Document(doc! {
            "$multiply": [arg(args, 0)?, std::f64::consts::PI / 180.0]
        })),
        "DEGREES" => Ok(Bson::Document(doc! {
            "$multiply": [arg(args, 0)?, 180.0 / std::f64::consts::PI]
        })),
        "PI" => Ok(Bson::Double(std::f64::consts::PI)),
        _ => Err(MongoSqlError::unsupported(format!(
            "math function {name} not supported"
        ))),
    }
}
