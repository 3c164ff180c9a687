//! `CASE` itself is compiled directly from the parser's `Column::Case` /
//! the expression compiler's dedicated `CASE ... END` handling (it carries
//! structured WHEN/THEN/ELSE data, not a flat argument list), so it is
//! listed here for categorisation only and never reaches `call`.

use super::string_fns::arg;
use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &["IF", "CASE", "COALESCE", "NULLIF"];

/// Functions whose first argument is a boolean condition rather than a
/// value expression — the expression compiler consults this before
/// recursing into arguments.
pub const CONDITION_FIRST_ARG: &[&str] = &["IF"];

pub fn call(name: &str, args: &[Bson]) -> Result<Bson> {
    match name {
        "IF" => Ok(Bson::Document(doc! {
            "$cond": { "if": arg(args, 0)?, "then": arg(args, 1)?, "else": arg(args, 2)? }
        })),
        "COALESCE" => {
            if args.is_empty() {
                return Err(MongoSqlError::translation("COALESCE requires at least one argument"));
            }
            let mut chain = args.last().unwrap().clone();
            for a in args[..args.len() - 1].iter().rev() {
                chain = Bson::Document(doc! { "$ifNull": [a.clone(), chain] });
            }
            Ok(chain)
        }
        "NULLIF" => Ok(Bson::Document(doc! {
            "$cond": {
                "if": { "$eq": [arg(args, 0)?, arg(args, 1)?] },
                "then": Bson::Null,
                "else": arg(args, 0)?
            }
        })),
        "CASE" => Err(MongoSqlError::translation(
            "CASE must be compiled through the expression compiler's CASE handler",
        )),
        _ => Err(MongoSqlError::unsupported(format!(
            "conditional function {name} not supported"
        ))),
    }
}
