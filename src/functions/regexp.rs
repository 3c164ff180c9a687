//! Regexp (infix) family. `REGEXP`/`RLIKE`/`NOT REGEXP` are infix operators
//! detected by the parser, not name-dispatched function calls — per the
//! original implementation's registry, this family sits outside the
//! name→category table. `NAMES` is empty; it exists only so
//! `FunctionCategory::Regexp` has a home in the category enum.
pub const NAMES: &[&str] = &[];

use bson::{doc, Bson};

/// `{$cond:[{$regexMatch:{input,regex}},1,0]}` — used when a REGEXP/RLIKE
/// infix expression appears in a SELECT projection (MariaDB returns 1/0).
pub fn select_projection(input: Bson, pattern: Bson, negate: bool) -> Bson {
    let matched = Bson::Document(doc! {
        "$regexMatch": { "input": input, "regex": pattern, "options": "i" }
    });
    let (then, else_) = if negate { (0, 1) } else { (1, 0) };
    Bson::Document(doc! { "$cond": [matched, then, else_] })
}

/// `{field:{$regex:pattern,$options:'i'}}` (or its `$not`) for WHERE/HAVING.
pub fn where_condition(field: &str, pattern: &str, negate: bool) -> bson::Document {
    let regex_doc = doc! { "$regex": pattern, "$options": "i" };
    if negate {
        doc! { field: { "$not": Bson::Document(regex_doc) } }
    } else {
        doc! { field: regex_doc }
    }
}
