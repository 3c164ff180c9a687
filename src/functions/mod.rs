//! The master function registry (F). Nine families, each with a
//! `name -> handler(args) -> mongo_expr` table. `is_aggregate` is
//! authoritative and gives enhanced-aggregate functions priority over plain
//! aggregate functions sharing the same name, per spec.md §4.F.

pub mod aggregate;
pub mod conditional;
pub mod datetime;
pub mod enhanced_aggregate;
pub mod extended_string;
pub mod json_fns;
pub mod math_fns;
pub mod regexp;
pub mod string_fns;
pub mod window;

use crate::error::{MongoSqlError, Result};
use bson::Bson;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCategory {
    Aggregate,
    String,
    Math,
    Datetime,
    Conditional,
    Json,
    ExtendedString,
    Regexp,
    EnhancedAggregate,
    Window,
}

/// Enhanced aggregate functions take precedence over plain aggregate for the
/// same name — this table is consulted first.
pub fn category_of(name: &str) -> Option<FunctionCategory> {
    let upper = name.to_uppercase();
    if enhanced_aggregate::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::EnhancedAggregate);
    }
    if aggregate::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::Aggregate);
    }
    if window::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::Window);
    }
    if conditional::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::Conditional);
    }
    if datetime::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::Datetime);
    }
    if json_fns::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::Json);
    }
    if extended_string::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::ExtendedString);
    }
    if math_fns::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::Math);
    }
    if string_fns::NAMES.contains(&upper.as_str()) {
        return Some(FunctionCategory::String);
    }
    None
}

/// Authoritative aggregate-ness check: enhanced aggregate OR plain aggregate.
pub fn is_aggregate(name: &str) -> bool {
    matches!(
        category_of(name),
        Some(FunctionCategory::Aggregate) | Some(FunctionCategory::EnhancedAggregate)
    )
}

pub fn is_window(name: &str) -> bool {
    matches!(category_of(name), Some(FunctionCategory::Window))
}

/// Dispatch a non-aggregate, non-window scalar function call to its family
/// handler. Aggregate/enhanced-aggregate functions are compiled by
/// `translate::group_by` (they build `$group` accumulators, not bare
/// expressions); window functions are compiled by `translate::window`
/// (they need `OVER` context); regexp infix expressions are compiled
/// directly by the WHERE translator / projection builder.
pub fn dispatch_scalar(name: &str, args: &[Bson]) -> Result<Bson> {
    let upper = name.to_uppercase();
    match category_of(&upper) {
        Some(FunctionCategory::Conditional) => conditional::call(&upper, args),
        Some(FunctionCategory::Datetime) => datetime::call(&upper, args),
        Some(FunctionCategory::Json) => json_fns::call(&upper, args),
        Some(FunctionCategory::ExtendedString) => extended_string::call(&upper, args),
        Some(FunctionCategory::Math) => math_fns::call(&upper, args),
        Some(FunctionCategory::String) => string_fns::call(&upper, args),
        Some(FunctionCategory::Aggregate) | Some(FunctionCategory::EnhancedAggregate) => {
            Err(MongoSqlError::translation(format!(
                "{upper} is an aggregate function and cannot appear in a scalar expression"
            )))
        }
        Some(FunctionCategory::Window) => Err(MongoSqlError::translation(format!(
            "{upper} is a window function and requires an OVER clause"
        ))),
        Some(FunctionCategory::Regexp) | None => Err(MongoSqlError::unsupported(format!(
            "function {upper} is not supported"
        ))),
    }
}
