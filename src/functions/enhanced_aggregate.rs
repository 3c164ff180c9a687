//! Enhanced aggregate family. Grounded on the original implementation's
//! separate `modules/enhanced_aggregate` package, which re-implements a
//! subset of the plain aggregate family (`STDDEV_POP`, `STDDEV_SAMP`,
//! `VAR_POP`, `VAR_SAMP`, `GROUP_CONCAT`) with null-safe defaults. Per
//! spec.md §4.F, functions here take precedence over the plain aggregate
//! mapper's handling of the same name.

use super::aggregate::{self, AggField, AggregateSpec, GroupConcatOptions, PostProcess};
use crate::error::Result;
use bson::{doc, Bson};

pub const NAMES: &[&str] = &["STDDEV_POP", "STDDEV_SAMP", "VAR_POP", "VAR_SAMP", "GROUP_CONCAT"];

pub fn spec(
    name: &str,
    field: AggField,
    group_concat: Option<GroupConcatOptions>,
) -> Result<AggregateSpec> {
    match name {
        "STDDEV_POP" | "STDDEV_SAMP" | "VAR_POP" | "VAR_SAMP" => {
            let inner = aggregate::spec(name, field, None)?;
            // Null-safe: a group with a single member (population stddev of
            // one value) returns 0 rather than MongoDB's null.
            let wrapped = Bson::Document(doc! { "$ifNull": [inner.accumulator, 0] });
            Ok(AggregateSpec {
                accumulator: wrapped,
                post_process: Some(PostProcess::Round(6)),
            })
        }
        "GROUP_CONCAT" => aggregate::spec(name, field, group_concat),
        _ => unreachable!("enhanced_aggregate::spec called with non-enhanced name"),
    }
}
