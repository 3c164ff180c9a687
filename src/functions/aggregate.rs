//! Plain aggregate family — builds `$group` stage accumulators.
//! `COUNT(*)` sums 1; `COUNT(field)` sums a null-aware conditional.
//! `STDDEV`/`VAR*` accumulators are rounded to 6 decimal places to match
//! MariaDB precision; variance is the square of the corresponding stddev,
//! also rounded. `GROUP_CONCAT` expands into a `$push`/`$addToSet`
//! accumulator plus a post-group `$reduce` projection step.

use crate::error::{MongoSqlError, Result};
use bson::{doc, Bson};

pub const NAMES: &[&str] = &[
    "COUNT",
    "SUM",
    "AVG",
    "MIN",
    "MAX",
    "FIRST",
    "LAST",
    "STDDEV",
    "STDDEV_POP",
    "STDDEV_SAMP",
    "VAR_POP",
    "VAR_SAMP",
    "GROUP_CONCAT",
    "BIT_AND",
    "BIT_OR",
    "BIT_XOR",
];

#[derive(Debug, Clone)]
pub enum AggField {
    Star,
    Field(Bson),
}

#[derive(Debug, Clone)]
pub enum PostProcess {
    Round(i32),
    ReduceConcat { separator: String },
}

#[derive(Debug, Clone)]
pub struct AggregateSpec {
    pub accumulator: Bson,
    pub post_process: Option<PostProcess>,
}

impl AggregateSpec {
    fn simple(accumulator: Bson) -> Self {
        AggregateSpec {
            accumulator,
            post_process: None,
        }
    }
}

pub struct GroupConcatOptions {
    pub distinct: bool,
    pub separator: String,
    pub order_by_field: Option<String>,
    pub order_desc: bool,
}

pub fn spec(
    name: &str,
    field: AggField,
    group_concat: Option<GroupConcatOptions>,
) -> Result<AggregateSpec> {
    match name {
        "COUNT" => match field {
            AggField::Star => Ok(AggregateSpec::simple(Bson::Document(doc! { "$sum": 1 }))),
            AggField::Field(f) => Ok(AggregateSpec::simple(Bson::Document(doc! {
                "$sum": { "$cond": [{ "$ne": [f, Bson::Null] }, 1, 0] }
            }))),
        },
        "SUM" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$sum": require_field(field)? },
        ))),
        "AVG" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$avg": require_field(field)? },
        ))),
        "MIN" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$min": require_field(field)? },
        ))),
        "MAX" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$max": require_field(field)? },
        ))),
        "FIRST" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$first": require_field(field)? },
        ))),
        "LAST" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$last": require_field(field)? },
        ))),
        "STDDEV" | "STDDEV_POP" => Ok(AggregateSpec {
            accumulator: Bson::Document(doc! { "$stdDevPop": require_field(field)? }),
            post_process: Some(PostProcess::Round(6)),
        }),
        "STDDEV_SAMP" => Ok(AggregateSpec {
            accumulator: Bson::Document(doc! { "$stdDevSamp": require_field(field)? }),
            post_process: Some(PostProcess::Round(6)),
        }),
        "VAR_POP" => Ok(AggregateSpec {
            // variance is the square of the stddev accumulator; computed here
            // as $pow of $stdDevPop rather than duplicating the sum-of-squares
            // formula.
            accumulator: Bson::Document(doc! {
                "$pow": [{ "$stdDevPop": require_field(field)? }, 2]
            }),
            post_process: Some(PostProcess::Round(6)),
        }),
        "VAR_SAMP" => Ok(AggregateSpec {
            accumulator: Bson::Document(doc! {
                "$pow": [{ "$stdDevSamp": require_field(field)? }, 2]
            }),
            post_process: Some(PostProcess::Round(6)),
        }),
        "BIT_AND" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$accumulator": bit_accumulator("&", require_field(field)?) },
        ))),
        "BIT_OR" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$accumulator": bit_accumulator("|", require_field(field)?) },
        ))),
        "BIT_XOR" => Ok(AggregateSpec::simple(Bson::Document(
            doc! { "$accumulator": bit_accumulator("^", require_field(field)?) },
        ))),
        "GROUP_CONCAT" => {
            let opts = group_concat
                .ok_or_else(|| MongoSqlError::translation("GROUP_CONCAT requires options"))?;
            let f = require_field(field)?;
            let push = if opts.distinct {
                doc! { "$addToSet": f }
            } else {
                doc! { "$push": f }
            };
            Ok(AggregateSpec {
                accumulator: Bson::Document(push),
                post_process: Some(PostProcess::ReduceConcat {
                    separator: opts.separator,
                }),
            })
        }
        _ => Err(MongoSqlError::unsupported(format!(
            "aggregate function {name} not supported"
        ))),
    }
}

fn require_field(field: AggField) -> Result<Bson> {
    match field {
        AggField::Field(f) => Ok(f),
        AggField::Star => Err(MongoSqlError::translation(
            "aggregate function requires a field, not *",
        )),
    }
}

/// `BIT_AND`/`BIT_OR`/`BIT_XOR` have no native `$group` accumulator; built
/// with a small `$accumulator` JS reducer, matching MariaDB's bitwise
/// aggregate semantics (`BIT_AND` over an empty group is all-ones, the
/// others are zero).
fn bit_accumulator(op: &str, field: Bson) -> bson::Document {
    let init = if op == "&" { "-1" } else { "0" };
    doc! {
        "init": format!("function() {{ return {init}; }}"),
        "accumulate": format!("function(state, value) {{ return value == null ? state : (state {op} value); }}"),
        "accumulateArgs": [field],
        "merge": format!("function(s1, s2) {{ return s1 {op} s2; }}"),
        "lang": "js",
    }
}
