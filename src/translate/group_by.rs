//! GROUP BY / aggregate compiler (G). Builds the `$group` stage plus a
//! following `$project` that flattens the grouping key back to top-level
//! field names and applies any aggregate post-processing (rounding,
//! `GROUP_CONCAT` reduction). Grounded on the original implementation's
//! `groupby_translator.py`.
//!
//! Two deliberate departures from that original, both namer-visible
//! behaviour rather than silent fixes: an empty GROUP BY's `_id` compiles
//! to `null` (the original emitted an empty document `{}`, which Mongo
//! treats identically for single-group aggregation but which reads as a
//! bug rather than a choice), and a HAVING/SELECT aggregate function with
//! no family match is a hard `TranslationError` (the original silently
//! embedded the unrecognised call as a literal string, which would have
//! produced a filter that matched nothing without saying why).

use crate::error::{MongoSqlError, Result};
use crate::expr;
use crate::functions::{self, aggregate, enhanced_aggregate, FunctionCategory};
use crate::sql::ast::{Column, Query};
use bson::{doc, Bson, Document};

pub struct GroupPlan {
    pub stages: Vec<Document>,
    pub having_filter: Option<Document>,
}

pub fn build(query: &Query) -> Result<GroupPlan> {
    let mut group_fields = Document::new();
    let mut project_fields = Document::new();
    let mut round_fields: Vec<(String, i32)> = Vec::new();
    let mut concat_fields: Vec<(String, String)> = Vec::new();

    let id_doc = build_id(&query.group_by);
    group_fields.insert("_id", id_doc);

    if query.group_by.len() == 1 {
        project_fields.insert(query.group_by[0].clone(), "$_id");
    } else if query.group_by.len() > 1 {
        for f in &query.group_by {
            project_fields.insert(f.clone(), format!("$_id.{f}"));
        }
    }

    for column in &query.columns {
        if let Column::Function {
            name,
            args_text,
            is_aggregate: true,
            ..
        } = column
        {
            let output = column.output_label();
            let (accumulator, post) = compile_aggregate(name, args_text)?;
            group_fields.insert(&output, accumulator);
            match post {
                Some(PostKind::Round(n)) => round_fields.push((output.clone(), n)),
                Some(PostKind::Concat(sep)) => concat_fields.push((output.clone(), sep)),
                None => {}
            }
            project_fields.insert(output, 1);
        } else if let Column::Plain { name, alias, .. } = column {
            if query.group_by.iter().any(|g| g == name) {
                continue; // already projected from _id above
            }
            let out = alias.clone().unwrap_or_else(|| name.clone());
            group_fields.insert(&out, doc! { "$first": format!("${name}") });
            project_fields.insert(out, 1);
        }
    }

    let mut stages = vec![doc! { "$group": group_fields }];
    if !project_fields.is_empty() {
        stages.push(doc! { "$project": project_fields });
    }

    for (field, n) in &round_fields {
        stages.push(doc! { "$addFields": { field: { "$round": [format!("${field}"), n] } } });
    }
    for (field, sep) in &concat_fields {
        stages.push(doc! {
            "$addFields": {
                field: {
                    "$reduce": {
                        "input": format!("${field}"),
                        "initialValue": "",
                        "in": {
                            "$concat": [
                                "$$value",
                                { "$cond": [{ "$eq": ["$$value", ""] }, "", sep.clone()] },
                                { "$toString": "$$this" },
                            ]
                        }
                    }
                }
            }
        });
    }

    let having_filter = match &query.having {
        Some(crate::sql::ast::Having::Raw(text)) => Some(build_having(text, query)?),
        Some(crate::sql::ast::Having::Parsed(pred)) => {
            Some(crate::translate::where_translator::translate(pred).map(|d| {
                doc! { "$expr": expr_from_match_doc(d) }
            })?)
        }
        None => None,
    };

    Ok(GroupPlan {
        stages,
        having_filter,
    })
}

fn expr_from_match_doc(d: Document) -> Bson {
    Bson::Document(d)
}

/// Builds a `$group._id` shape for a set of field names — shared between
/// GROUP BY (here) and query-level DISTINCT (`translator.rs`), which both
/// key a `$group` stage on a flat list of field names the same way: a bare
/// field reference for one field, a sub-document keyed by name for several.
pub(crate) fn build_id(group_by: &[String]) -> Bson {
    if group_by.is_empty() {
        return Bson::Null;
    }
    if group_by.len() == 1 {
        return Bson::String(format!("${}", group_by[0]));
    }
    let mut d = Document::new();
    for f in group_by {
        d.insert(f, format!("${f}"));
    }
    Bson::Document(d)
}

enum PostKind {
    Round(i32),
    Concat(String),
}

fn compile_aggregate(name: &str, args_text: &str) -> Result<(Bson, Option<PostKind>)> {
    let upper = name.to_uppercase();
    let field = if args_text.trim() == "*" {
        aggregate::AggField::Star
    } else {
        aggregate::AggField::Field(expr::compile(args_text)?)
    };

    let group_concat_opts = if upper == "GROUP_CONCAT" {
        Some(parse_group_concat_options(args_text)?)
    } else {
        None
    };

    let spec = match functions::category_of(&upper) {
        Some(FunctionCategory::EnhancedAggregate) => {
            enhanced_aggregate::spec(&upper, field, group_concat_opts)?
        }
        Some(FunctionCategory::Aggregate) => aggregate::spec(&upper, field, group_concat_opts)?,
        _ => {
            return Err(MongoSqlError::translation(format!(
                "{name} is not a recognised aggregate function"
            )))
        }
    };

    let post = match spec.post_process {
        Some(aggregate::PostProcess::Round(n)) => Some(PostKind::Round(n)),
        Some(aggregate::PostProcess::ReduceConcat { separator }) => {
            Some(PostKind::Concat(separator))
        }
        None => None,
    };
    Ok((spec.accumulator, post))
}

fn parse_group_concat_options(args_text: &str) -> Result<aggregate::GroupConcatOptions> {
    let mut text = args_text.trim();
    let distinct = if text.to_uppercase().starts_with("DISTINCT") {
        text = text[8..].trim();
        true
    } else {
        false
    };
    let mut separator = ",".to_string();
    let mut order_by_field = None;
    let mut order_desc = false;
    let upper = text.to_uppercase();
    if let Some(pos) = upper.find("SEPARATOR") {
        let sep_part = text[pos + 9..].trim();
        separator = sep_part.trim_matches(|c| c == '\'' || c == '"').to_string();
        text = text[..pos].trim();
    }
    let upper2 = text.to_uppercase();
    if let Some(pos) = upper2.find("ORDER BY") {
        let ob = text[pos + 8..].trim();
        order_desc = ob.to_uppercase().ends_with("DESC");
        let field = ob
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        order_by_field = Some(field);
        text = text[..pos].trim();
    }
    let _ = text; // remaining text is the concatenated field itself, compiled by caller
    Ok(aggregate::GroupConcatOptions {
        distinct,
        separator,
        order_by_field,
        order_desc,
    })
}

/// A HAVING clause of the restricted shape `AGG_FUNC(args) OP literal`
/// (the form spec.md documents as supported; anything wider is a
/// `TranslationError` rather than a guess). Matches the aggregate call
/// against the SELECT list by normalised text to reuse its output alias;
/// falls back to compiling a standalone accumulator under a synthetic name
/// if the call wasn't also projected.
fn build_having(text: &str, query: &Query) -> Result<Document> {
    let text = text.trim();
    let open = text
        .find('(')
        .ok_or_else(|| MongoSqlError::unsupported("HAVING must reference an aggregate function call"))?;
    let close = text
        .rfind(')')
        .ok_or_else(|| MongoSqlError::sql_syntax("unbalanced parentheses in HAVING"))?;
    let func_name = text[..open].trim().to_uppercase();
    let args_text = &text[open + 1..close];
    let rest = text[close + 1..].trim();

    if !functions::is_aggregate(&func_name) {
        return Err(MongoSqlError::unsupported(format!(
            "HAVING clause on non-aggregate expression `{func_name}` is not supported"
        )));
    }

    let alias = query
        .columns
        .iter()
        .find(|c| matches!(c, Column::Function { name, args_text: a, .. } if name == &func_name && a.trim() == args_text.trim()))
        .map(|c| c.output_label())
        .unwrap_or_else(|| format!("__having_{}", func_name.to_lowercase()));

    const CMP_OPS: &[(&str, &str)] = &[
        ("<=", "$lte"),
        (">=", "$gte"),
        ("<>", "$ne"),
        ("!=", "$ne"),
        ("=", "$eq"),
        ("<", "$lt"),
        (">", "$gt"),
    ];
    for (sym, mongo_op) in CMP_OPS {
        if let Some(pos) = rest.find(sym) {
            let rhs = rest[pos + sym.len()..].trim();
            let value = expr::compile(rhs)?;
            return Ok(doc! {
                "$expr": { mongo_op.to_string(): [format!("${alias}"), value] }
            });
        }
    }

    Err(MongoSqlError::sql_syntax(format!(
        "could not parse HAVING clause `{text}`"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::StatementKind;

    #[test]
    fn builds_group_stage_for_single_key() {
        let mut q = Query::empty(StatementKind::Select, "");
        q.group_by = vec!["customer_id".to_string()];
        q.columns = vec![Column::Function {
            name: "COUNT".to_string(),
            args_text: "*".to_string(),
            alias: Some("cnt".to_string()),
            original_text: "COUNT(*)".to_string(),
            is_aggregate: true,
            is_window: false,
            window_spec: None,
        }];
        let plan = build(&q).unwrap();
        let group = plan.stages[0].get_document("$group").unwrap();
        assert!(group.contains_key("cnt"));
        assert_eq!(group.get_str("_id").unwrap(), "$customer_id");
    }

    #[test]
    fn empty_group_by_uses_null_id() {
        let q = Query::empty(StatementKind::Select, "");
        let plan = build(&q).unwrap();
        let group = plan.stages[0].get_document("$group").unwrap();
        assert_eq!(group.get("_id"), Some(&Bson::Null));
    }
}
