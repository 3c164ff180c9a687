//! Top-level translator (T): decides which MongoDB operation shape a
//! parsed query needs and assembles the other components' output into it.
//! Grounded on the original implementation's `core/translator.py` decision
//! order: FROM-less queries evaluate locally; a lone `SELECT DISTINCT
//! field FROM t` with no joins/group/subqueries becomes a `distinct()`
//! call; a bare `SELECT COUNT(*) FROM t` with no other aggregates becomes
//! `count()`; everything else compiles to `find()` when the pipeline needs
//! no joins/group stages, or `aggregate()` once any of those are present.

use crate::error::{MongoSqlError, Result};
use crate::expr;
use crate::request::Request;
use crate::sql::ast::{BoolOp, Column, CompareOp, Direction, Predicate, Query, StatementKind};
use crate::sql::scan::split_top_level;
use crate::translate::subquery::{self, ResolvedSubquery};
use crate::translate::{group_by, join_translator, where_translator, window};
use bson::{doc, Bson, Document};

pub fn translate(query: &Query) -> Result<Request> {
    match query.kind {
        StatementKind::Select => translate_select(query),
        StatementKind::Insert => translate_insert(&query.original_text),
        StatementKind::Update => translate_update(&query.original_text),
        StatementKind::Delete => translate_delete(&query.original_text),
        StatementKind::Show => translate_show(&query.original_text),
        StatementKind::Use => translate_use(&query.original_text),
    }
}

fn translate_select(query: &Query) -> Result<Request> {
    if query.from_table.is_none() {
        return translate_eval(query);
    }
    let collection = query.from_table.clone().unwrap();

    let has_joins = !query.joins.is_empty();
    let has_window = query
        .columns
        .iter()
        .any(|c| matches!(c, Column::Function { is_window: true, .. }));
    let has_group = !query.group_by.is_empty() || query.has_aggregate_column() || has_window;
    let has_subqueries = !query.subqueries.is_empty();

    // Multiple aggregates with no explicit GROUP BY still group (to a
    // single synthetic group), matching MariaDB's "aggregate the whole
    // result set" behaviour for bare `SELECT COUNT(*), SUM(x) FROM t`.
    //
    // A LIMIT on a single-column DISTINCT can't be expressed by the
    // `Distinct` request shape (it has no skip/limit), so that case and
    // any multi-column DISTINCT fall through to `translate_aggregate`,
    // which groups on the distinct field(s) instead.
    if !has_joins
        && !has_subqueries
        && query.distinct
        && !has_group
        && query.columns.len() == 1
        && query.limit.is_none()
    {
        if let Column::Plain { name, .. } = &query.columns[0] {
            return Ok(Request::Distinct {
                collection,
                field: name.clone(),
                filter: base_filter(query)?,
            });
        }
    }

    if !has_joins
        && !has_group
        && !has_subqueries
        && query.columns.len() == 1
        && matches!(
            &query.columns[0],
            Column::Function { name, is_aggregate: true, .. } if name == "COUNT"
        )
    {
        return Ok(Request::Count {
            collection,
            filter: base_filter(query)?,
        });
    }

    if !has_joins && !has_group && !has_subqueries && !query.distinct {
        return translate_find(query, collection);
    }

    translate_aggregate(query, collection)
}

/// Compiles a WHERE predicate that references one or more subqueries (via
/// their `__subquery_N` placeholder fields), splicing each one's `$lookup`
/// stage into `pipeline` and rewriting the placeholder into a condition
/// over the lookup's output array. Every subquery is compiled as a
/// `$lookup`, correlated or not — an uncorrelated inner query is still a
/// valid (if constant) lookup pipeline, which avoids needing a second,
/// execution-time round trip just to resolve a plain `IN (SELECT ...)`.
fn rewrite_with_subqueries(
    pred: &Predicate,
    query: &Query,
    pipeline: &mut Vec<Document>,
) -> Result<Document> {
    match pred {
        Predicate::Compound { op, children } => {
            let compiled = children
                .iter()
                .map(|c| rewrite_with_subqueries(c, query, pipeline))
                .collect::<Result<Vec<_>>>()?;
            let key = match op {
                BoolOp::And => "$and",
                BoolOp::Or => "$or",
            };
            Ok(doc! { key: compiled.into_iter().map(Bson::Document).collect::<Vec<_>>() })
        }
        Predicate::Simple { field, op, .. } if field.starts_with("__subquery_") => {
            let sub = query
                .subqueries
                .iter()
                .find(|s| s.alias.as_deref() == Some(field.as_str()))
                .ok_or_else(|| {
                    MongoSqlError::translation(format!("unresolved subquery placeholder `{field}`"))
                })?;
            let resolved = subquery::lookup_stage(sub)?;
            let ResolvedSubquery::Correlated {
                lookup_stage,
                alias,
                projected_field,
            } = resolved
            else {
                unreachable!("lookup_stage always returns Correlated")
            };
            pipeline.push(lookup_stage);
            subquery_condition(sub, *op, &alias, projected_field.as_deref())
        }
        Predicate::Simple { .. } => where_translator::translate(pred),
    }
}

/// Turns a resolved subquery's `$lookup` array (`alias`) into the condition
/// its placeholder predicate stood for: non-empty for `EXISTS`, membership
/// against the projected column otherwise.
fn subquery_condition(
    sub: &crate::sql::ast::Subquery,
    op: CompareOp,
    alias: &str,
    projected_field: Option<&str>,
) -> Result<Document> {
    if matches!(sub.kind, crate::sql::ast::SubqueryKind::Exists) {
        return Ok(doc! { alias: { "$ne": Vec::<Bson>::new() } });
    }

    let field = projected_field.ok_or_else(|| {
        MongoSqlError::translation("subquery has no projected column to compare against")
    })?;
    let outer_field = sub.outer_field.clone().ok_or_else(|| {
        MongoSqlError::translation("subquery comparison missing its outer-side field")
    })?;
    let values_ref = Bson::String(format!("${alias}.{field}"));
    let outer_ref = Bson::String(format!("${outer_field}"));

    let in_expr = doc! { "$in": [outer_ref, values_ref] };
    let expr = match op {
        CompareOp::NotIn | CompareOp::Ne => {
            doc! { "$not": [Bson::Document(in_expr)] }
        }
        CompareOp::Eq | CompareOp::In => in_expr,
        other => {
            return Err(MongoSqlError::unsupported(format!(
                "subquery comparison operator {other:?} not supported"
            )))
        }
    };
    Ok(doc! { "$expr": expr })
}

fn base_filter(query: &Query) -> Result<Document> {
    match &query.where_pred {
        Some(pred) => where_translator::translate(pred),
        None => Ok(Document::new()),
    }
}

fn translate_find(query: &Query, collection: String) -> Result<Request> {
    let filter = base_filter(query)?;
    let projection = build_find_projection(query)?;
    let sort = build_sort(query);
    let (skip, limit) = build_skip_limit(query);
    Ok(Request::Find {
        collection,
        filter,
        projection,
        sort,
        skip,
        limit,
    })
}

fn build_find_projection(query: &Query) -> Result<Option<Document>> {
    if query.columns.len() == 1 && matches!(query.columns[0], Column::Star) {
        return Ok(None);
    }
    let mut proj = Document::new();
    for col in &query.columns {
        match col {
            Column::Star => return Ok(None),
            Column::Plain { name, alias, .. } => {
                proj.insert(alias.clone().unwrap_or_else(|| name.clone()), format!("${name}"));
            }
            other => {
                let expr_bson = expr::compile(&source_text(other))?;
                proj.insert(other.output_label(), expr_bson);
            }
        }
    }
    proj.insert("_id", 0);
    Ok(Some(proj))
}

fn build_sort(query: &Query) -> Option<Document> {
    if query.order_by.is_empty() {
        return None;
    }
    let mut d = Document::new();
    for item in &query.order_by {
        d.insert(
            &item.field,
            if item.dir == Direction::Asc { 1 } else { -1 },
        );
    }
    Some(d)
}

fn build_skip_limit(query: &Query) -> (Option<i64>, Option<i64>) {
    match &query.limit {
        Some(l) => (l.offset, Some(l.count)),
        None => (None, None),
    }
}

fn translate_aggregate(query: &Query, collection: String) -> Result<Request> {
    let mut pipeline = Vec::new();

    if let Some(pred) = &query.where_pred {
        let filter = if query.subqueries.is_empty() {
            where_translator::translate(pred)?
        } else {
            rewrite_with_subqueries(pred, query, &mut pipeline)?
        };
        pipeline.push(doc! { "$match": filter });
    }

    pipeline.extend(join_translator::build_stages(&query.joins)?);
    pipeline.extend(window::build_stages(&query.columns)?);

    if !query.group_by.is_empty() || query.has_aggregate_column() {
        let plan = group_by::build(query)?;
        pipeline.extend(plan.stages);
        if let Some(having) = plan.having_filter {
            pipeline.push(having);
        }
    } else if query.distinct {
        let fields = distinct_fields(query)?;
        let mut group_fields = Document::new();
        group_fields.insert("_id", group_by::build_id(&fields));
        pipeline.push(doc! { "$group": group_fields });

        let mut proj = Document::new();
        if fields.len() == 1 {
            proj.insert(fields[0].clone(), "$_id");
        } else {
            for f in &fields {
                proj.insert(f.clone(), format!("$_id.{f}"));
            }
        }
        proj.insert("_id", 0);
        pipeline.push(doc! { "$project": proj });
    } else if !query.columns.is_empty() {
        let mut proj = Document::new();
        let mut only_star = true;
        for col in &query.columns {
            if !matches!(col, Column::Star) {
                only_star = false;
            }
            if let Column::Plain { name, alias, .. } = col {
                proj.insert(alias.clone().unwrap_or_else(|| name.clone()), format!("${name}"));
            } else if matches!(col, Column::Function { is_window: true, .. }) {
                // Already materialised by the $setWindowFields stage above;
                // just carry it through.
                let label = col.output_label();
                proj.insert(label.clone(), format!("${label}"));
            } else if !matches!(col, Column::Star) {
                let expr_bson = expr::compile(&source_text(col))?;
                proj.insert(col.output_label(), expr_bson);
            }
        }
        if !only_star {
            proj.insert("_id", 0);
            pipeline.push(doc! { "$project": proj });
        }
    }

    if let Some(sort) = build_sort(query) {
        pipeline.push(doc! { "$sort": sort });
    }
    let (skip, limit) = build_skip_limit(query);
    if let Some(s) = skip {
        pipeline.push(doc! { "$skip": s });
    }
    if let Some(l) = limit {
        pipeline.push(doc! { "$limit": l });
    }

    Ok(Request::Aggregate { collection, pipeline })
}

/// Extracts the plain column names a `SELECT DISTINCT` lists, for use as a
/// `$group._id` key. DISTINCT only applies to plain field references.
fn distinct_fields(query: &Query) -> Result<Vec<String>> {
    query
        .columns
        .iter()
        .map(|c| match c {
            Column::Plain { name, .. } => Ok(name.clone()),
            other => Err(MongoSqlError::unsupported(format!(
                "DISTINCT over non-plain column {other:?}"
            ))),
        })
        .collect()
}

fn translate_eval(query: &Query) -> Result<Request> {
    let mut columns = Vec::with_capacity(query.columns.len());
    for col in &query.columns {
        let label = col.output_label();
        let compiled = expr::compile(&source_text(col))?;
        columns.push((label, compiled));
    }
    Ok(Request::Eval { columns })
}

fn source_text(col: &Column) -> String {
    match col {
        Column::Star => "*".to_string(),
        Column::Plain { name, .. } => name.clone(),
        Column::Function { original_text, .. } => original_text.clone(),
        Column::Case {
            when_clauses,
            else_,
            ..
        } => {
            let mut s = String::from("CASE ");
            for w in when_clauses {
                s.push_str(&format!("WHEN {} THEN {} ", w.cond, w.then));
            }
            if let Some(e) = else_ {
                s.push_str(&format!("ELSE {e} "));
            }
            s.push_str("END");
            s
        }
        Column::RegexpInfix { left, right, .. } => format!("{left} REGEXP {right}"),
        Column::Raw { text, .. } => text.clone(),
    }
}

fn translate_insert(sql: &str) -> Result<Request> {
    let upper = sql.to_uppercase();
    let into_pos = upper
        .find("INTO")
        .ok_or_else(|| MongoSqlError::sql_syntax("INSERT missing INTO"))?;
    let after_into = sql[into_pos + 4..].trim();
    let paren = after_into.find('(');
    let table_end = paren.unwrap_or(after_into.len());
    let collection = after_into[..table_end].trim().to_string();

    let columns: Vec<String> = match paren {
        Some(p) => {
            let close = after_into[p..]
                .find(')')
                .ok_or_else(|| MongoSqlError::sql_syntax("unbalanced INSERT column list"))?
                + p;
            split_top_level(&after_into[p + 1..close], ',')
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect()
        }
        None => Vec::new(),
    };

    let values_pos = upper
        .find("VALUES")
        .ok_or_else(|| MongoSqlError::sql_syntax("INSERT missing VALUES"))?;
    let values_text = sql[values_pos + 6..].trim();
    let rows = split_top_level(values_text, ',');

    let mut documents = Vec::new();
    let mut i = 0;
    while i < rows.len() {
        let row = rows[i].trim();
        if row.starts_with('(') {
            let inner = row.trim_start_matches('(').trim_end_matches(')');
            let vals = split_top_level(inner, ',');
            let mut doc_ = Document::new();
            for (idx, v) in vals.iter().enumerate() {
                let key = columns
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("field{idx}"));
                doc_.insert(key, literal_bson(v.trim()));
            }
            documents.push(doc_);
        }
        i += 1;
    }

    if documents.len() == 1 {
        Ok(Request::InsertOne {
            collection,
            document: documents.remove(0),
        })
    } else {
        Ok(Request::InsertMany {
            collection,
            documents,
        })
    }
}

fn literal_bson(s: &str) -> Bson {
    if (s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')) {
        Bson::String(s[1..s.len() - 1].to_string())
    } else if let Ok(i) = s.parse::<i64>() {
        Bson::Int64(i)
    } else if let Ok(f) = s.parse::<f64>() {
        Bson::Double(f)
    } else if s.eq_ignore_ascii_case("NULL") {
        Bson::Null
    } else {
        Bson::String(s.to_string())
    }
}

fn translate_update(sql: &str) -> Result<Request> {
    let upper = sql.to_uppercase();
    let set_pos = upper
        .find("SET")
        .ok_or_else(|| MongoSqlError::sql_syntax("UPDATE missing SET"))?;
    let collection = sql[6..set_pos].trim().to_string();
    let where_pos = upper.find("WHERE");
    let set_text = match where_pos {
        Some(w) => &sql[set_pos + 3..w],
        None => &sql[set_pos + 3..],
    };
    let mut update_doc = Document::new();
    for assignment in split_top_level(set_text, ',') {
        if let Some((k, v)) = assignment.split_once('=') {
            update_doc.insert(k.trim().to_string(), literal_bson(v.trim()));
        }
    }
    let filter = match where_pos {
        Some(w) => {
            let mut q = Query::empty(StatementKind::Select, sql);
            let pred = crate::sql::parser::parse_predicate_text(sql[w + 5..].trim(), &mut q)?;
            where_translator::translate(&pred)?
        }
        None => Document::new(),
    };
    Ok(Request::UpdateMany {
        collection,
        filter,
        update: doc! { "$set": update_doc },
    })
}

fn translate_delete(sql: &str) -> Result<Request> {
    let upper = sql.to_uppercase();
    let from_pos = upper
        .find("FROM")
        .ok_or_else(|| MongoSqlError::sql_syntax("DELETE missing FROM"))?;
    let where_pos = upper.find("WHERE");
    let collection = match where_pos {
        Some(w) => sql[from_pos + 4..w].trim().to_string(),
        None => sql[from_pos + 4..].trim().to_string(),
    };
    let filter = match where_pos {
        Some(w) => {
            let mut q = Query::empty(StatementKind::Select, sql);
            let pred = crate::sql::parser::parse_predicate_text(sql[w + 5..].trim(), &mut q)?;
            where_translator::translate(&pred)?
        }
        None => Document::new(),
    };
    Ok(Request::DeleteMany { collection, filter })
}

fn translate_show(sql: &str) -> Result<Request> {
    let upper = sql.to_uppercase();
    if upper.contains("DATABASES") {
        Ok(Request::ShowDatabases)
    } else {
        Ok(Request::ShowCollections)
    }
}

fn translate_use(sql: &str) -> Result<Request> {
    let name = sql
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| MongoSqlError::sql_syntax("USE missing database name"))?
        .trim_matches('`')
        .to_string();
    Ok(Request::UseDatabase { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_subquery_compiles_to_lookup_and_expr_in() {
        let query = crate::sql::parser::parse(
            "SELECT id FROM orders WHERE customer_id IN (SELECT id FROM customers WHERE active = 1)",
        )
        .unwrap();
        let request = translate(&query).unwrap();
        let Request::Aggregate { pipeline, .. } = request else {
            panic!("expected an aggregate request");
        };
        assert!(pipeline.iter().any(|s| s.contains_key("$lookup")));
        let match_stage = pipeline
            .iter()
            .find(|s| s.contains_key("$match"))
            .expect("a $match stage");
        let filter = match_stage.get_document("$match").unwrap();
        assert!(filter.contains_key("$expr"));
    }

    #[test]
    fn exists_subquery_compiles_to_non_empty_array_check() {
        let query = crate::sql::parser::parse(
            "SELECT id FROM customers WHERE EXISTS (SELECT 1 FROM orders WHERE orders.customer_id = customers.id)",
        )
        .unwrap();
        let request = translate(&query).unwrap();
        let Request::Aggregate { pipeline, .. } = request else {
            panic!("expected an aggregate request");
        };
        assert!(pipeline.iter().any(|s| s.contains_key("$lookup")));
    }

    #[test]
    fn single_column_distinct_without_limit_uses_distinct_request() {
        let query = crate::sql::parser::parse("SELECT DISTINCT city FROM customers").unwrap();
        let request = translate(&query).unwrap();
        assert!(matches!(request, Request::Distinct { .. }));
    }

    #[test]
    fn single_column_distinct_with_limit_groups_instead() {
        let query =
            crate::sql::parser::parse("SELECT DISTINCT city FROM customers LIMIT 5").unwrap();
        let request = translate(&query).unwrap();
        let Request::Aggregate { pipeline, .. } = request else {
            panic!("expected an aggregate request");
        };
        let group_stage = pipeline
            .iter()
            .find(|s| s.contains_key("$group"))
            .expect("a $group stage");
        let group = group_stage.get_document("$group").unwrap();
        assert_eq!(group.get_str("_id").unwrap(), "$city");
        assert!(pipeline.iter().any(|s| s.contains_key("$limit")));
    }

    #[test]
    fn multi_column_distinct_groups_on_the_field_tuple() {
        let query =
            crate::sql::parser::parse("SELECT DISTINCT city, country FROM customers").unwrap();
        let request = translate(&query).unwrap();
        let Request::Aggregate { pipeline, .. } = request else {
            panic!("expected an aggregate request");
        };
        let group_stage = pipeline
            .iter()
            .find(|s| s.contains_key("$group"))
            .expect("a $group stage");
        let id = group_stage.get_document("$group").unwrap().get_document("_id").unwrap();
        assert_eq!(id.get_str("city").unwrap(), "$city");
        assert_eq!(id.get_str("country").unwrap(), "$country");
        let project_stage = pipeline
            .iter()
            .find(|s| s.contains_key("$project"))
            .expect("a $project stage");
        let proj = project_stage.get_document("$project").unwrap();
        assert_eq!(proj.get_str("city").unwrap(), "$_id.city");
    }
}
