//! JOIN translator (J): turns `JoinOp`s into `$lookup`/`$unwind` aggregation
//! stages. Grounded on the original implementation's `join_translator.py`
//! and `join_types.py`.
//!
//! RIGHT JOIN has no native MongoDB counterpart any more than LEFT JOIN
//! does; the original swapped which table `$lookup` treats as primary
//! rather than emitting a dedicated stage shape, and per spec.md §9 that
//! swap is a preserved, documented ambiguity rather than something to
//! "fix" — a RIGHT JOIN here is compiled exactly as the equivalent LEFT
//! JOIN with its two sides swapped.
//!
//! FULL OUTER JOIN had no handler in the original at all. It is built here
//! from first principles as a LEFT JOIN unioned (`$unionWith`) with the
//! anti-join of the right collection (documents with no matching left row),
//! since `$lookup` alone cannot express a full outer join.

use crate::error::Result;
use crate::sql::ast::{JoinCond, JoinKind, JoinOp};
use bson::{doc, Bson, Document};

/// Build the aggregation pipeline stages for a sequence of joins applied in
/// order against a base collection. `FULL` joins append a `$unionWith`
/// stage rather than a `$lookup`, since the anti-join half needs an
/// independent pipeline over the right collection.
pub fn build_stages(joins: &[JoinOp]) -> Result<Vec<Document>> {
    let mut stages = Vec::new();
    for join in joins {
        match join.kind {
            JoinKind::Inner | JoinKind::Left => {
                stages.extend(lookup_and_unwind(
                    &join.right_table,
                    &join.conditions,
                    alias_for(join),
                    join.kind == JoinKind::Left,
                    false,
                ));
            }
            JoinKind::Right => {
                // Swap perspective: treat the join as if `right_table` were
                // the base and `left_table` were being looked up, preserving
                // LEFT JOIN's null-padding direction on the originally-right
                // side. See module docs.
                let swapped_conditions: Vec<JoinCond> = join
                    .conditions
                    .iter()
                    .map(|c| JoinCond {
                        left_table: c.right_table.clone(),
                        left_col: c.right_col.clone(),
                        right_table: c.left_table.clone(),
                        right_col: c.left_col.clone(),
                    })
                    .collect();
                stages.extend(lookup_and_unwind(
                    &join.left_table,
                    &swapped_conditions,
                    alias_for(join),
                    true,
                    false,
                ));
            }
            JoinKind::Cross => {
                stages.extend(lookup_and_unwind(
                    &join.right_table,
                    &[],
                    alias_for(join),
                    false,
                    true,
                ));
            }
            JoinKind::Full => {
                let alias = alias_for(join);
                stages.extend(lookup_and_unwind(
                    &join.right_table,
                    &join.conditions,
                    alias.clone(),
                    true,
                    false,
                ));
                if let Some(cond) = join.conditions.first() {
                    stages.push(doc! {
                        "$unionWith": {
                            "coll": &join.right_table,
                            "pipeline": [
                                {
                                    "$lookup": {
                                        "from": &join.left_table,
                                        "localField": &cond.right_col,
                                        "foreignField": &cond.left_col,
                                        "as": "__full_anti",
                                    }
                                },
                                { "$match": { "__full_anti": { "$size": 0 } } },
                                { "$project": { "__full_anti": 0 } },
                            ]
                        }
                    });
                }
            }
        }
    }
    Ok(stages)
}

fn alias_for(join: &JoinOp) -> String {
    join.right_alias
        .clone()
        .unwrap_or_else(|| join.right_table.clone())
}

fn lookup_and_unwind(
    from: &str,
    conditions: &[JoinCond],
    alias: String,
    preserve_null: bool,
    cross: bool,
) -> Vec<Document> {
    let lookup = if cross || conditions.is_empty() {
        doc! {
            "$lookup": {
                "from": from,
                "pipeline": Vec::<Document>::new(),
                "as": &alias,
            }
        }
    } else {
        let cond = &conditions[0];
        doc! {
            "$lookup": {
                "from": from,
                "localField": &cond.left_col,
                "foreignField": &cond.right_col,
                "as": &alias,
            }
        }
    };
    vec![
        lookup,
        doc! {
            "$unwind": {
                "path": format!("${alias}"),
                "preserveNullAndEmptyArrays": Bson::Boolean(preserve_null || cross),
            }
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::JoinKind;

    fn simple_join(kind: JoinKind) -> JoinOp {
        JoinOp {
            kind,
            left_table: "orders".to_string(),
            right_table: "customers".to_string(),
            left_alias: None,
            right_alias: None,
            conditions: vec![JoinCond {
                left_table: "orders".to_string(),
                left_col: "customer_id".to_string(),
                right_table: "customers".to_string(),
                right_col: "id".to_string(),
            }],
        }
    }

    #[test]
    fn inner_join_does_not_preserve_nulls() {
        let stages = build_stages(&[simple_join(JoinKind::Inner)]).unwrap();
        let unwind = stages[1].get_document("$unwind").unwrap();
        assert_eq!(unwind.get_bool("preserveNullAndEmptyArrays").unwrap(), false);
    }

    #[test]
    fn left_join_preserves_nulls() {
        let stages = build_stages(&[simple_join(JoinKind::Left)]).unwrap();
        let unwind = stages[1].get_document("$unwind").unwrap();
        assert!(unwind.get_bool("preserveNullAndEmptyArrays").unwrap());
    }

    #[test]
    fn full_join_adds_union_with_stage() {
        let stages = build_stages(&[simple_join(JoinKind::Full)]).unwrap();
        assert!(stages.iter().any(|s| s.contains_key("$unionWith")));
    }
}
