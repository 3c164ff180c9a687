//! Window function stage builder. Pairs with `functions::window`, which
//! compiles each function's own output expression; this module builds the
//! enclosing `$setWindowFields` stage from a column's `WindowSpec`.

use crate::error::Result;
use crate::functions::window;
use crate::sql::ast::{Column, Direction};
use bson::{doc, Document};

/// Build a `$setWindowFields` stage for every window-function column in
/// the SELECT list. `PARTITION BY` is parsed but, per spec.md §9, is not
/// emitted — every window spans the whole result set.
pub fn build_stages(columns: &[Column]) -> Result<Vec<Document>> {
    let mut stages = Vec::new();
    for col in columns {
        if let Column::Function {
            name,
            args_text,
            is_window: true,
            window_spec,
            ..
        } = col
        {
            let args: Vec<bson::Bson> = if args_text.trim().is_empty() {
                Vec::new()
            } else {
                args_text
                    .split(',')
                    .map(|a| crate::expr::compile(a.trim()))
                    .collect::<Result<Vec<_>>>()?
            };
            let output_expr = window::output_expr(name, &args)?;
            let sort_by = window_spec.as_ref().map(|w| {
                let mut d = Document::new();
                for item in &w.order_by {
                    d.insert(&item.field, if item.dir == Direction::Asc { 1 } else { -1 });
                }
                d
            });
            let mut set_window_fields = doc! {
                "output": { col.output_label(): output_expr }
            };
            if let Some(sort) = sort_by {
                if !sort.is_empty() {
                    set_window_fields.insert("sortBy", sort);
                }
            }
            stages.push(doc! { "$setWindowFields": set_window_fields });
        }
    }
    Ok(stages)
}
