//! Result rendering (external, per the driver contract). Bordered ASCII
//! table with left-aligned text and right-aligned numeric columns via
//! `prettytable`, falling back to tab-separated output when stdout isn't a
//! terminal. Grounded on the teacher's `format_query_results_psql_with_info`
//! table-building style, trimmed to the single `ResultSet` shape this crate
//! works with.

use crate::mongo_client::ResultSet;
use bson::Bson;
use prettytable::format::Alignment;
use prettytable::{Cell, Row, Table};
use std::time::Duration;

/// Column names that render with two-decimal currency formatting, per the
/// driver contract.
const CURRENCY_COLUMNS: &[&str] = &["creditLimit", "buyPrice", "MSRP", "priceEach", "amount"];

fn is_currency_column(name: &str) -> bool {
    CURRENCY_COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(name))
}

fn is_numeric(value: &Bson) -> bool {
    matches!(
        value,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_)
    )
}

fn render_cell(column: &str, value: &Bson) -> String {
    match value {
        Bson::Null => "NULL".to_string(),
        Bson::Double(d) if is_currency_column(column) => format!("{d:.2}"),
        Bson::Decimal128(d) if is_currency_column(column) => format!("{d:.2}", d = d.to_string().parse::<f64>().unwrap_or(0.0)),
        Bson::Double(d) => {
            if d.fract() == 0.0 {
                format!("{d:.0}")
            } else {
                d.to_string()
            }
        }
        Bson::Boolean(b) => b.to_string(),
        Bson::String(s) => s.clone(),
        Bson::DateTime(dt) => dt.try_to_rfc3339_string().unwrap_or_else(|_| dt.to_string()),
        other => other.to_string(),
    }
}

/// Renders a `ResultSet` as a bordered ASCII table when `is_terminal` is
/// true, or tab-separated values otherwise (the "piped output" branch of
/// the driver contract), followed by the `N row(s) in set (T sec)` footer.
pub fn render(result: &ResultSet, elapsed: Duration, is_terminal: bool) -> String {
    let mut out = if is_terminal {
        render_table(result)
    } else {
        render_tsv(result)
    };
    out.push_str(&footer(result.rows.len(), elapsed));
    out
}

/// Renders a `ResultSet` one field per line (`\G` mode): each row is a
/// `***N. row***` header followed by `column: value` lines, matching the
/// MySQL client's vertical display.
pub fn render_vertical(result: &ResultSet, elapsed: Duration) -> String {
    let mut out = String::new();
    let label_width = result.columns.iter().map(|c| c.len()).max().unwrap_or(0);
    for (i, row) in result.rows.iter().enumerate() {
        out.push_str(&format!("*************************** {}. row ***************************\n", i + 1));
        for (column, value) in result.columns.iter().zip(row.iter()) {
            out.push_str(&format!(
                "{:>width$}: {}\n",
                column,
                render_cell(column, value),
                width = label_width
            ));
        }
    }
    out.push_str(&footer(result.rows.len(), elapsed));
    out
}

fn render_table(result: &ResultSet) -> String {
    if result.columns.is_empty() {
        return String::new();
    }
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        result.columns.iter().map(|c| Cell::new(c)).collect(),
    ));

    for row in &result.rows {
        let cells: Vec<Cell> = row
            .iter()
            .zip(result.columns.iter())
            .map(|(value, column)| {
                let text = render_cell(column, value);
                if is_numeric(value) {
                    Cell::new_align(&text, Alignment::RIGHT)
                } else {
                    Cell::new_align(&text, Alignment::LEFT)
                }
            })
            .collect();
        table.add_row(Row::new(cells));
    }

    format!("{table}")
}

fn render_tsv(result: &ResultSet) -> String {
    let mut out = String::new();
    out.push_str(&result.columns.join("\t"));
    out.push('\n');
    for row in &result.rows {
        let line = row
            .iter()
            .zip(result.columns.iter())
            .map(|(value, column)| render_cell(column, value))
            .collect::<Vec<_>>()
            .join("\t");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn footer(row_count: usize, elapsed: Duration) -> String {
    let noun = if row_count == 1 { "row" } else { "rows" };
    format!(
        "{row_count} {noun} in set ({:.2} sec)\n",
        elapsed.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample() -> ResultSet {
        ResultSet {
            columns: vec!["name".to_string(), "creditLimit".to_string()],
            rows: vec![
                vec![Bson::String("acme".to_string()), Bson::Double(1234.5)],
                vec![Bson::Null, Bson::Null],
            ],
        }
    }

    #[test]
    fn renders_null_as_literal_text() {
        let out = render_tsv(&sample());
        assert!(out.contains("NULL"));
    }

    #[test]
    fn currency_column_gets_two_decimals() {
        let out = render_tsv(&sample());
        assert!(out.contains("1234.50"));
    }

    #[test]
    fn footer_uses_singular_row_for_one_result() {
        let footer = footer(1, Duration::from_millis(250));
        assert!(footer.starts_with("1 row in set"));
    }

    #[test]
    fn footer_uses_plural_rows_for_many_results() {
        let footer = footer(3, Duration::from_millis(10));
        assert!(footer.starts_with("3 rows in set"));
    }

    #[test]
    fn vertical_mode_labels_each_field_per_row() {
        let out = render_vertical(&sample(), Duration::from_millis(5));
        assert!(out.contains("1. row"));
        assert!(out.contains("name: acme"));
        assert!(out.contains("creditLimit: 1234.50"));
    }
}
