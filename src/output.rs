use crate::error::{Result, SalesMetricsError};
use crate::types::{BreakdownMetric, BreakdownRow, MonthlyMetric, MonthlyRow};
use crate::util::format_number;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|e| SalesMetricsError::io(path, e))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|e| SalesMetricsError::io(path, e))?;
    Ok(())
}

pub fn monthly_rows(months: &[MonthlyMetric]) -> Vec<MonthlyRow> {
    months
        .iter()
        .map(|m| MonthlyRow {
            month: m.key.clone(),
            total_calls: m.counters.total_calls,
            purchased: m.counters.purchased,
            did_not_purchase: m.counters.did_not_purchase,
            no_show: m.counters.no_show,
            rescheduled: m.counters.rescheduled,
            deposit_commitment: m.counters.deposit_commitment,
            conversion_rate: format!("{}%", format_number(m.conversion_rate, 2)),
        })
        .collect()
}

pub fn breakdown_rows(rows: &[BreakdownMetric]) -> Vec<BreakdownRow> {
    rows.iter()
        .map(|b| BreakdownRow {
            name: b.name.clone(),
            total_calls: b.counters.total_calls,
            purchased: b.counters.purchased,
            did_not_purchase: b.counters.did_not_purchase,
            no_show: b.counters.no_show,
            conversion_rate: format!("{}%", format_number(b.conversion_rate, 2)),
        })
        .collect()
}

/// Markdown table of the first `max_rows` rows, or `None` when empty.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return None;
    }
    Some(Table::new(slice).with(Style::markdown()).to_string())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    match render_table(rows, max_rows) {
        Some(table) => println!("{}\n", table),
        None => println!("(no rows)\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Counters;

    fn metric(name: &str, purchased: u64, did_not_purchase: u64) -> BreakdownMetric {
        BreakdownMetric::new(
            name.to_string(),
            Counters {
                total_calls: purchased + did_not_purchase,
                purchased,
                did_not_purchase,
                ..Counters::default()
            },
        )
    }

    #[test]
    fn breakdown_rows_format_rates() {
        let rows = breakdown_rows(&[metric("Google", 1, 2)]);
        assert_eq!(rows[0].name, "Google");
        assert_eq!(rows[0].total_calls, 3);
        assert_eq!(rows[0].conversion_rate, "33.33%");
    }

    #[test]
    fn render_table_limits_rows() {
        let rows = breakdown_rows(&[metric("Google", 1, 1), metric("Instagram", 0, 1)]);
        let table = render_table(&rows, 1).unwrap();
        assert!(table.contains("Google"));
        assert!(!table.contains("Instagram"));
        assert!(table.contains("ConversionRate"));
        assert!(render_table::<BreakdownRow>(&[], 5).is_none());
    }

    #[test]
    fn writes_json_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let rows = breakdown_rows(&[metric("Google", 1, 1)]);

        let csv_path = dir.path().join("funnels.csv");
        write_csv(&csv_path, &rows).unwrap();
        let csv_text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv_text.starts_with("Name,TotalCalls,Purchased,DidNotPurchase,NoShow,ConversionRate"));
        assert!(csv_text.contains("Google,2,1,1,0,50.00%"));

        let json_path = dir.path().join("funnels.json");
        write_json(&json_path, &[metric("Google", 1, 1)]).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(v[0]["name"], "Google");
        assert_eq!(v[0]["conversionRate"], 50.0);
    }
}
