//! Report writers: CSV table, JSON document and a fixed-width terminal table.

use crate::error::Result;
use crate::eval::Report;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Label of the trailing observation-count row.
pub const COUNTS_ROW: &str = "counts";

fn format_cell(value: f64) -> String {
    format!("{:.4}", value)
}

/// Count rows for the report: one shared `counts` row when every metric saw
/// the same observations, else one `<metric>__counts` row per metric.
fn count_rows(report: &Report) -> Vec<(String, &[u64])> {
    if report.is_empty() {
        return Vec::new();
    }
    match report.shared_counts() {
        Some(counts) => vec![(COUNTS_ROW.to_string(), counts)],
        None => {
            log::warn!("Observation counts differ between metrics; writing one counts row per metric");
            report
                .metrics
                .iter()
                .map(|(key, row)| (format!("{}__counts", key), row.counts.as_slice()))
                .collect()
        }
    }
}

/// Writes the report as CSV: a header row, one row per metric key and the
/// observation counts, every cell to 4 decimal places.
pub fn write_csv<W: Write>(report: &Report, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["metric".to_string()];
    header.extend(report.column_names());
    csv_writer.write_record(&header)?;

    for (key, row) in &report.metrics {
        let mut record = vec![key.clone()];
        record.extend(row.values.iter().map(|&v| format_cell(v)));
        csv_writer.write_record(&record)?;
    }

    for (label, counts) in count_rows(report) {
        let mut record = vec![label];
        record.extend(counts.iter().map(|&c| format_cell(c as f64)));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the report as CSV to `path`.
pub fn write_csv_file(report: &Report, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(report, file)
}

/// Writes the report as pretty-printed JSON.
pub fn write_json<W: Write>(report: &Report, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Writes the report as JSON to `path`.
pub fn write_json_file(report: &Report, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    write_json(report, &mut file)?;
    writeln!(file)?;
    Ok(())
}

/// Renders the report as a fixed-width text table for the terminal.
pub fn render_table(report: &Report) -> String {
    let columns = report.column_names();
    let width = 16 + columns.len() * 10;
    let rule = "-".repeat(width);
    let mut out = String::new();

    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("{:<16}", "Metric"));
    for column in &columns {
        out.push_str(&format!("{:>10}", column));
    }
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for (key, row) in &report.metrics {
        out.push_str(&format!("{:<16}", key));
        for value in &row.values {
            out.push_str(&format!("{:>10.4}", value));
        }
        out.push('\n');
    }

    let counts_rows = count_rows(report);
    if !counts_rows.is_empty() {
        out.push_str(&rule);
        out.push('\n');
    }
    for (label, counts) in counts_rows {
        out.push_str(&format!("{:<16}", label));
        for count in counts {
            out.push_str(&format!("{:>10}", count));
        }
        out.push('\n');
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{Aggregator, TurnMetrics};
    use tempfile::TempDir;

    fn sample_report() -> Report {
        let mut aggregator = Aggregator::new(2);
        let mut dialog = TurnMetrics::new();
        dialog.insert("hit@1".to_string(), vec![1.0, 0.0]);
        dialog.insert("recall@1".to_string(), vec![0.5, 0.25]);
        aggregator.observe(&dialog);
        aggregator.finish()
    }

    #[test]
    fn test_csv_layout() {
        let mut buf = Vec::new();
        write_csv(&sample_report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "metric,macro,micro,Turn 0,Turn 1");
        assert_eq!(lines[1], "hit@1,0.5000,0.5000,1.0000,0.0000");
        assert_eq!(lines[2], "recall@1,0.3750,0.3750,0.5000,0.2500");
        assert_eq!(lines[3], "counts,1.0000,2.0000,1.0000,1.0000");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_csv_per_metric_counts_when_counts_differ() {
        let mut aggregator = Aggregator::new(1);
        let mut first = TurnMetrics::new();
        first.insert("hit@1".to_string(), vec![1.0]);
        aggregator.observe(&first);
        let mut second = TurnMetrics::new();
        second.insert("hit@1".to_string(), vec![0.0]);
        second.insert("mrr@1".to_string(), vec![0.0]);
        aggregator.observe(&second);

        let mut buf = Vec::new();
        write_csv(&aggregator.finish(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("hit@1__counts,2.0000,2.0000,2.0000"));
        assert!(text.contains("mrr@1__counts,1.0000,1.0000,1.0000"));
        assert!(!text.contains("\ncounts,"));
    }

    #[test]
    fn test_csv_empty_report_has_header_only() {
        let mut buf = Vec::new();
        write_csv(&Aggregator::new(1).finish(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "metric,macro,micro,Turn 0\n");
    }

    #[test]
    fn test_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scores.json");
        write_json_file(&sample_report(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["max_turns"], 2);
        assert_eq!(value["dialogs"], 1);
        assert_eq!(value["metrics"]["hit@1"]["counts"][1], 2);
        assert_eq!(value["metrics"]["recall@1"]["values"][2], 0.5);
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&sample_report());
        assert!(table.contains("Turn 1"));
        assert!(table.lines().any(|l| l.starts_with("recall@1") && l.contains("0.3750")));
        assert!(table.lines().any(|l| l.starts_with("counts")));
    }
}
