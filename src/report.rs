//! # Report Module
//!
//! Questo modulo aggrega gli outcome di un run e produce le tabelle di report.
//!
//! ## Responsabilità:
//! - `RunSummary`: aggregato commutativo degli outcome (fold + merge)
//! - `CleanupReport`: conteggio delle cancellazioni degli originali superati
//! - Tabelle testuali in stile grid per i candidati e per i risultati
//! - Formattazione human-readable delle dimensioni
//!
//! ## Regole di aggregazione:
//! - Solo gli outcome di successo (committed o skipped) contribuiscono ai byte
//! - Gli errori sono solo conteggiati
//! - La percentuale risparmiata è 0 quando il totale originale è 0
//! - L'ordine di completamento non influenza il risultato
//!
//! ## Esempio output:
//! ```text
//! +------------------------+----------+-----------+
//! | File                   | Format   | Size (KB) |
//! +========================+==========+===========+
//! | themes/dark/cover.png  | PNG      | 2048.0 KB |
//! +------------------------+----------+-----------+
//! ```
//!
//! Il modulo è pura presentazione: non modifica mai gli outcome.

use crate::locator::ImageObject;
use crate::outcome::CompressionOutcome;
use serde::Serialize;

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// Aggregate of every outcome in a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Successful objects (committed + skipped)
    pub processed: usize,
    pub committed: usize,
    pub skipped: usize,
    pub errored: usize,
    pub total_original_bytes: u64,
    pub total_compressed_bytes: u64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a CompressionOutcome>) -> Self {
        outcomes.into_iter().fold(Self::new(), |mut summary, outcome| {
            summary.add(outcome);
            summary
        })
    }

    pub fn add(&mut self, outcome: &CompressionOutcome) {
        if !outcome.is_success() {
            self.errored += 1;
            return;
        }
        self.processed += 1;
        if outcome.is_committed() {
            self.committed += 1;
        } else {
            self.skipped += 1;
        }
        self.total_original_bytes += outcome.original_size;
        self.total_compressed_bytes += outcome.compressed_size;
    }

    /// Combine two partial summaries (e.g. per-worker results)
    pub fn merge(self, other: Self) -> Self {
        Self {
            processed: self.processed + other.processed,
            committed: self.committed + other.committed,
            skipped: self.skipped + other.skipped,
            errored: self.errored + other.errored,
            total_original_bytes: self.total_original_bytes + other.total_original_bytes,
            total_compressed_bytes: self.total_compressed_bytes + other.total_compressed_bytes,
        }
    }

    pub fn total_objects(&self) -> usize {
        self.processed + self.errored
    }

    pub fn saved_bytes(&self) -> u64 {
        self.total_original_bytes.saturating_sub(self.total_compressed_bytes)
    }

    pub fn saved_percent(&self) -> f64 {
        if self.total_original_bytes == 0 {
            return 0.0;
        }
        self.saved_bytes() as f64 / self.total_original_bytes as f64 * 100.0
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} | Committed: {} | Skipped: {} | Errors: {} | Saved: {} ({:.1}%)",
            self.processed,
            self.committed,
            self.skipped,
            self.errored,
            format_size(self.saved_bytes()),
            self.saved_percent()
        )
    }
}

/// Result of the deletion phase. Never folded into `RunSummary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
    pub failed_keys: Vec<String>,
}

impl CleanupReport {
    pub fn attempted(&self) -> usize {
        self.deleted + self.failed
    }
}

/// Convert bytes to human readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

fn kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / KB)
}

fn mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MB)
}

/// Plain grid table, one separator line after every row
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn render(&self) -> String {
        let columns = self.headers.len();
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().take(columns).enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let rule = |fill: char| {
            let mut line = String::from("+");
            for width in &widths {
                line.extend(std::iter::repeat(fill).take(width + 2));
                line.push('+');
            }
            line
        };
        let line = |cells: &[String]| {
            let mut out = String::from("|");
            for (i, width) in widths.iter().enumerate() {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let pad = width - cell.chars().count();
                out.push(' ');
                out.push_str(cell);
                out.extend(std::iter::repeat(' ').take(pad + 1));
                out.push('|');
            }
            out
        };

        let mut out = vec![rule('-'), line(self.headers.as_slice()), rule('=')];
        for row in &self.rows {
            out.push(line(row.as_slice()));
            out.push(rule('-'));
        }
        out.join("\n")
    }
}

/// Table shown before processing: every candidate plus a total row
pub fn candidate_table(objects: &[ImageObject]) -> Table {
    let mut table = Table::new(["File", "Format", "Size (KB)", "Size (MB)"]);
    let mut total = 0;
    for object in objects {
        total += object.original_size_bytes;
        table.row([
            object.key.clone(),
            object.format.name().to_string(),
            kb(object.original_size_bytes),
            mb(object.original_size_bytes),
        ]);
    }
    table.row([
        "Total".to_string(),
        format!("{} files", objects.len()),
        kb(total),
        mb(total),
    ]);
    table
}

/// Per-object result rows for successful outcomes, sorted by key, followed
/// by a KB total row and an MB total row
pub fn result_table(outcomes: &[CompressionOutcome]) -> Table {
    let mut table = Table::new(["File", "Original", "Compressed", "Saved", "Ratio", "Time"]);
    let mut rows: Vec<&CompressionOutcome> = outcomes.iter().filter(|o| o.is_success()).collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    for outcome in &rows {
        table.row([
            outcome.key.clone(),
            kb(outcome.original_size),
            kb(outcome.compressed_size),
            kb(outcome.bytes_saved()),
            format!("{:.1}%", outcome.reduction_ratio),
            format!("{:.1}s", outcome.elapsed.as_secs_f64()),
        ]);
    }

    let summary = RunSummary::from_outcomes(outcomes);
    let ratio = format!("{:.1}%", summary.saved_percent());
    table.row([
        "Total".to_string(),
        kb(summary.total_original_bytes),
        kb(summary.total_compressed_bytes),
        kb(summary.saved_bytes()),
        ratio.clone(),
        "-".to_string(),
    ]);
    table.row([
        "Total (MB)".to_string(),
        mb(summary.total_original_bytes),
        mb(summary.total_compressed_bytes),
        mb(summary.saved_bytes()),
        ratio,
        "-".to_string(),
    ]);
    table
}

/// Closing lines printed after the result table
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    vec![
        format!(
            "Processed {} files ({} committed, {} skipped), {} errors",
            summary.processed, summary.committed, summary.skipped, summary.errored
        ),
        format!("Total space saved: {}", mb(summary.saved_bytes())),
        format!("Average reduction: {:.1}%", summary.saved_percent()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimizeError;
    use crate::format::Codec;
    use std::time::Duration;

    fn sample() -> Vec<CompressionOutcome> {
        vec![
            CompressionOutcome::committed("b.png", 1000, 400, Codec::Png, "b.png", Duration::from_secs(1)),
            CompressionOutcome::skipped("a.jpg", 500, Duration::from_millis(200)),
            CompressionOutcome::failed(
                "c.gif",
                300,
                &OptimizeError::encode("c.gif", "boom"),
                Duration::ZERO,
            ),
        ]
    }

    #[test]
    fn test_summary_folds_only_successes() {
        let summary = RunSummary::from_outcomes(&sample());
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.committed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.total_original_bytes, 1500);
        assert_eq!(summary.total_compressed_bytes, 900);
        assert_eq!(summary.saved_bytes(), 600);
        assert_eq!(summary.saved_percent(), 40.0);
        assert_eq!(summary.total_objects(), 3);
    }

    #[test]
    fn test_summary_is_order_independent() {
        let outcomes = sample();
        let forward = RunSummary::from_outcomes(&outcomes);
        let backward = RunSummary::from_outcomes(outcomes.iter().rev());
        assert_eq!(forward, backward);

        let (left, right) = outcomes.split_at(1);
        let merged = RunSummary::from_outcomes(right).merge(RunSummary::from_outcomes(left));
        assert_eq!(merged, forward);
    }

    #[test]
    fn test_empty_summary_has_zero_percent() {
        let summary = RunSummary::new();
        assert_eq!(summary.saved_percent(), 0.0);
        assert!(summary.format_summary().contains("(0.0%)"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_table_render() {
        let mut table = Table::new(["a", "bb"]);
        table.row(["xyz", "1"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "+-----+----+");
        assert_eq!(lines[1], "| a   | bb |");
        assert_eq!(lines[2], "+=====+====+");
        assert_eq!(lines[3], "| xyz | 1  |");
        assert_eq!(lines[4], "+-----+----+");
    }

    /// Header and its rules take three lines, every row two
    fn body_rows(table: &Table) -> usize {
        (table.render().lines().count() - 3) / 2
    }

    #[test]
    fn test_candidate_table_has_total_row() {
        let objects = vec![ImageObject::new("t/a/x.png", 2048), ImageObject::new("t/a/y.webp", 1024)];
        let table = candidate_table(&objects);
        assert_eq!(body_rows(&table), 3);
        let rendered = table.render();
        assert!(rendered.contains("| Total"));
        assert!(rendered.contains("2 files"));
        assert!(rendered.contains("3.0 KB"));
        assert!(rendered.contains("WEBP"));
    }

    #[test]
    fn test_result_table_skips_failures_and_sorts() {
        let table = result_table(&sample());
        // 2 successi + 2 righe di totale
        assert_eq!(body_rows(&table), 4);
        let rendered = table.render();
        assert!(!rendered.contains("c.gif"));
        let a = rendered.find("a.jpg").unwrap();
        let b = rendered.find("b.png").unwrap();
        assert!(a < b);
        assert!(rendered.contains("40.0%"));
    }
}
