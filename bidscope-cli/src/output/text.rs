//! Text output formatting with tables and colors.

use bidscope_core::{EnrichedRecord, Employee, NOT_AVAILABLE, RateLimitSnapshot, ShiftBucket};
use bidscope_store::DatasetMeta;
use chrono::{DateTime, Local, Utc};
use std::time::Duration;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

const TITLE_WIDTH: usize = 32;
const CLIENT_WIDTH: usize = 16;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Formats rows as a table. Rows with errors get an indented note.
    pub fn format_rows(&self, rows: &[EnrichedRecord]) -> String {
        if rows.is_empty() {
            return self.dim("No threads.");
        }

        let mut lines = vec![self.bold(&format!(
            "{:<10} {:<title$} {:<client$} {:>9} {:<10} {:>9} {:>9}",
            "Thread",
            "Project",
            "Client",
            "Bid",
            "Status",
            "Paid",
            "Response",
            title = TITLE_WIDTH,
            client = CLIENT_WIDTH,
        ))];

        for row in rows {
            lines.push(self.format_row(row));
            if let Some(error) = &row.error {
                lines.push(format!("           {}", self.red(error)));
            }
        }

        lines.join("\n")
    }

    fn format_row(&self, row: &EnrichedRecord) -> String {
        let thread = row
            .thread_id
            .map_or_else(|| NOT_AVAILABLE.to_string(), |id| id.to_string());
        let status = if row.awarded {
            self.green(&pad("awarded", 10))
        } else if row.bid_id.is_none() {
            self.dim(&pad(NOT_AVAILABLE, 10))
        } else {
            pad(&row.award_status, 10)
        };
        let response = row
            .response_time_seconds
            .map_or_else(|| NOT_AVAILABLE.to_string(), format_seconds);

        format!(
            "{:<10} {:<title$} {:<client$} {:>9.2} {} {:>9.2} {:>9}",
            thread,
            truncate(&row.project_title, TITLE_WIDTH),
            truncate(&row.client_username, CLIENT_WIDTH),
            row.bid_amount,
            status,
            row.total_paid_milestones,
            response,
            title = TITLE_WIDTH,
            client = CLIENT_WIDTH,
        )
    }

    /// Formats the footer of a run.
    pub fn format_run_summary(
        &self,
        rows: &[EnrichedRecord],
        failures: usize,
        cancelled: bool,
        elapsed: Option<Duration>,
    ) -> String {
        let awarded = rows.iter().filter(|r| r.awarded).count();
        let paid = rows
            .iter()
            .map(|r| r.total_paid_milestones)
            .fold(0.0, |total, p| total + p);

        let mut summary = format!(
            "{} threads, {} awarded, {} paid",
            rows.len(),
            self.green(&awarded.to_string()),
            self.green(&format!("{paid:.2}"))
        );
        if failures > 0 {
            summary.push_str(&format!(", {}", self.yellow(&format!("{failures} with errors"))));
        }
        if let Some(elapsed) = elapsed {
            summary.push_str(&self.dim(&format!(" in {:.1}s", elapsed.as_secs_f64())));
        }
        if cancelled {
            summary.push_str(&format!(" {}", self.red("(cancelled, partial results)")));
        }
        summary
    }

    /// Formats the rate-limit line.
    pub fn format_rate_limits(&self, limits: &RateLimitSnapshot) -> String {
        let line = format!("Rate limit: {}/{} remaining", limits.remaining, limits.limit);
        if limits.is_rate_limited {
            self.red(&format!("{line} (rate limited)"))
        } else {
            self.dim(&line)
        }
    }

    // ========================================================================
    // Datasets
    // ========================================================================

    /// Formats the dataset list.
    pub fn format_datasets(&self, metas: &[DatasetMeta]) -> String {
        if metas.is_empty() {
            return self.dim("No saved datasets.");
        }

        let mut lines = vec![self.bold(&format!(
            "{:<24} {:>6} {:<22} {}",
            "Name", "Rows", "Saved", "Window"
        ))];
        for meta in metas {
            lines.push(format!(
                "{:<24} {:>6} {:<22} {}",
                truncate(&meta.name, 24),
                meta.row_count,
                format_local(meta.saved_at),
                self.dim(&format_window(meta)),
            ));
        }
        lines.join("\n")
    }

    /// Formats one dataset's header.
    pub fn format_dataset_meta(&self, meta: &DatasetMeta) -> String {
        format!(
            "{} ({} rows, saved {}, {})",
            self.bold(&meta.name),
            meta.row_count,
            format_local(meta.saved_at),
            format_window(meta)
        )
    }

    // ========================================================================
    // Employees
    // ========================================================================

    /// Formats the roster.
    pub fn format_employees(&self, employees: &[Employee]) -> String {
        if employees.is_empty() {
            return self.dim("No employees.");
        }

        let mut lines = vec![self.bold(&format!("{:<4} {:<20} {:<16} {}", "Id", "Name", "Shift", "Color"))];
        for employee in employees {
            lines.push(format!(
                "{:<4} {:<20} {:<16} {}",
                employee.id,
                truncate(&employee.name, 20),
                employee.window_label(),
                self.dim(&employee.color)
            ));
        }
        lines.join("\n")
    }

    /// Formats shift buckets.
    pub fn format_shifts(&self, buckets: &[ShiftBucket<'_>]) -> String {
        let mut lines = vec![self.bold(&format!(
            "{:<20} {:<16} {:>6} {:>8} {:>9} {:>10}",
            "Shift", "Window", "Rows", "Awarded", "Win rate", "Paid"
        ))];

        for bucket in buckets {
            let window = bucket
                .employee
                .map_or_else(|| "-".to_string(), Employee::window_label);
            let win_rate = bucket
                .win_rate()
                .map_or_else(|| "-".to_string(), |rate| format!("{:.0}%", rate * 100.0));
            let label = truncate(bucket.label(), 20);
            let label = if bucket.employee.is_some() {
                self.cyan(&pad(&label, 20))
            } else {
                self.dim(&pad(&label, 20))
            };

            lines.push(format!(
                "{} {:<16} {:>6} {:>8} {:>9} {:>10.2}",
                label,
                window,
                bucket.records.len(),
                bucket.awarded_count(),
                win_rate,
                bucket.total_paid(),
            ));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Formats a success line.
    pub fn format_success(&self, message: &str) -> String {
        format!("{} {}", self.green("✓"), message)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

// ============================================================================
// Plain helpers
// ============================================================================

/// Shortens `text` to `width` characters, ending in `…` when cut.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// Formats a duration in seconds, e.g. `1h 5m`, `3m 20s`, `45s`.
pub fn format_seconds(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);

    if hours >= 24 {
        format!("{sign}{}d {}h", hours / 24, hours % 24)
    } else if hours > 0 {
        format!("{sign}{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{sign}{minutes}m {secs}s")
    } else {
        format!("{sign}{secs}s")
    }
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_window(meta: &DatasetMeta) -> String {
    let from = meta.from_date.as_deref().unwrap_or("start");
    let to = meta.to_date.as_deref().unwrap_or("now");
    match meta.limit {
        Some(limit) => format!("{from} to {to}, limit {limit}"),
        None => format!("{from} to {to}"),
    }
}
