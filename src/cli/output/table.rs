//! Table output formatting for CLI commands
//!
//! Provides formatted table output for phase timings and stored
//! conclusions using comfy-table. Supports color-coded cells, automatic
//! column sizing, and accessibility features.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::infrastructure::database::ConclusionSummary;
use crate::services::PhaseTiming;

use super::truncate;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format per-phase wall-clock timings as a table
    pub fn format_timings(&self, timings: &[PhaseTiming]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Turns").add_attribute(Attribute::Bold),
            Cell::new("Elapsed").add_attribute(Attribute::Bold),
        ]);

        for timing in timings {
            let phase_cell = if self.use_colors {
                Cell::new(&timing.phase_name).fg(Color::Cyan)
            } else {
                Cell::new(&timing.phase_name)
            };

            table.add_row(vec![
                phase_cell,
                Cell::new(timing.turns.to_string()),
                Cell::new(format!("{:.1}s", timing.elapsed.as_secs_f64())),
            ]);
        }

        table.to_string()
    }

    /// Format stored conclusions as a table, newest first
    pub fn format_conclusions(&self, conclusions: &[ConclusionSummary]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Roles").add_attribute(Attribute::Bold),
            Cell::new("Kind").add_attribute(Attribute::Bold),
            Cell::new("Conclusion").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
        ]);

        for row in conclusions {
            let kind_cell = if self.use_colors {
                Cell::new(&row.content_kind).fg(kind_color(&row.content_kind))
            } else {
                Cell::new(&row.content_kind)
            };

            let one_line = row.content.replace('\n', " ");

            table.add_row(vec![
                Cell::new(&row.phase_name),
                Cell::new(&row.role_pair),
                kind_cell,
                Cell::new(truncate(&one_line, 60)),
                Cell::new(&row.created_at),
            ]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        // Use UTF-8 preset for nice borders
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        // Apply max width if set
        if let Some(width) = self.max_width {
            table.set_width(width as u16);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Check for dumb terminal
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

/// Map conclusion kind to color
fn kind_color(kind: &str) -> Color {
    match kind {
        "code" => Color::Yellow,
        _ => Color::Green,
    }
}
