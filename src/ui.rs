//! Console output: coloured status lines, tables, spinners.

use chrono::{DateTime, Utc};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

use crate::types::{CatalogEntry, CatalogStats, StageState, ToolFamily};

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "DAW")]
    daw: String,
    #[tabled(rename = "Details")]
    details: String,
    #[tabled(rename = "Date")]
    date: String,
}

impl EntryRow {
    fn from_entry(entry: &CatalogEntry) -> Self {
        let details = match &entry.state {
            StageState::Raw => format!("{:.1} MB", entry.artifact.size_mb()),
            StageState::Refined(refinement) => {
                let mut parts = Vec::new();
                if let Some(genre) = &refinement.genre {
                    parts.push(genre.clone());
                }
                if let Some(bpm) = refinement.bpm {
                    parts.push(format!("{} BPM", bpm));
                }
                if let Some(key) = &refinement.key {
                    parts.push(key.clone());
                }
                if let Some(rating) = refinement.rating {
                    parts.push(format!("{}/10", rating.value()));
                }
                parts.push(refinement.status.clone());
                parts.join(" · ")
            }
            StageState::Rejected(rejection) => rejection.reason.clone(),
        };

        Self {
            id: entry.id,
            title: entry.title().to_string(),
            daw: entry.tool_family().display_name().to_string(),
            details,
            date: format_date(entry.stage_timestamp()),
        }
    }
}

fn format_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

fn format_optional_date(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map(format_date).unwrap_or_else(|| "-".to_string())
}

/// Disabling colours is process-wide, since `colored` keeps a global override.
pub struct UIManager;

impl UIManager {
    pub fn new(colors_enabled: bool) -> Self {
        if !colors_enabled {
            colored::control::set_override(false);
        }
        Self
    }

    pub fn print_header(&self, title: &str) {
        println!("\n{}", title.bold().cyan());
        println!("{}", "─".repeat(title.chars().count().max(20)).dimmed());
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{}", message);
    }

    pub fn print_warning(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    /// Spinner on stderr; hidden automatically when stderr is not a terminal.
    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    pub fn render_entries(&self, entries: &[CatalogEntry]) -> String {
        let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from_entry).collect();
        Table::new(rows).with(Style::rounded()).to_string()
    }

    pub fn render_entry(&self, entry: &CatalogEntry) -> String {
        let artifact = &entry.artifact;
        let mut lines = vec![
            format!("{} {}", "ID:".bold(), entry.id),
            format!("{} {}", "Title:".bold(), entry.title()),
            format!("{} {}", "DAW:".bold(), entry.tool_family().display_name()),
            format!("{} {}", "Stage:".bold(), entry.stage()),
            format!("{} {}", "Path:".bold(), artifact.path.display()),
            format!("{} {:.1} MB", "Size:".bold(), artifact.size_mb()),
            format!("{} {}", "Created:".bold(), format_optional_date(artifact.created_at)),
            format!("{} {}", "Modified:".bold(), format_optional_date(artifact.modified_at)),
            format!("{} {}", "Discovered:".bold(), format_date(entry.discovered_at)),
        ];
        if let Some(folder) = &artifact.folder_path {
            lines.push(format!("{} {}", "Folder:".bold(), folder.display()));
        }
        if !artifact.additional_files.is_empty() {
            lines.push(format!(
                "{} {}",
                "Other files:".bold(),
                artifact.additional_files.join(", ")
            ));
        }

        match &entry.state {
            StageState::Raw => {}
            StageState::Refined(refinement) => {
                let optional = [
                    ("Description:", refinement.description.clone()),
                    ("Genre:", refinement.genre.clone()),
                    ("BPM:", refinement.bpm.map(|bpm| bpm.to_string())),
                    ("Key:", refinement.key.clone()),
                    ("Year:", refinement.year.map(|year| year.to_string())),
                    ("Rating:", refinement.rating.map(|r| format!("{}/10", r.value()))),
                    ("Collaboration:", refinement.collaboration.clone()),
                ];
                for (label, value) in optional {
                    if let Some(value) = value {
                        lines.push(format!("{} {}", label.bold(), value));
                    }
                }
                lines.push(format!("{} {}", "Status:".bold(), refinement.status));
                if !refinement.tags.is_empty() {
                    let tags: Vec<&str> = refinement.tags.iter().map(String::as_str).collect();
                    lines.push(format!("{} {}", "Tags:".bold(), tags.join(", ")));
                }
                lines.push(format!("{} {}", "Refined:".bold(), format_date(refinement.refined_at)));
            }
            StageState::Rejected(rejection) => {
                lines.push(format!("{} {}", "Reason:".bold(), rejection.reason));
                lines.push(format!("{} {}", "Rejected:".bold(), format_date(rejection.rejected_at)));
            }
        }

        lines.join("\n")
    }

    pub fn render_stats(&self, stats: &CatalogStats) -> String {
        let mut lines = vec![
            format!("Raw (unprocessed): {}", stats.raw.to_string().yellow()),
            format!("Refined:           {}", stats.refined.to_string().green()),
            format!("Rejected:          {}", stats.rejected.to_string().red()),
            format!("Total:             {}", stats.total()),
        ];
        if !stats.refined_by_tool.is_empty() {
            lines.push(String::new());
            lines.push("Refined by DAW:".bold().to_string());
            for family in ToolFamily::ALL {
                if let Some(count) = stats.refined_by_tool.get(&family) {
                    lines.push(format!("  {:<12} {}", family.display_name(), count));
                }
            }
        }
        lines.join("\n")
    }
}
