//! Aggregations over the catalog: productivity, genres, completion, ratings,
//! collaborators and tags.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::types::{CatalogEntry, Refinement, Stage, ToolFamily, DEFAULT_STATUS};

const TOP_COLLABORATORS: usize = 10;
const TOP_TAGS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCompletion {
    pub tool_family: ToolFamily,
    pub total: usize,
    pub completed: usize,
}

impl ToolCompletion {
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Everything the `analytics` command prints. Only refined entries feed the
/// per-field sections; the overview covers every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub discovered: usize,
    pub refined: usize,
    pub rejected: usize,
    pub unprocessed: usize,
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Refined projects per creation month, `YYYY-MM`.
    pub monthly: BTreeMap<String, usize>,
    pub genres: Vec<(String, usize)>,
    pub statuses: Vec<(String, usize)>,
    pub completion: Vec<ToolCompletion>,
    /// Index 0 holds the count of rating 1.
    pub rating_histogram: [usize; 10],
    pub average_rating: Option<f64>,
    pub collaborators: Vec<(String, usize)>,
    pub tags: Vec<(String, usize)>,
}

/// Counts sorted by count (descending), then name.
fn ranked(counts: HashMap<String, usize>, limit: Option<usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

impl AnalyticsReport {
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut report = AnalyticsReport {
            discovered: entries.len(),
            ..Default::default()
        };

        let refined: Vec<(&CatalogEntry, &Refinement)> = entries
            .iter()
            .filter_map(|entry| entry.refinement().map(|refinement| (entry, refinement)))
            .collect();
        report.refined = refined.len();
        report.rejected = entries.iter().filter(|e| e.stage() == Stage::Rejected).count();
        report.unprocessed = report.discovered - report.refined - report.rejected;

        let mut genres = HashMap::new();
        let mut statuses = HashMap::new();
        let mut collaborators = HashMap::new();
        let mut tags = HashMap::new();
        let mut completion: BTreeMap<ToolFamily, ToolCompletion> = BTreeMap::new();
        let mut rating_sum = 0u32;
        let mut rated = 0u32;

        for (entry, refinement) in &refined {
            if let Some(created) = entry.artifact.created_at {
                *report.monthly.entry(created.format("%Y-%m").to_string()).or_insert(0) += 1;
                report.date_range = Some(match report.date_range {
                    Some((earliest, latest)) => (earliest.min(created), latest.max(created)),
                    None => (created, created),
                });
            }

            if let Some(genre) = &refinement.genre {
                *genres.entry(genre.clone()).or_insert(0) += 1;
            }
            *statuses.entry(refinement.status.clone()).or_insert(0) += 1;

            let tool = completion
                .entry(entry.tool_family())
                .or_insert_with(|| ToolCompletion {
                    tool_family: entry.tool_family(),
                    total: 0,
                    completed: 0,
                });
            tool.total += 1;
            if refinement.status.eq_ignore_ascii_case(DEFAULT_STATUS) {
                tool.completed += 1;
            }

            if let Some(rating) = refinement.rating {
                report.rating_histogram[usize::from(rating.value() - 1)] += 1;
                rating_sum += u32::from(rating.value());
                rated += 1;
            }

            if let Some(collaboration) = &refinement.collaboration {
                for name in collaboration.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    *collaborators.entry(name.to_string()).or_insert(0) += 1;
                }
            }
            for tag in &refinement.tags {
                *tags.entry(tag.clone()).or_insert(0) += 1;
            }
        }

        report.genres = ranked(genres, None);
        report.statuses = ranked(statuses, None);
        report.collaborators = ranked(collaborators, Some(TOP_COLLABORATORS));
        report.tags = ranked(tags, Some(TOP_TAGS));
        report.average_rating = (rated > 0).then(|| f64::from(rating_sum) / f64::from(rated));

        let mut completion: Vec<ToolCompletion> = completion.into_values().collect();
        completion.sort_by(|a, b| b.rate().total_cmp(&a.rate()));
        report.completion = completion;

        report
    }

    /// Share of discovered projects that have been refined, in percent.
    pub fn processing_rate(&self) -> f64 {
        if self.discovered == 0 {
            0.0
        } else {
            self.refined as f64 / self.discovered as f64 * 100.0
        }
    }
}

fn write_ranked(f: &mut fmt::Formatter<'_>, heading: &str, rows: &[(String, usize)]) -> fmt::Result {
    writeln!(f, "\n{}", heading)?;
    if rows.is_empty() {
        return writeln!(f, "   (none)");
    }
    for (name, count) in rows {
        writeln!(f, "   {:<24} {}", name, count)?;
    }
    Ok(())
}

impl fmt::Display for AnalyticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Overview")?;
        writeln!(f, "   Total projects discovered: {}", self.discovered)?;
        writeln!(f, "   Refined:     {}", self.refined)?;
        writeln!(f, "   Rejected:    {}", self.rejected)?;
        writeln!(f, "   Unprocessed: {}", self.unprocessed)?;
        writeln!(f, "   Processing rate: {:.1}%", self.processing_rate())?;
        if let Some((earliest, latest)) = self.date_range {
            writeln!(
                f,
                "   Date range: {} to {}",
                earliest.format("%Y-%m-%d"),
                latest.format("%Y-%m-%d")
            )?;
        }

        writeln!(f, "\nMonthly productivity")?;
        if self.monthly.is_empty() {
            writeln!(f, "   (none)")?;
        }
        for (month, count) in &self.monthly {
            writeln!(f, "   {}  {:<4} {}", month, count, "#".repeat(*count))?;
        }

        write_ranked(f, "Genres", &self.genres)?;
        write_ranked(f, "Status funnel", &self.statuses)?;

        writeln!(f, "\nCompletion rate by DAW")?;
        if self.completion.is_empty() {
            writeln!(f, "   (none)")?;
        }
        for tool in &self.completion {
            writeln!(
                f,
                "   {:<12} {:>3}/{:<3} {:.1}%",
                tool.tool_family.display_name(),
                tool.completed,
                tool.total,
                tool.rate()
            )?;
        }

        writeln!(f, "\nRatings")?;
        match self.average_rating {
            Some(average) => writeln!(f, "   Average: {:.1}", average)?,
            None => writeln!(f, "   (no rated projects)")?,
        }
        for (index, count) in self.rating_histogram.iter().enumerate().filter(|(_, c)| **c > 0) {
            writeln!(f, "   {:>2}  {:<4} {}", index + 1, count, "#".repeat(*count))?;
        }

        write_ranked(f, "Top collaborators", &self.collaborators)?;
        write_ranked(f, "Most used tags", &self.tags)
    }
}
