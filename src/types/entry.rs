use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::artifact::ProjectArtifact;
use super::tool::ToolFamily;
use crate::error::{CatalogError, Result};

pub const DEFAULT_STATUS: &str = "complete";
pub const DEFAULT_REJECTION_REASON: &str = "Not useful";

/// Lifecycle stage of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Raw,
    Refined,
    Rejected,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Raw, Stage::Refined, Stage::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Refined => "refined",
            Stage::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "unprocessed" => Ok(Stage::Raw),
            "refined" => Ok(Stage::Refined),
            "rejected" => Ok(Stage::Rejected),
            other => Err(CatalogError::Parse(format!(
                "Unknown stage '{}' (expected raw, refined or rejected)",
                other
            ))),
        }
    }
}

/// A 1-10 rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = CatalogError;

    fn try_from(value: u8) -> Result<Self> {
        if (1..=10).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(CatalogError::InvalidRating(value))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

/// Curated metadata attached when a raw entry is refined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub description: Option<String>,
    pub genre: Option<String>,
    pub bpm: Option<u32>,
    pub key: Option<String>,
    pub year: Option<i32>,
    pub status: String,
    pub rating: Option<Rating>,
    pub tags: BTreeSet<String>,
    pub collaboration: Option<String>,
    pub refined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

/// Stage plus the fields that only exist in that stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum StageState {
    Raw,
    Refined(Refinement),
    Rejected(Rejection),
}

impl StageState {
    pub fn stage(&self) -> Stage {
        match self {
            StageState::Raw => Stage::Raw,
            StageState::Refined(_) => Stage::Refined,
            StageState::Rejected(_) => Stage::Rejected,
        }
    }
}

/// A persisted project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    #[serde(flatten)]
    pub artifact: ProjectArtifact,
    pub discovered_at: DateTime<Utc>,
    pub state: StageState,
}

impl CatalogEntry {
    pub fn title(&self) -> &str {
        &self.artifact.title
    }

    pub fn tool_family(&self) -> ToolFamily {
        self.artifact.tool_family
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn refinement(&self) -> Option<&Refinement> {
        match &self.state {
            StageState::Refined(refinement) => Some(refinement),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match &self.state {
            StageState::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Timestamp the stage listing is ordered by.
    pub fn stage_timestamp(&self) -> DateTime<Utc> {
        match &self.state {
            StageState::Raw => self.discovered_at,
            StageState::Refined(refinement) => refinement.refined_at,
            StageState::Rejected(rejection) => rejection.rejected_at,
        }
    }

    /// Fails with `InvalidState` unless the entry is still raw.
    pub fn ensure_raw(&self) -> Result<()> {
        match self.stage() {
            Stage::Raw => Ok(()),
            stage => Err(CatalogError::InvalidState { id: self.id, stage }),
        }
    }
}

/// Metadata submitted with a refine transition. Unset fields stay empty,
/// except `status` and `year` which fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefineRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub bpm: Option<u32>,
    pub key: Option<String>,
    pub year: Option<i32>,
    pub status: Option<String>,
    pub rating: Option<u8>,
    pub tags: Vec<String>,
    pub collaboration: Option<String>,
}

impl RefineRequest {
    /// Replacement title, trimmed. `None` keeps the discovered title.
    pub fn new_title(&self) -> Result<Option<String>> {
        match &self.title {
            None => Ok(None),
            Some(title) => {
                let trimmed = title.trim();
                if trimmed.is_empty() {
                    Err(CatalogError::InvalidTitle)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
        }
    }

    /// Validate and build the refinement for an entry created at `created_at`.
    pub fn to_refinement(
        &self,
        created_at: Option<DateTime<Utc>>,
        refined_at: DateTime<Utc>,
    ) -> Result<Refinement> {
        let rating = self.rating.map(Rating::try_from).transpose()?;
        let status = non_blank(self.status.as_deref()).unwrap_or_else(|| DEFAULT_STATUS.to_string());

        Ok(Refinement {
            description: non_blank(self.description.as_deref()),
            genre: non_blank(self.genre.as_deref()),
            bpm: self.bpm,
            key: non_blank(self.key.as_deref()),
            year: self.year.or_else(|| created_at.map(|created| created.year())),
            status,
            rating,
            tags: self
                .tags
                .iter()
                .map(|tag| tag.trim())
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
            collaboration: non_blank(self.collaboration.as_deref()),
            refined_at,
        })
    }
}

/// Split a comma-separated tag list.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Counts per stage, and per tool family within the refined stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub raw: usize,
    pub refined: usize,
    pub rejected: usize,
    pub refined_by_tool: BTreeMap<ToolFamily, usize>,
}

impl CatalogStats {
    pub fn total(&self) -> usize {
        self.raw + self.refined + self.rejected
    }

    pub fn count(&self, stage: Stage) -> usize {
        match stage {
            Stage::Raw => self.raw,
            Stage::Refined => self.refined,
            Stage::Rejected => self.rejected,
        }
    }

    pub(crate) fn record(&mut self, stage: Stage, tool_family: ToolFamily, count: usize) {
        match stage {
            Stage::Raw => self.raw += count,
            Stage::Refined => {
                self.refined += count;
                *self.refined_by_tool.entry(tool_family).or_insert(0) += count;
            }
            Stage::Rejected => self.rejected += count,
        }
    }
}
