use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// The authoring tool a project artifact belongs to.
///
/// Every per-family rule (extension, title policy, packaging) hangs off this enum,
/// so supporting another DAW means adding a variant and filling in the matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolFamily {
    FlStudio,
    LogicPro,
    StudioOne,
    Bitwig,
}

/// How a family's canonical title is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitlePolicy {
    /// File stem, always.
    Stem,
    /// Parent folder name, always.
    Folder,
    /// Parent folder name when the folder is dedicated to this project, else stem.
    FolderWhenDedicated,
}

impl ToolFamily {
    pub const ALL: [ToolFamily; 4] = [
        ToolFamily::FlStudio,
        ToolFamily::LogicPro,
        ToolFamily::StudioOne,
        ToolFamily::Bitwig,
    ];

    /// Lowercase extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ToolFamily::FlStudio => "flp",
            ToolFamily::LogicPro => "logicx",
            ToolFamily::StudioOne => "song",
            ToolFamily::Bitwig => "bwproject",
        }
    }

    /// Case-insensitive lookup by extension (no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.extension().eq_ignore_ascii_case(ext))
    }

    /// Family of a file name, judged by its final extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    pub fn title_policy(self) -> TitlePolicy {
        match self {
            ToolFamily::FlStudio => TitlePolicy::Stem,
            ToolFamily::LogicPro => TitlePolicy::FolderWhenDedicated,
            ToolFamily::StudioOne | ToolFamily::Bitwig => TitlePolicy::Folder,
        }
    }

    /// Families whose project is a directory bundle rather than a single file.
    pub fn is_package(self) -> bool {
        matches!(self, ToolFamily::LogicPro)
    }

    /// Stable identifier used in storage and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolFamily::FlStudio => "fl-studio",
            ToolFamily::LogicPro => "logic-pro",
            ToolFamily::StudioOne => "studio-one",
            ToolFamily::Bitwig => "bitwig",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ToolFamily::FlStudio => "FL Studio",
            ToolFamily::LogicPro => "Logic Pro",
            ToolFamily::StudioOne => "Studio One",
            ToolFamily::Bitwig => "Bitwig",
        }
    }
}

impl fmt::Display for ToolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ToolFamily {
    type Err = CatalogError;

    /// Accepts the storage id, the display name, the extension, and a few short forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .trim_start_matches('.')
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "flstudio" | "fl" | "flp" => Ok(ToolFamily::FlStudio),
            "logicpro" | "logic" | "logicx" => Ok(ToolFamily::LogicPro),
            "studioone" | "s1" | "song" => Ok(ToolFamily::StudioOne),
            "bitwig" | "bitwigstudio" | "bwproject" => Ok(ToolFamily::Bitwig),
            _ => Err(CatalogError::Parse(format!(
                "Unknown DAW '{}' (expected one of: fl-studio, logic-pro, studio-one, bitwig)",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        assert_eq!(ToolFamily::from_extension("FLP"), Some(ToolFamily::FlStudio));
        assert_eq!(ToolFamily::from_extension("LogicX"), Some(ToolFamily::LogicPro));
        assert_eq!(ToolFamily::from_extension("song"), Some(ToolFamily::StudioOne));
        assert_eq!(ToolFamily::from_extension("BWPROJECT"), Some(ToolFamily::Bitwig));
        assert_eq!(ToolFamily::from_extension("wav"), None);
    }

    #[test]
    fn test_from_file_name_uses_final_extension() {
        assert_eq!(ToolFamily::from_file_name("Track1.flp"), Some(ToolFamily::FlStudio));
        assert_eq!(ToolFamily::from_file_name("My.Song.song"), Some(ToolFamily::StudioOne));
        assert_eq!(ToolFamily::from_file_name("Track1.flp.bak"), None);
        assert_eq!(ToolFamily::from_file_name("README"), None);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("FL Studio".parse::<ToolFamily>().unwrap(), ToolFamily::FlStudio);
        assert_eq!("logic-pro".parse::<ToolFamily>().unwrap(), ToolFamily::LogicPro);
        assert_eq!("s1".parse::<ToolFamily>().unwrap(), ToolFamily::StudioOne);
        assert_eq!(".bwproject".parse::<ToolFamily>().unwrap(), ToolFamily::Bitwig);
        assert!("ableton".parse::<ToolFamily>().is_err());
    }

    #[test]
    fn test_storage_id_round_trips() {
        for family in ToolFamily::ALL {
            assert_eq!(family.as_str().parse::<ToolFamily>().unwrap(), family);
        }
    }
}
