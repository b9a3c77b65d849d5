pub mod artifact;
pub mod entry;
pub mod tool;

pub use artifact::ProjectArtifact;
pub use entry::{
    parse_tags, CatalogEntry, CatalogStats, Rating, RefineRequest, Refinement, Rejection, Stage,
    StageState, DEFAULT_REJECTION_REASON, DEFAULT_STATUS,
};
pub use tool::{TitlePolicy, ToolFamily};
