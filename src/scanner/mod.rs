//! Filesystem side of discovery: classifying paths, resolving titles and walking trees.

pub mod classifier;
pub mod discovery;
pub mod title;

pub use classifier::{classify, is_backup_dir_name, is_versioned_name, Classification, SkipReason};
pub use discovery::{ProjectWalker, WalkOptions, WalkStats};
pub use title::{resolve_title, ResolvedTitle};
