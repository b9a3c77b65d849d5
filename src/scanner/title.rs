//! Canonical title derivation per tool family.

use std::path::Path;

use crate::types::{TitlePolicy, ToolFamily};

/// A title and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTitle {
    pub title: String,
    /// True when the parent folder name was used, i.e. the folder is the project folder.
    pub from_folder: bool,
}

/// File name with the family's extension removed (case-insensitive).
pub fn file_stem(name: &str, family: ToolFamily) -> &str {
    let ext = family.extension();
    let cut = name.len().saturating_sub(ext.len() + 1);
    match name.get(cut..) {
        Some(tail) if tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(ext) => &name[..cut],
        _ => name,
    }
}

/// A folder counts as dedicated to a project package when it carries exactly the
/// package's name, or when the package is its only visible entry.
fn is_dedicated_folder(package_name: &str, stem: &str, folder_name: &str, siblings: &[String]) -> bool {
    if folder_name == stem {
        return true;
    }
    !siblings
        .iter()
        .any(|sibling| sibling != package_name && !sibling.starts_with('.'))
}

/// Resolve the canonical title of an accepted artifact.
///
/// `siblings` are the entry names of the artifact's parent directory; the artifact
/// itself may be among them. Returns `None` when neither the folder name nor the file
/// stem yields a non-blank title.
pub fn resolve(path: &Path, family: ToolFamily, siblings: &[String]) -> Option<ResolvedTitle> {
    let name = path.file_name()?.to_string_lossy();
    let stem = file_stem(&name, family);
    let folder = path
        .parent()
        .and_then(Path::file_name)
        .map(|folder| folder.to_string_lossy().into_owned())
        .unwrap_or_default();

    let use_folder = match family.title_policy() {
        TitlePolicy::Stem => false,
        TitlePolicy::Folder => true,
        TitlePolicy::FolderWhenDedicated => is_dedicated_folder(&name, stem, &folder, siblings),
    };

    // Whitespace only decides blankness; titles keep their exact spelling
    if use_folder && !folder.trim().is_empty() {
        return Some(ResolvedTitle {
            title: folder,
            from_folder: true,
        });
    }

    if stem.trim().is_empty() {
        return None;
    }
    Some(ResolvedTitle {
        title: stem.to_string(),
        from_folder: false,
    })
}

/// Title-only form of [`resolve`].
pub fn resolve_title(path: &Path, family: ToolFamily, siblings: &[String]) -> Option<String> {
    resolve(path, family, siblings).map(|resolved| resolved.title)
}
