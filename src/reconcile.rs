//! Deciding which discovered artifacts are new to the catalog.
//!
//! Titles are compared exactly (case-sensitive). The first artifact in walk order to
//! claim a title wins; later ones with the same title count as duplicates.

use std::collections::HashSet;

use crate::types::ProjectArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Duplicate,
}

/// Title bookkeeping for one discovery run.
#[derive(Debug, Default)]
pub struct Reconciler {
    existing: HashSet<String>,
    claimed: HashSet<String>,
}

impl Reconciler {
    /// Start from the titles already in the store.
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            existing: existing.into_iter().map(Into::into).collect(),
            claimed: HashSet::new(),
        }
    }

    /// Admit an artifact. An accepted artifact claims its title for the rest of the run.
    pub fn admit(&mut self, artifact: &ProjectArtifact) -> Admission {
        if self.existing.contains(&artifact.title) || self.claimed.contains(&artifact.title) {
            return Admission::Duplicate;
        }
        self.claimed.insert(artifact.title.clone());
        Admission::Accept
    }

    pub fn claimed(&self) -> usize {
        self.claimed.len()
    }
}

/// Outcome of reconciling a whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub to_insert: Vec<ProjectArtifact>,
    pub duplicates: usize,
}

/// Reconcile a batch of artifacts against the titles already in the store.
pub fn reconcile<I, S>(artifacts: impl IntoIterator<Item = ProjectArtifact>, existing: I) -> Reconciliation
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut reconciler = Reconciler::new(existing);
    let mut outcome = Reconciliation::default();

    for artifact in artifacts {
        match reconciler.admit(&artifact) {
            Admission::Accept => outcome.to_insert.push(artifact),
            Admission::Duplicate => outcome.duplicates += 1,
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolFamily;
    use proptest::prelude::*;

    fn artifact(path: &str, title: &str) -> ProjectArtifact {
        ProjectArtifact::new(path, ToolFamily::FlStudio, title)
    }

    #[test]
    fn test_existing_titles_are_duplicates() {
        let outcome = reconcile(
            vec![artifact("/a/Track1.flp", "Track1"), artifact("/a/Track2.flp", "Track2")],
            vec!["Track1"],
        );
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.to_insert.len(), 1);
        assert_eq!(outcome.to_insert[0].title, "Track2");
    }

    #[test]
    fn test_first_in_walk_order_wins() {
        let outcome = reconcile(
            vec![
                artifact("/a/Track1.flp", "Track1"),
                artifact("/b/Track1.flp", "Track1"),
                artifact("/c/Track1.flp", "Track1"),
            ],
            Vec::<String>::new(),
        );
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(outcome.to_insert.len(), 1);
        assert_eq!(outcome.to_insert[0].path, std::path::PathBuf::from("/a/Track1.flp"));
    }

    #[test]
    fn test_titles_compare_case_sensitively() {
        let outcome = reconcile(
            vec![artifact("/a/track1.flp", "track1")],
            vec!["Track1"],
        );
        assert_eq!(outcome.duplicates, 0);
        assert_eq!(outcome.to_insert.len(), 1);
    }

    #[test]
    fn test_accepted_title_is_claimed() {
        let mut reconciler = Reconciler::new(Vec::<String>::new());
        let first = artifact("/a/Track1.flp", "Track1");
        assert_eq!(reconciler.admit(&first), Admission::Accept);
        assert_eq!(reconciler.admit(&first), Admission::Duplicate);
        assert_eq!(reconciler.claimed(), 1);
    }

    proptest! {
        #[test]
        fn prop_accepted_titles_are_unique(titles in prop::collection::vec("[a-c]{1,2}", 0..30)) {
            let artifacts: Vec<ProjectArtifact> = titles
                .iter()
                .enumerate()
                .map(|(i, title)| artifact(&format!("/p/{}.flp", i), title))
                .collect();
            let outcome = reconcile(artifacts, Vec::<String>::new());

            let unique: std::collections::HashSet<&str> =
                outcome.to_insert.iter().map(|a| a.title.as_str()).collect();
            prop_assert_eq!(unique.len(), outcome.to_insert.len());
            prop_assert_eq!(outcome.to_insert.len() + outcome.duplicates, titles.len());
        }
    }
}
