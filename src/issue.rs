use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::Error;
use crate::github;
use crate::types::RepoRef;

/// Submits issues; implemented over `gh issue create` in production and by
/// counters in tests
#[allow(async_fn_in_trait)]
pub trait IssueSubmitter {
    async fn submit(
        &mut self,
        title: &str,
        body: &str,
        labels: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<String>;
}

/// Real submitter backed by the gh CLI
pub struct GhIssueSubmitter {
    pub repo: RepoRef,
}

impl IssueSubmitter for GhIssueSubmitter {
    async fn submit(
        &mut self,
        title: &str,
        body: &str,
        labels: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<String> {
        github::create_issue(&self.repo, title, body, labels, assignee).await
    }
}

/// Derive the issue title from a file name: extension stripped, `-`/`_`
/// replaced by spaces, first character upper-cased.
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let spaced = stem.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

/// Create an issue from a local file. The file contents become the body
/// verbatim; a missing file fails before any remote call.
pub async fn create_issue_from_file<S: IssueSubmitter>(
    submitter: &mut S,
    path: &Path,
    labels: &[String],
    assignee: Option<&str>,
) -> Result<String, Error> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .map_err(Error::IssueCreate)?;

    let title = title_from_path(path);
    let labels = if labels.is_empty() {
        None
    } else {
        Some(labels.join(","))
    };

    submitter
        .submit(&title, &body, labels.as_deref(), assignee)
        .await
        .map_err(Error::IssueCreate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Submitter that records calls instead of talking to the network
    struct RecordingSubmitter {
        calls: usize,
        last_title: Option<String>,
        last_body: Option<String>,
        last_labels: Option<String>,
        last_assignee: Option<String>,
    }

    impl RecordingSubmitter {
        fn new() -> Self {
            Self {
                calls: 0,
                last_title: None,
                last_body: None,
                last_labels: None,
                last_assignee: None,
            }
        }
    }

    impl IssueSubmitter for RecordingSubmitter {
        async fn submit(
            &mut self,
            title: &str,
            body: &str,
            labels: Option<&str>,
            assignee: Option<&str>,
        ) -> Result<String> {
            self.calls += 1;
            self.last_title = Some(title.to_string());
            self.last_body = Some(body.to_string());
            self.last_labels = labels.map(|l| l.to_string());
            self.last_assignee = assignee.map(|a| a.to_string());
            Ok("https://example.invalid/issues/1".to_string())
        }
    }

    #[test]
    fn title_strips_extension_and_separators() {
        assert_eq!(
            title_from_path(Path::new("fix_login-bug.md")),
            "Fix login bug"
        );
    }

    #[test]
    fn title_from_nested_path() {
        assert_eq!(
            title_from_path(Path::new("notes/todo/add_dark_mode.md")),
            "Add dark mode"
        );
    }

    #[test]
    fn title_without_extension() {
        assert_eq!(title_from_path(Path::new("cleanup-tasks")), "Cleanup tasks");
    }

    #[test]
    fn title_already_capitalized() {
        assert_eq!(title_from_path(Path::new("Readme-fixes.md")), "Readme fixes");
    }

    #[test]
    fn title_single_char() {
        assert_eq!(title_from_path(Path::new("x.md")), "X");
    }

    #[tokio::test]
    async fn missing_file_fails_before_any_remote_call() {
        let mut submitter = RecordingSubmitter::new();
        let path = PathBuf::from("/nonexistent/definitely-not-here.md");

        let err = create_issue_from_file(&mut submitter, &path, &[], None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::FileNotFound(_)));
        assert_eq!(submitter.calls, 0);
    }

    #[tokio::test]
    async fn body_is_verbatim_file_contents() {
        let dir = std::env::temp_dir().join("prq-issue-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fix_login-bug.md");
        std::fs::write(&path, "## Steps\n1. log in\n").unwrap();

        let mut submitter = RecordingSubmitter::new();
        let url = create_issue_from_file(
            &mut submitter,
            &path,
            &["bug".to_string(), "auth".to_string()],
            Some("@me"),
        )
        .await
        .unwrap();

        assert_eq!(url, "https://example.invalid/issues/1");
        assert_eq!(submitter.calls, 1);
        assert_eq!(submitter.last_title.as_deref(), Some("Fix login bug"));
        assert_eq!(submitter.last_body.as_deref(), Some("## Steps\n1. log in\n"));
        assert_eq!(submitter.last_labels.as_deref(), Some("bug,auth"));
        assert_eq!(submitter.last_assignee.as_deref(), Some("@me"));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn no_labels_passes_none() {
        let dir = std::env::temp_dir().join("prq-issue-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("small_note.md");
        std::fs::write(&path, "note").unwrap();

        let mut submitter = RecordingSubmitter::new();
        create_issue_from_file(&mut submitter, &path, &[], None)
            .await
            .unwrap();

        assert_eq!(submitter.last_labels, None);
        assert_eq!(submitter.last_assignee, None);

        let _ = std::fs::remove_file(&path);
    }
}
