use serde::{Deserialize, Serialize};

/// A resolved repository reference (owner/name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Full repository name (owner/repo)
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A fully resolved pull request reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRef {
    pub repo: RepoRef,
    pub number: u32,
}

/// A single comment inside a review thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadComment {
    /// Author login; "ghost" when the account was deleted
    pub author: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
    pub url: String,
}

/// A review thread on a PR, anchored to a file/line or general
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewThread {
    pub id: String,
    pub is_resolved: bool,
    pub is_outdated: bool,
    pub path: Option<String>,
    pub line: Option<u32>,
    pub original_line: Option<u32>,
    pub start_line: Option<u32>,
    pub original_start_line: Option<u32>,
    pub comments: Vec<ThreadComment>,
}

impl ReviewThread {
    /// The line to display: first anchor field that is still populated
    pub fn display_line(&self) -> Option<u32> {
        self.line
            .or(self.original_line)
            .or(self.start_line)
            .or(self.original_start_line)
    }

    /// Location label, e.g. "src/main.rs:42" or "general"
    pub fn location(&self) -> String {
        match &self.path {
            Some(path) => match self.display_line() {
                Some(line) => format!("{}:{}", path, line),
                None => format!("{}:n/a", path),
            },
            None => "general".to_string(),
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

/// An inline review comment fetched via the REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: u64,
    pub body: String,
    pub user: Option<CommentUser>,
    pub path: String,
    pub line: Option<u32>,
    pub created_at: String,
    pub updated_at: String,
    pub html_url: String,
}

impl ReviewComment {
    /// Author login; "ghost" when the account was deleted
    pub fn author(&self) -> &str {
        self.user.as_ref().map(|u| u.login.as_str()).unwrap_or("ghost")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentUser {
    pub login: String,
}

/// A commit on a PR, as returned by `gh pr view --json commits`
#[derive(Debug, Clone, Deserialize)]
pub struct PrCommit {
    pub oid: String,
    #[serde(rename = "committedDate")]
    pub committed_date: String,
}

/// Summary details for a PR, shown by the interactive menu
#[derive(Debug, Clone)]
pub struct PrDetails {
    pub number: u32,
    pub title: String,
    pub state: String,
    pub author: String,
    pub url: String,
    pub review_decision: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_with_lines(
        line: Option<u32>,
        original_line: Option<u32>,
        start_line: Option<u32>,
        original_start_line: Option<u32>,
    ) -> ReviewThread {
        ReviewThread {
            id: "T1".to_string(),
            is_resolved: false,
            is_outdated: false,
            path: Some("src/lib.rs".to_string()),
            line,
            original_line,
            start_line,
            original_start_line,
            comments: vec![],
        }
    }

    #[test]
    fn display_line_prefers_line() {
        let t = thread_with_lines(Some(10), Some(20), Some(30), Some(40));
        assert_eq!(t.display_line(), Some(10));
    }

    #[test]
    fn display_line_falls_back_to_start_line() {
        let t = thread_with_lines(None, None, Some(5), None);
        assert_eq!(t.display_line(), Some(5));
    }

    #[test]
    fn display_line_all_null() {
        let t = thread_with_lines(None, None, None, None);
        assert_eq!(t.display_line(), None);
    }

    #[test]
    fn display_line_original_line_before_start_line() {
        let t = thread_with_lines(None, Some(7), Some(3), None);
        assert_eq!(t.display_line(), Some(7));
    }

    #[test]
    fn location_with_line() {
        let t = thread_with_lines(Some(42), None, None, None);
        assert_eq!(t.location(), "src/lib.rs:42");
    }

    #[test]
    fn location_without_line_uses_sentinel() {
        let t = thread_with_lines(None, None, None, None);
        assert_eq!(t.location(), "src/lib.rs:n/a");
    }

    #[test]
    fn location_general_thread() {
        let mut t = thread_with_lines(None, None, None, None);
        t.path = None;
        assert_eq!(t.location(), "general");
    }

    #[test]
    fn review_comment_author_deleted_account() {
        let c = ReviewComment {
            id: 1,
            body: "hi".to_string(),
            user: None,
            path: "src/lib.rs".to_string(),
            line: Some(1),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            html_url: "https://example.invalid".to_string(),
        };
        assert_eq!(c.author(), "ghost");
    }

    #[test]
    fn repo_full_name() {
        let repo = RepoRef {
            owner: "octocat".to_string(),
            name: "hello-world".to_string(),
        };
        assert_eq!(repo.full_name(), "octocat/hello-world");
    }
}
