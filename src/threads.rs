use anyhow::Result;
use serde::Deserialize;

use crate::error::Error;
use crate::github;
use crate::types::{PrRef, ReviewThread, ThreadComment};

/// Threads fetched per GraphQL page (the API's practical maximum)
const PAGE_SIZE: u32 = 100;

/// GraphQL query for one page of review threads
const THREADS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $pr: Int!, $pageSize: Int!, $cursor: String) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $pr) {
      reviewThreads(first: $pageSize, after: $cursor) {
        nodes {
          id
          isResolved
          isOutdated
          path
          line
          originalLine
          startLine
          originalStartLine
          comments(first: 100) {
            nodes {
              author { login }
              body
              createdAt
              updatedAt
              url
            }
          }
        }
        pageInfo {
          hasNextPage
          endCursor
        }
      }
    }
  }
}
"#;

/// One page of review threads plus its pagination state
#[derive(Debug, Clone)]
pub struct ThreadPage {
    pub threads: Vec<ReviewThread>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Source of thread pages; implemented over `gh api graphql` in production
/// and by fixtures in tests
#[allow(async_fn_in_trait)]
pub trait ThreadPageSource {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<ThreadPage>;
}

/// Collect all review threads from a page source, filtering resolved ones
/// unless `include_resolved` is set.
///
/// Pagination is strictly sequential: the next request carries the previous
/// page's end cursor. A failed page aborts with the page index reached.
pub async fn collect_threads<S: ThreadPageSource>(
    source: &mut S,
    include_resolved: bool,
) -> Result<Vec<ReviewThread>, Error> {
    let mut all = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page = 0usize;

    loop {
        let fetched = source
            .fetch_page(cursor.as_deref())
            .await
            .map_err(|cause| Error::ThreadFetch { page, cause })?;

        all.extend(
            fetched
                .threads
                .into_iter()
                .filter(|t| include_resolved || !t.is_resolved),
        );

        if !fetched.has_next_page {
            break;
        }
        cursor = fetched.end_cursor;
        page += 1;
    }

    Ok(all)
}

// GraphQL response structures
#[derive(Deserialize)]
struct ThreadsData {
    repository: Option<RepositoryData>,
}

#[derive(Deserialize)]
struct RepositoryData {
    #[serde(rename = "pullRequest")]
    pull_request: Option<PullRequestData>,
}

#[derive(Deserialize)]
struct PullRequestData {
    #[serde(rename = "reviewThreads")]
    review_threads: ReviewThreadsConnection,
}

#[derive(Deserialize)]
struct ReviewThreadsConnection {
    nodes: Vec<ThreadNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ThreadNode {
    id: String,
    #[serde(rename = "isResolved")]
    is_resolved: bool,
    #[serde(rename = "isOutdated")]
    is_outdated: bool,
    path: Option<String>,
    line: Option<u32>,
    #[serde(rename = "originalLine")]
    original_line: Option<u32>,
    #[serde(rename = "startLine")]
    start_line: Option<u32>,
    #[serde(rename = "originalStartLine")]
    original_start_line: Option<u32>,
    comments: CommentsConnection,
}

#[derive(Deserialize)]
struct CommentsConnection {
    nodes: Vec<CommentNode>,
}

#[derive(Deserialize)]
struct CommentNode {
    author: Option<AuthorNode>,
    body: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(rename = "updatedAt")]
    updated_at: String,
    url: String,
}

#[derive(Deserialize)]
struct AuthorNode {
    login: String,
}

impl ThreadNode {
    fn into_thread(self) -> ReviewThread {
        ReviewThread {
            id: self.id,
            is_resolved: self.is_resolved,
            is_outdated: self.is_outdated,
            path: self.path,
            line: self.line,
            original_line: self.original_line,
            start_line: self.start_line,
            original_start_line: self.original_start_line,
            comments: self
                .comments
                .nodes
                .into_iter()
                .map(|c| ThreadComment {
                    author: c
                        .author
                        .map(|a| a.login)
                        .unwrap_or_else(|| "ghost".to_string()),
                    body: c.body,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                    url: c.url,
                })
                .collect(),
        }
    }
}

/// Real page source backed by `gh api graphql`
pub struct GhThreadPages {
    pr: PrRef,
}

impl GhThreadPages {
    pub fn new(pr: PrRef) -> Self {
        Self { pr }
    }
}

impl ThreadPageSource for GhThreadPages {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<ThreadPage> {
        let mut text_vars = vec![
            ("owner", self.pr.repo.owner.as_str()),
            ("repo", self.pr.repo.name.as_str()),
        ];
        if let Some(c) = cursor {
            text_vars.push(("cursor", c));
        }
        let int_vars = [
            ("pr", u64::from(self.pr.number)),
            ("pageSize", u64::from(PAGE_SIZE)),
        ];

        let data: ThreadsData = github::graphql(THREADS_QUERY, &text_vars, &int_vars).await?;

        let connection = data
            .repository
            .and_then(|r| r.pull_request)
            .map(|pr| pr.review_threads)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "PR not found: {}#{}",
                    self.pr.repo.full_name(),
                    self.pr.number
                )
            })?;

        Ok(ThreadPage {
            threads: connection
                .nodes
                .into_iter()
                .map(ThreadNode::into_thread)
                .collect(),
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }
}

/// Fetch all review threads for a PR
pub async fn list_threads(pr: &PrRef, include_resolved: bool) -> Result<Vec<ReviewThread>, Error> {
    let mut source = GhThreadPages::new(pr.clone());
    collect_threads(&mut source, include_resolved).await
}
