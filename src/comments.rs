use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset};

use crate::error::Error;
use crate::github;
use crate::types::{PrRef, ReviewComment};

/// Resolve the cutoff timestamp: an explicit `--since` value, or the
/// committed date of the last commit on the PR.
pub async fn resolve_since(pr: &PrRef, since: Option<&str>) -> Result<DateTime<FixedOffset>, Error> {
    match since {
        Some(raw) => parse_timestamp(raw)
            .map_err(|e| Error::TimestampResolution(format!("invalid --since value: {}", e))),
        None => {
            let commits = github::fetch_pr_commits(pr)
                .await
                .map_err(|e| Error::TimestampResolution(e.to_string()))?;
            last_commit_cutoff(&commits)
        }
    }
}

/// Cutoff from a PR's commit list: the committed date of the last entry
fn last_commit_cutoff(commits: &[crate::types::PrCommit]) -> Result<DateTime<FixedOffset>, Error> {
    let last = commits
        .last()
        .ok_or_else(|| Error::TimestampResolution("PR has no commits".to_string()))?;

    parse_timestamp(&last.committed_date).map_err(|e| {
        Error::TimestampResolution(format!(
            "commit {} has an unparseable date: {}",
            last.oid, e
        ))
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("expected an RFC 3339 timestamp, got '{}'", raw))
}

/// Keep comments updated strictly after the cutoff, sorted ascending by
/// update time.
///
/// `updated_at` is used deliberately: a comment created before the cutoff
/// commit but edited after it still needs attention.
pub fn filter_since(
    comments: Vec<ReviewComment>,
    cutoff: DateTime<FixedOffset>,
) -> Result<Vec<ReviewComment>> {
    let mut keyed: Vec<(DateTime<FixedOffset>, ReviewComment)> = Vec::new();
    for comment in comments {
        let updated = parse_timestamp(&comment.updated_at)
            .map_err(|e| anyhow!("comment {}: {}", comment.id, e))?;
        if updated > cutoff {
            keyed.push((updated, comment));
        }
    }

    keyed.sort_by_key(|(updated, _)| *updated);
    Ok(keyed.into_iter().map(|(_, c)| c).collect())
}

/// Fetch review comments on a PR updated strictly after the cutoff
pub async fn list_comments_since(
    pr: &PrRef,
    cutoff: DateTime<FixedOffset>,
) -> Result<Vec<ReviewComment>, Error> {
    let comments = github::fetch_review_comments(pr)
        .await
        .map_err(Error::CommentFetch)?;

    filter_since(comments, cutoff).map_err(Error::CommentFetch)
}
