use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use crate::types::{PrCommit, PrDetails, PrRef, RepoRef, ReviewComment};

/// Log performance timing to file if PRQ_DEBUG is set
#[inline]
pub fn perf_log(operation: &str, elapsed_ms: u128) {
    if std::env::var("PRQ_DEBUG").is_ok() {
        use std::io::Write;
        if let Some(mut path) = dirs::config_dir() {
            path.push("prq");
            path.push("perf.log");
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
            {
                let _ = writeln!(file, "{:>6}ms  {}", elapsed_ms, operation);
            }
        }
    }
}

/// Check if gh CLI is installed and authenticated
pub async fn check_gh_cli() -> Result<()> {
    let start = Instant::now();
    let output = Command::new("gh")
        .args(["auth", "status"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to run 'gh' CLI. Is it installed? (https://cli.github.com)")?;

    perf_log("gh auth status", start.elapsed().as_millis());

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not logged") {
            return Err(anyhow!(
                "Not authenticated with GitHub CLI. Run: gh auth login"
            ));
        }
        return Err(anyhow!("gh auth check failed: {}", stderr));
    }

    Ok(())
}

/// Run gh with the given args and return stdout on success
async fn run_gh(args: &[String], what: &str) -> Result<Vec<u8>> {
    let start = Instant::now();
    let output = Command::new("gh")
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to run gh for {}", what))?;

    perf_log(what, start.elapsed().as_millis());

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} failed: {}", what, stderr.trim()));
    }

    Ok(output.stdout)
}

#[derive(Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Execute a parameterized GraphQL query via `gh api graphql`.
///
/// `text_vars` are passed with -f (string), `int_vars` with -F (typed).
pub async fn graphql<T: DeserializeOwned>(
    query: &str,
    text_vars: &[(&str, &str)],
    int_vars: &[(&str, u64)],
) -> Result<T> {
    let mut args = vec![
        "api".to_string(),
        "graphql".to_string(),
        "-f".to_string(),
        format!("query={}", query),
    ];
    for (key, value) in text_vars {
        args.push("-f".to_string());
        args.push(format!("{}={}", key, value));
    }
    for (key, value) in int_vars {
        args.push("-F".to_string());
        args.push(format!("{}={}", key, value));
    }

    let stdout = run_gh(&args, "gh api graphql").await?;

    let envelope: GraphQlEnvelope<T> =
        serde_json::from_slice(&stdout).context("Failed to parse GraphQL response")?;

    if let Some(errors) = envelope.errors {
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        return Err(anyhow!("GraphQL errors: {}", messages.join(", ")));
    }

    envelope
        .data
        .ok_or_else(|| anyhow!("GraphQL response had no data"))
}

/// Repository metadata for the current working directory, via `gh repo view`
pub async fn view_repo_for_cwd() -> Result<RepoRef> {
    #[derive(Deserialize)]
    struct RepoView {
        name: String,
        owner: RepoOwner,
    }

    #[derive(Deserialize)]
    struct RepoOwner {
        login: String,
    }

    let args: Vec<String> = ["repo", "view", "--json", "owner,name"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let stdout = run_gh(&args, "gh repo view").await?;

    let view: RepoView =
        serde_json::from_slice(&stdout).context("Failed to parse repo view JSON")?;

    Ok(RepoRef {
        owner: view.owner.login,
        name: view.name,
    })
}

/// PR number associated with the current branch, via `gh pr view`
pub async fn view_pr_number_for_branch() -> Result<u32> {
    #[derive(Deserialize)]
    struct PrView {
        number: u32,
    }

    let args: Vec<String> = ["pr", "view", "--json", "number"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let stdout = run_gh(&args, "gh pr view (current branch)").await?;

    let view: PrView = serde_json::from_slice(&stdout).context("Failed to parse PR view JSON")?;
    Ok(view.number)
}

/// Open PR numbers whose head branch matches the given branch name
pub async fn list_pr_numbers_for_head(repo: &RepoRef, branch: &str) -> Result<Vec<u32>> {
    #[derive(Deserialize)]
    struct PrListItem {
        number: u32,
    }

    let args = vec![
        "pr".to_string(),
        "list".to_string(),
        "--repo".to_string(),
        repo.full_name(),
        "--head".to_string(),
        branch.to_string(),
        "--state".to_string(),
        "open".to_string(),
        "--json".to_string(),
        "number".to_string(),
    ];
    let stdout = run_gh(&args, "gh pr list").await?;

    let items: Vec<PrListItem> =
        serde_json::from_slice(&stdout).context("Failed to parse PR list JSON")?;
    Ok(items.into_iter().map(|i| i.number).collect())
}

/// Fetch summary details for a PR
pub async fn fetch_pr_details(pr: &PrRef) -> Result<PrDetails> {
    #[derive(Deserialize)]
    struct PrView {
        number: u32,
        title: String,
        state: String,
        author: Author,
        url: String,
        #[serde(rename = "reviewDecision")]
        review_decision: Option<String>,
    }

    #[derive(Deserialize)]
    struct Author {
        login: String,
    }

    let args = vec![
        "pr".to_string(),
        "view".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
        "--json".to_string(),
        "number,title,state,author,url,reviewDecision".to_string(),
    ];
    let stdout = run_gh(&args, &format!("gh pr view #{}", pr.number)).await?;

    let view: PrView =
        serde_json::from_slice(&stdout).context("Failed to parse PR details JSON")?;

    Ok(PrDetails {
        number: view.number,
        title: view.title,
        state: view.state,
        author: view.author.login,
        url: view.url,
        review_decision: view.review_decision.filter(|d| !d.is_empty()),
    })
}

/// Fetch the commit list for a PR, in the order GitHub returns it (oldest first)
pub async fn fetch_pr_commits(pr: &PrRef) -> Result<Vec<PrCommit>> {
    #[derive(Deserialize)]
    struct PrView {
        commits: Vec<PrCommit>,
    }

    let args = vec![
        "pr".to_string(),
        "view".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
        "--json".to_string(),
        "commits".to_string(),
    ];
    let stdout = run_gh(&args, &format!("gh pr view #{} commits", pr.number)).await?;

    let view: PrView =
        serde_json::from_slice(&stdout).context("Failed to parse PR commits JSON")?;
    Ok(view.commits)
}

/// Fetch all inline review comments for a PR via the REST API
pub async fn fetch_review_comments(pr: &PrRef) -> Result<Vec<ReviewComment>> {
    let args = vec![
        "api".to_string(),
        format!(
            "repos/{}/pulls/{}/comments",
            pr.repo.full_name(),
            pr.number
        ),
        "--paginate".to_string(),
    ];
    let stdout = run_gh(&args, &format!("fetch review comments #{}", pr.number)).await?;

    let json_str = String::from_utf8(stdout).context("Invalid UTF-8 in response")?;

    // Handle empty response
    if json_str.trim().is_empty() {
        return Ok(Vec::new());
    }

    parse_comment_pages(&json_str)
}

/// Parse `gh api --paginate` output for an array endpoint: one JSON array
/// per page, emitted back to back. Each page is parsed and flattened.
fn parse_comment_pages(json_str: &str) -> Result<Vec<ReviewComment>> {
    let mut comments = Vec::new();
    for page in serde_json::Deserializer::from_str(json_str).into_iter::<Vec<ReviewComment>>() {
        comments.extend(page.context("Failed to parse review comments")?);
    }
    Ok(comments)
}

/// Review verdicts the menu can submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    Approve,
    RequestChanges,
}

/// Submit a review on a PR (approve or request changes)
pub async fn submit_review(pr: &PrRef, verdict: ReviewVerdict, body: Option<&str>) -> Result<()> {
    // Request-changes requires a body
    if verdict == ReviewVerdict::RequestChanges && body.map(|b| b.is_empty()).unwrap_or(true) {
        return Err(anyhow!("Request changes requires a comment"));
    }

    let mut args = vec![
        "pr".to_string(),
        "review".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
    ];
    match verdict {
        ReviewVerdict::Approve => args.push("--approve".to_string()),
        ReviewVerdict::RequestChanges => args.push("--request-changes".to_string()),
    }
    if let Some(text) = body {
        if !text.is_empty() {
            args.push("--body".to_string());
            args.push(text.to_string());
        }
    }

    run_gh(&args, "gh pr review").await?;
    Ok(())
}

/// Add a general comment to a PR
pub async fn add_comment(pr: &PrRef, body: &str) -> Result<()> {
    let args = vec![
        "pr".to_string(),
        "comment".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
        "--body".to_string(),
        body.to_string(),
    ];
    run_gh(&args, "gh pr comment").await?;
    Ok(())
}

/// Open the PR in the browser
pub async fn open_in_browser(pr: &PrRef) -> Result<()> {
    let args = vec![
        "pr".to_string(),
        "view".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
        "--web".to_string(),
    ];
    run_gh(&args, "gh pr view --web").await?;
    Ok(())
}

/// Run a gh subcommand whose output should stream to the terminal
async fn run_gh_passthrough(args: &[String], what: &str) -> Result<()> {
    let start = Instant::now();
    let status = Command::new("gh")
        .args(args)
        .status()
        .await
        .with_context(|| format!("Failed to run gh for {}", what))?;

    perf_log(what, start.elapsed().as_millis());

    if !status.success() {
        return Err(anyhow!("{} exited with {}", what, status));
    }
    Ok(())
}

/// Check out the PR branch locally
pub async fn checkout(pr: &PrRef) -> Result<()> {
    let args = vec![
        "pr".to_string(),
        "checkout".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
    ];
    run_gh_passthrough(&args, "gh pr checkout").await
}

/// Show the PR diff in the terminal
pub async fn diff(pr: &PrRef) -> Result<()> {
    let args = vec![
        "pr".to_string(),
        "diff".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
    ];
    run_gh_passthrough(&args, "gh pr diff").await
}

/// Show CI check status for the PR
pub async fn checks(pr: &PrRef) -> Result<()> {
    let args = vec![
        "pr".to_string(),
        "checks".to_string(),
        pr.number.to_string(),
        "--repo".to_string(),
        pr.repo.full_name(),
    ];
    run_gh_passthrough(&args, "gh pr checks").await
}

/// Create an issue; returns the created issue URL printed by gh
pub async fn create_issue(
    repo: &RepoRef,
    title: &str,
    body: &str,
    labels: Option<&str>,
    assignee: Option<&str>,
) -> Result<String> {
    let mut args = vec![
        "issue".to_string(),
        "create".to_string(),
        "--repo".to_string(),
        repo.full_name(),
        "--title".to_string(),
        title.to_string(),
        "--body".to_string(),
        body.to_string(),
    ];
    if let Some(labels) = labels {
        args.push("--label".to_string());
        args.push(labels.to_string());
    }
    if let Some(assignee) = assignee {
        args.push("--assignee".to_string());
        args.push(assignee.to_string());
    }

    let stdout = run_gh(&args, "gh issue create").await?;
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}
