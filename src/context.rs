use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tokio::process::Command;
use url::Url;

use crate::error::Error;
use crate::github;
use crate::types::{PrRef, RepoRef};

/// Explicit context supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ContextArgs {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub pr: Option<u32>,
}

/// Environment queries used for auto-detection; implemented over gh and git
/// in production and by fixtures in tests
#[allow(async_fn_in_trait)]
pub trait ContextProbe {
    async fn repo_for_cwd(&self) -> Result<RepoRef>;
    async fn pr_for_branch(&self) -> Result<u32>;
    async fn open_prs_for_head(&self, repo: &RepoRef, branch: &str) -> Result<Vec<u32>>;
    async fn current_branch(&self) -> Result<String>;
    async fn branch_remote(&self, branch: &str) -> String;
    async fn remote_url(&self, remote: &str) -> Result<String>;
}

/// Resolve (owner, repo, PR number), preferring explicit flags over detection
pub async fn resolve(args: &ContextArgs) -> Result<PrRef, Error> {
    resolve_with(&GhContextProbe, args).await
}

/// Resolve just the repository, preferring explicit flags over detection
pub async fn resolve_repo(args: &ContextArgs) -> Result<RepoRef, Error> {
    resolve_repo_with(&GhContextProbe, args).await
}

pub async fn resolve_with<P: ContextProbe>(probe: &P, args: &ContextArgs) -> Result<PrRef, Error> {
    let repo = resolve_repo_with(probe, args).await?;

    let number = match args.pr {
        Some(n) => n,
        None => detect_pr_number(probe, &repo).await.map_err(|e| {
            Error::ContextResolution(format!(
                "no pull request found for the current branch ({}); pass --pr <number>",
                e
            ))
        })?,
    };

    Ok(PrRef { repo, number })
}

pub async fn resolve_repo_with<P: ContextProbe>(
    probe: &P,
    args: &ContextArgs,
) -> Result<RepoRef, Error> {
    match (&args.owner, &args.repo) {
        (Some(owner), Some(repo)) => Ok(RepoRef {
            owner: owner.clone(),
            name: repo.clone(),
        }),
        (None, None) => detect_repo(probe).await.map_err(|e| {
            Error::ContextResolution(format!(
                "could not detect a GitHub repository here ({}); pass --owner and --repo",
                e
            ))
        }),
        _ => Err(Error::ContextResolution(
            "--owner and --repo must be given together".to_string(),
        )),
    }
}

/// Detect the repository: `gh repo view`, falling back to the git remote URL
async fn detect_repo<P: ContextProbe>(probe: &P) -> Result<RepoRef> {
    if let Ok(repo) = probe.repo_for_cwd().await {
        return Ok(repo);
    }

    let branch = probe.current_branch().await?;
    let remote = probe.branch_remote(&branch).await;
    let url = probe.remote_url(&remote).await?;
    parse_remote_url(&url)
}

/// Detect the PR for the current branch: `gh pr view`, falling back to
/// listing open PRs whose head matches the branch
async fn detect_pr_number<P: ContextProbe>(probe: &P, repo: &RepoRef) -> Result<u32> {
    if let Ok(number) = probe.pr_for_branch().await {
        return Ok(number);
    }

    let branch = probe.current_branch().await?;
    let numbers = probe.open_prs_for_head(repo, &branch).await?;
    numbers
        .first()
        .copied()
        .ok_or_else(|| anyhow!("no open PR with head branch '{}'", branch))
}

/// Real probe backed by the gh CLI and local git metadata
pub struct GhContextProbe;

impl ContextProbe for GhContextProbe {
    async fn repo_for_cwd(&self) -> Result<RepoRef> {
        github::view_repo_for_cwd().await
    }

    async fn pr_for_branch(&self) -> Result<u32> {
        github::view_pr_number_for_branch().await
    }

    async fn open_prs_for_head(&self, repo: &RepoRef, branch: &str) -> Result<Vec<u32>> {
        github::list_pr_numbers_for_head(repo, branch).await
    }

    /// Current branch name from local git metadata
    async fn current_branch(&self) -> Result<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .output()
            .await
            .context("Failed to run git")?;

        if !output.status.success() {
            return Err(anyhow!("not inside a git repository"));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Remote configured for the branch's upstream, or "origin" if none
    async fn branch_remote(&self, branch: &str) -> String {
        let output = Command::new("git")
            .args(["config", &format!("branch.{}.remote", branch)])
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                let remote = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if remote.is_empty() {
                    "origin".to_string()
                } else {
                    remote
                }
            }
            _ => "origin".to_string(),
        }
    }

    /// URL configured for the given remote
    async fn remote_url(&self, remote: &str) -> Result<String> {
        let output = Command::new("git")
            .args(["remote", "get-url", remote])
            .output()
            .await
            .context("Failed to run git")?;

        if !output.status.success() {
            return Err(anyhow!("no git remote named '{}'", remote));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Parse a git remote URL (https or ssh form) into owner and repo name
pub fn parse_remote_url(remote: &str) -> Result<RepoRef> {
    // scp-like ssh form: git@github.com:owner/repo.git
    let ssh_re = Regex::new(r"^(?:ssh://)?git@[^:/]+[:/]([^/]+)/(.+?)(?:\.git)?/?$")
        .expect("static regex");
    if let Some(caps) = ssh_re.captures(remote) {
        return Ok(RepoRef {
            owner: caps[1].to_string(),
            name: caps[2].to_string(),
        });
    }

    // https form: https://github.com/owner/repo(.git)
    let url = Url::parse(remote).with_context(|| format!("unrecognized remote URL: {}", remote))?;
    let segments: Vec<_> = url
        .path_segments()
        .ok_or_else(|| anyhow!("remote URL has no path: {}", remote))?
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() < 2 {
        return Err(anyhow!("remote URL is not owner/repo shaped: {}", remote));
    }

    let owner = segments[0].to_string();
    let name = segments[1].trim_end_matches(".git").to_string();

    if owner.is_empty() || name.is_empty() {
        return Err(anyhow!("remote URL is not owner/repo shaped: {}", remote));
    }

    Ok(RepoRef { owner, name })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Probe for an environment with no gh and no usable git metadata
    struct BareProbe;

    impl ContextProbe for BareProbe {
        async fn repo_for_cwd(&self) -> Result<RepoRef> {
            Err(anyhow!("gh not available"))
        }

        async fn pr_for_branch(&self) -> Result<u32> {
            Err(anyhow!("gh not available"))
        }

        async fn open_prs_for_head(&self, _repo: &RepoRef, _branch: &str) -> Result<Vec<u32>> {
            Err(anyhow!("gh not available"))
        }

        async fn current_branch(&self) -> Result<String> {
            Err(anyhow!("not inside a git repository"))
        }

        async fn branch_remote(&self, _branch: &str) -> String {
            "origin".to_string()
        }

        async fn remote_url(&self, _remote: &str) -> Result<String> {
            Err(anyhow!("no git remote named 'origin'"))
        }
    }

    /// Probe where only git metadata works (gh is unavailable)
    struct GitOnlyProbe {
        remote: String,
        open_prs: Vec<u32>,
    }

    impl ContextProbe for GitOnlyProbe {
        async fn repo_for_cwd(&self) -> Result<RepoRef> {
            Err(anyhow!("gh not available"))
        }

        async fn pr_for_branch(&self) -> Result<u32> {
            Err(anyhow!("gh not available"))
        }

        async fn open_prs_for_head(&self, _repo: &RepoRef, _branch: &str) -> Result<Vec<u32>> {
            Ok(self.open_prs.clone())
        }

        async fn current_branch(&self) -> Result<String> {
            Ok("feature".to_string())
        }

        async fn branch_remote(&self, _branch: &str) -> String {
            "origin".to_string()
        }

        async fn remote_url(&self, _remote: &str) -> Result<String> {
            Ok(self.remote.clone())
        }
    }

    #[test]
    fn parse_https_remote() {
        let repo = parse_remote_url("https://github.com/octocat/hello-world.git").unwrap();
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
    }

    #[test]
    fn parse_https_remote_without_git_suffix() {
        let repo = parse_remote_url("https://github.com/octocat/hello-world").unwrap();
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
    }

    #[test]
    fn parse_ssh_remote() {
        let repo = parse_remote_url("git@github.com:octocat/hello-world.git").unwrap();
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
    }

    #[test]
    fn parse_ssh_remote_without_git_suffix() {
        let repo = parse_remote_url("git@github.com:my-org/my_repo").unwrap();
        assert_eq!(repo.owner, "my-org");
        assert_eq!(repo.name, "my_repo");
    }

    #[test]
    fn parse_ssh_url_form() {
        let repo = parse_remote_url("ssh://git@github.com/octocat/hello-world.git").unwrap();
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
    }

    #[test]
    fn parse_remote_rejects_garbage() {
        assert!(parse_remote_url("not a url").is_err());
        assert!(parse_remote_url("").is_err());
        assert!(parse_remote_url("https://github.com/").is_err());
        assert!(parse_remote_url("https://github.com/just-owner").is_err());
    }

    #[test]
    fn parse_remote_with_trailing_slash() {
        let repo = parse_remote_url("https://github.com/octocat/hello-world/").unwrap();
        assert_eq!(repo.name, "hello-world");
    }

    #[tokio::test]
    async fn explicit_flags_win() {
        let args = ContextArgs {
            owner: Some("octocat".to_string()),
            repo: Some("hello-world".to_string()),
            pr: Some(7),
        };
        let pr = resolve_with(&BareProbe, &args).await.unwrap();
        assert_eq!(pr.repo.owner, "octocat");
        assert_eq!(pr.repo.name, "hello-world");
        assert_eq!(pr.number, 7);
    }

    #[tokio::test]
    async fn owner_without_repo_is_an_error() {
        let args = ContextArgs {
            owner: Some("octocat".to_string()),
            repo: None,
            pr: Some(7),
        };
        let err = resolve_with(&BareProbe, &args).await.unwrap_err();
        assert!(matches!(err, Error::ContextResolution(_)));
    }

    #[tokio::test]
    async fn no_flags_and_no_environment_fails_cleanly() {
        let err = resolve_with(&BareProbe, &ContextArgs::default())
            .await
            .unwrap_err();

        // Must be a resolution error naming the flags to supply
        match err {
            Error::ContextResolution(msg) => {
                assert!(msg.contains("--owner"), "message was: {}", msg);
                assert!(msg.contains("--repo"), "message was: {}", msg);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn repo_known_but_no_pr_names_the_pr_flag() {
        let args = ContextArgs {
            owner: Some("octocat".to_string()),
            repo: Some("hello-world".to_string()),
            pr: None,
        };
        let err = resolve_with(&BareProbe, &args).await.unwrap_err();

        match err {
            Error::ContextResolution(msg) => {
                assert!(msg.contains("--pr"), "message was: {}", msg);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn repo_detected_from_git_remote_when_gh_fails() {
        let probe = GitOnlyProbe {
            remote: "git@github.com:octocat/hello-world.git".to_string(),
            open_prs: vec![],
        };
        let repo = resolve_repo_with(&probe, &ContextArgs::default())
            .await
            .unwrap();
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
    }

    #[tokio::test]
    async fn pr_detected_from_head_branch_listing() {
        let probe = GitOnlyProbe {
            remote: "https://github.com/octocat/hello-world.git".to_string(),
            open_prs: vec![42, 99],
        };
        let pr = resolve_with(&probe, &ContextArgs::default()).await.unwrap();
        assert_eq!(pr.number, 42); // first match wins
    }

    #[tokio::test]
    async fn no_open_pr_for_branch_is_a_resolution_error() {
        let probe = GitOnlyProbe {
            remote: "https://github.com/octocat/hello-world.git".to_string(),
            open_prs: vec![],
        };
        let err = resolve_with(&probe, &ContextArgs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContextResolution(_)));
    }
}
