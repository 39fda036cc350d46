mod comments;
mod config;
mod context;
mod error;
mod github;
mod issue;
mod menu;
mod render;
mod threads;
mod types;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use crate::config::Config;
use crate::context::ContextArgs;
use crate::render::{Format, Style};

#[derive(Parser)]
#[command(name = "prq")]
#[command(about = "A fast CLI for GitHub PR review workflows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Repository owner (detected from the current directory if omitted)
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Repository name (detected from the current directory if omitted)
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Pull request number (detected from the current branch if omitted)
    #[arg(long = "pr", visible_alias = "pr-number", global = true)]
    pr: Option<u32>,

    /// Print progress messages to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit structured JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Start the interactive action menu
    #[arg(long)]
    interactive: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List review threads on a PR (unresolved by default)
    Threads {
        /// Also show resolved threads
        #[arg(long, visible_alias = "all")]
        include_resolved: bool,
    },
    /// List review comments updated since the last commit (or --since)
    Comments {
        /// Cutoff timestamp (RFC 3339); defaults to the PR's last commit
        #[arg(long)]
        since: Option<String>,
    },
    /// Create an issue from a Markdown file (title derived from the file name)
    Issue {
        /// File whose contents become the issue body
        file: PathBuf,

        /// Label to apply (repeatable)
        #[arg(long = "label")]
        labels: Vec<String>,

        /// Assignee login, or @me
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Interactive action menu for a PR
    Menu,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load();
    let format = Format::select(cli.json, &config);
    let style = Style::from_config(&config, std::io::stdout().is_terminal());

    let ctx_args = ContextArgs {
        owner: cli.owner.clone(),
        repo: cli.repo.clone(),
        pr: cli.pr,
    };

    let command = match cli.command {
        Some(command) => command,
        None if cli.interactive => Command::Menu,
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    github::check_gh_cli().await?;

    match command {
        Command::Threads { include_resolved } => {
            let pr = context::resolve(&ctx_args).await?;
            if cli.verbose {
                eprintln!(
                    "Fetching review threads for {}#{}...",
                    pr.repo.full_name(),
                    pr.number
                );
            }
            let found = threads::list_threads(&pr, include_resolved).await?;
            if cli.verbose {
                eprintln!("Found {} threads.", found.len());
            }
            print!("{}", render::render_threads(&found, format, &style)?);
        }
        Command::Comments { since } => {
            let pr = context::resolve(&ctx_args).await?;
            let cutoff = comments::resolve_since(&pr, since.as_deref()).await?;
            if cli.verbose {
                eprintln!(
                    "Fetching comments on {}#{} updated after {}...",
                    pr.repo.full_name(),
                    pr.number,
                    cutoff.to_rfc3339()
                );
            }
            let found = comments::list_comments_since(&pr, cutoff).await?;
            if cli.verbose {
                eprintln!("Found {} comments.", found.len());
            }
            print!("{}", render::render_comments(&found, format, &style)?);
        }
        Command::Issue {
            file,
            labels,
            assignee,
        } => {
            let repo = context::resolve_repo(&ctx_args).await?;
            if cli.verbose {
                eprintln!("Creating issue in {} from {}...", repo.full_name(), file.display());
            }
            let mut submitter = issue::GhIssueSubmitter { repo };
            let url =
                issue::create_issue_from_file(&mut submitter, &file, &labels, assignee.as_deref())
                    .await?;
            println!("{}", url);
        }
        Command::Menu => {
            let pr = context::resolve(&ctx_args).await?;
            let mut menu = menu::Menu::new(pr, format, style);
            menu.run().await?;
        }
    }

    Ok(())
}
