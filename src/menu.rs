use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::github::{self, ReviewVerdict};
use crate::render::{self, Format, Style};
use crate::types::{PrRef, RepoRef};
use crate::{comments, threads};

/// Interactive action menu. One blocking read per iteration; "quit" is the
/// only way out besides EOF. Action failures are reported and the loop
/// continues.
pub struct Menu {
    pr: PrRef,
    format: Format,
    style: Style,
}

impl Menu {
    pub fn new(pr: PrRef, format: Format, style: Style) -> Self {
        Self { pr, format, style }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.show_header().await;

        let stdin = io::stdin();
        loop {
            print_menu(&self.pr);
            let line = match read_line(&stdin, "> ") {
                Some(l) => l,
                None => break, // EOF
            };

            match line.trim() {
                "1" => self.report(self.show_threads(false).await),
                "2" => self.report(self.show_threads(true).await),
                "3" => self.report(self.show_comments().await),
                "4" => self.report(github::submit_review(&self.pr, ReviewVerdict::Approve, None).await),
                "5" => {
                    let body = read_line(&stdin, "Reason for requesting changes: ");
                    match body {
                        Some(body) => self.report(
                            github::submit_review(
                                &self.pr,
                                ReviewVerdict::RequestChanges,
                                Some(body.trim()),
                            )
                            .await,
                        ),
                        None => break,
                    }
                }
                "6" => {
                    let body = read_line(&stdin, "Comment: ");
                    match body {
                        Some(body) if !body.trim().is_empty() => {
                            self.report(github::add_comment(&self.pr, body.trim()).await)
                        }
                        Some(_) => println!("Empty comment, skipped."),
                        None => break,
                    }
                }
                "7" => self.report(github::open_in_browser(&self.pr).await),
                "8" => self.report(github::diff(&self.pr).await),
                "9" => self.report(github::checks(&self.pr).await),
                "10" => self.report(github::checkout(&self.pr).await),
                "p" => {
                    match read_line(&stdin, "PR number: ") {
                        Some(raw) => match raw.trim().parse::<u32>() {
                            Ok(number) => {
                                self.pr.number = number;
                                self.show_header().await;
                            }
                            Err(_) => println!("Not a PR number: {}", raw.trim()),
                        },
                        None => break,
                    }
                }
                "r" => {
                    match read_line(&stdin, "Repository (owner/repo): ") {
                        Some(raw) => match raw.trim().split_once('/') {
                            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                                self.pr.repo = RepoRef {
                                    owner: owner.to_string(),
                                    name: name.to_string(),
                                };
                                self.show_header().await;
                            }
                            _ => println!("Expected owner/repo, got: {}", raw.trim()),
                        },
                        None => break,
                    }
                }
                "q" => break,
                "" => continue,
                other => println!("Unknown choice: {}", other),
            }
        }

        Ok(())
    }

    /// Fetch and print a one-line summary of the current PR; failures here
    /// are non-fatal (the context may have just been changed by hand)
    async fn show_header(&self) {
        match github::fetch_pr_details(&self.pr).await {
            Ok(details) => {
                let decision = details
                    .review_decision
                    .unwrap_or_else(|| "no review decision".to_string());
                println!(
                    "\n{}#{} {} [{}] by {} ({})",
                    self.pr.repo.full_name(),
                    details.number,
                    details.title,
                    details.state,
                    details.author,
                    decision
                );
            }
            Err(e) => eprintln!("Warning: could not load PR details: {:#}", e),
        }
    }

    async fn show_threads(&self, include_resolved: bool) -> Result<()> {
        let found = threads::list_threads(&self.pr, include_resolved).await?;
        print!("{}", render::render_threads(&found, self.format, &self.style)?);
        Ok(())
    }

    async fn show_comments(&self) -> Result<()> {
        let cutoff = comments::resolve_since(&self.pr, None).await?;
        let found = comments::list_comments_since(&self.pr, cutoff).await?;
        print!("{}", render::render_comments(&found, self.format, &self.style)?);
        Ok(())
    }

    fn report<E: std::fmt::Display>(&self, result: std::result::Result<(), E>) {
        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }
}

fn print_menu(pr: &PrRef) {
    println!("\n{}#{}", pr.repo.full_name(), pr.number);
    println!("  1) unresolved threads      6) add comment");
    println!("  2) all threads             7) open in browser");
    println!("  3) comments since commit   8) diff");
    println!("  4) approve                 9) checks");
    println!("  5) request changes        10) checkout");
    println!("  p) change PR   r) change repository   q) quit");
}

/// Prompt and read one line; None on EOF
fn read_line(stdin: &io::Stdin, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();

    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(_) => None,
    }
}
