use anyhow::Result;
use crossterm::style::{Color, Stylize};

use crate::config::Config;
use crate::types::{ReviewComment, ReviewThread};

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Plain,
    Pretty,
    Json,
}

impl Format {
    /// Pick the format: --json wins, then the configured default
    pub fn select(json_flag: bool, config: &Config) -> Self {
        if json_flag {
            Format::Json
        } else if config.is_plain_default() {
            Format::Plain
        } else {
            Format::Pretty
        }
    }
}

/// Renderer configuration, passed explicitly instead of living in globals
#[derive(Debug, Clone)]
pub struct Style {
    pub color: bool,
    /// Truncate comment bodies to this many characters (0 = no limit)
    pub body_limit: usize,
}

impl Style {
    pub fn from_config(config: &Config, stdout_is_tty: bool) -> Self {
        Self {
            color: config.color && stdout_is_tty,
            body_limit: config.body_limit,
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn body(&self, text: &str) -> String {
        truncate(text, self.body_limit)
    }
}

/// Truncate to `limit` characters on a char boundary, appending an ellipsis.
/// A limit of 0 means no truncation.
pub fn truncate(text: &str, limit: usize) -> String {
    if limit == 0 || text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}...", cut)
}

/// Render review threads in the requested format
pub fn render_threads(threads: &[ReviewThread], format: Format, style: &Style) -> Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(threads)?),
        Format::Plain => Ok(render_threads_plain(threads, style)),
        Format::Pretty => Ok(render_threads_pretty(threads, style)),
    }
}

fn render_threads_plain(threads: &[ReviewThread], style: &Style) -> String {
    let mut out = String::new();
    for thread in threads {
        let flags = thread_flags(thread);
        out.push_str(&format!("{}\t{}\n", thread.location(), flags));
        for comment in &thread.comments {
            out.push_str(&format!(
                "\t{}\t{}\t{}\n",
                comment.author,
                comment.created_at,
                style.body(&single_line(&comment.body))
            ));
        }
    }
    out
}

fn render_threads_pretty(threads: &[ReviewThread], style: &Style) -> String {
    if threads.is_empty() {
        return "No review threads.\n".to_string();
    }

    let mut out = String::new();
    for thread in threads {
        let flags = thread_flags(thread);
        let flag_color = if thread.is_resolved {
            Color::Green
        } else {
            Color::Yellow
        };
        out.push_str(&format!(
            "{} {}\n",
            style.bold(&thread.location()),
            style.paint(&flags, flag_color)
        ));

        if thread.comments.is_empty() {
            out.push_str(&format!("  {}\n", style.paint("(no comments)", Color::DarkGrey)));
        }
        for comment in &thread.comments {
            out.push_str(&format!(
                "  {} {}\n",
                style.paint(&comment.author, Color::Cyan),
                style.paint(&comment.created_at, Color::DarkGrey)
            ));
            for line in style.body(&comment.body).lines() {
                out.push_str(&format!("    {}\n", line));
            }
        }
        out.push('\n');
    }
    out
}

fn thread_flags(thread: &ReviewThread) -> String {
    let mut flags = if thread.is_resolved {
        "[resolved]".to_string()
    } else {
        "[unresolved]".to_string()
    };
    if thread.is_outdated {
        flags.push_str(" [outdated]");
    }
    flags
}

/// Render review comments in the requested format
pub fn render_comments(comments: &[ReviewComment], format: Format, style: &Style) -> Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(comments)?),
        Format::Plain => Ok(render_comments_plain(comments, style)),
        Format::Pretty => Ok(render_comments_pretty(comments, style)),
    }
}

fn comment_location(comment: &ReviewComment) -> String {
    match comment.line {
        Some(line) => format!("{}:{}", comment.path, line),
        None => format!("{}:n/a", comment.path),
    }
}

fn render_comments_plain(comments: &[ReviewComment], style: &Style) -> String {
    let mut out = String::new();
    for comment in comments {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            comment.author(),
            comment_location(comment),
            comment.updated_at,
            style.body(&single_line(&comment.body))
        ));
    }
    out
}

fn render_comments_pretty(comments: &[ReviewComment], style: &Style) -> String {
    if comments.is_empty() {
        return "No new comments.\n".to_string();
    }

    let mut out = String::new();
    for comment in comments {
        out.push_str(&format!(
            "{} {} {}\n",
            style.paint(comment.author(), Color::Cyan),
            style.bold(&comment_location(comment)),
            style.paint(&comment.updated_at, Color::DarkGrey)
        ));
        for line in style.body(&comment.body).lines() {
            out.push_str(&format!("  {}\n", line));
        }
        out.push('\n');
    }
    out
}

/// Collapse a multi-line body to one line for tabular output
fn single_line(body: &str) -> String {
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}
