/*!
`run.rs`

Implements the `run` subcommand: feeds input lines through a dispatcher
loaded with the bundled chat-game commands.

Input sources (first match wins):
  - `-e/--exec LINE` (repeatable)
  - `--script FILE`
  - stdin

Blank lines and lines starting with `#` are skipped.

Suspending handlers (`wait`) are scheduled on a Tokio runtime owned by this
command; the runtime is drained before returning so no work is dropped.

JSON mode prints one `DispatchReport` per line (JSON Lines), followed by a
final `{"state": ...}` object when `--state` is set.
*/

use anyhow::{Context, Result};
use clap::Args;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use hollow_dispatch::config::Config;
use hollow_dispatch::demo::ChatGame;
use hollow_dispatch::dispatch::{DispatchReport, Dispatcher, Outcome, TokioScheduler};
use hollow_dispatch::{log_debug, log_info};

use crate::cmd::format::{Role, StyleOptions, color, emoji};

/// CLI arguments for `hollow-dispatch run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Read command lines from FILE instead of stdin
    #[arg(long, value_name = "FILE")]
    pub script: Option<String>,

    /// Dispatch LINE directly (repeatable; skips stdin)
    #[arg(short = 'e', long = "exec", value_name = "LINE")]
    pub lines: Vec<String>,

    /// Output JSON Lines instead of human-readable text
    #[arg(long)]
    pub json: bool,

    /// Print the final game state after all lines ran
    #[arg(long)]
    pub state: bool,
}

/// Entry point for the run subcommand.
pub fn execute_run(args: RunArgs, config: &Config) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let scheduler = Arc::new(TokioScheduler::new(rt.handle().clone()));

    let game = Arc::new(ChatGame::new(config));
    let mut dispatcher = Dispatcher::new().with_scheduler(scheduler.clone());
    let count = dispatcher.register_shared(game.clone())?;
    log_debug!("Registered {count} commands");

    let lines = collect_lines(&args)?;
    let style = StyleOptions::detect();
    let started = std::time::Instant::now();

    for line in &lines {
        let report = dispatcher.execute(line);
        if args.json {
            println!(
                "{}",
                serde_json::to_string(&report).context("Failed to serialize report")?
            );
        } else {
            println!("{}", render_report(&report, &style));
        }
    }

    if scheduler.pending() > 0 {
        log_info!("Waiting for {} scheduled command(s)", scheduler.pending());
    }
    rt.block_on(scheduler.drain());
    log_debug!(
        "Processed {} line(s) in {}",
        lines.len(),
        hollow_dispatch::utils::human_duration(started.elapsed())
    );

    if args.state {
        let snapshot = game.snapshot()?;
        if args.json {
            println!(
                "{}",
                serde_json::to_string(&serde_json::json!({ "state": snapshot }))
                    .context("Failed to serialize state")?
            );
        } else {
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot).context("Failed to serialize state")?
            );
        }
    }
    Ok(())
}

fn collect_lines(args: &RunArgs) -> Result<Vec<String>> {
    let raw: Vec<String> = if !args.lines.is_empty() {
        args.lines.clone()
    } else if let Some(path) = &args.script {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open script file: {path}"))?;
        read_lines(BufReader::new(file))?
    } else {
        read_lines(std::io::stdin().lock())?
    };
    Ok(raw.into_iter().filter(|l| is_command_line(l)).collect())
}

fn read_lines(reader: impl BufRead) -> Result<Vec<String>> {
    reader
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .context("Failed to read input lines")
}

fn is_command_line(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && !t.starts_with('#')
}

/// One header line per input, then one indented line per attempted candidate.
fn render_report(report: &DispatchReport, style: &StyleOptions) -> String {
    let mut out = vec![format!("{} {}", color(Role::Dim, ">", style), report.line)];
    if report.is_no_match() {
        out.push(format!(
            "  {} {}",
            emoji("info", style),
            color(Role::Dim, format!("no command named '{}'", report.head), style)
        ));
        return out.join("\n");
    }
    for attempt in &report.attempts {
        let (tag, role) = match &attempt.outcome {
            Outcome::Invoked => ("success", Role::Success),
            Outcome::Scheduled => ("clock", Role::Primary),
            Outcome::Rejected { .. } => ("warn", Role::Warning),
            Outcome::Failed { .. } => ("error", Role::Error),
        };
        out.push(format!(
            "  {} {} {} {}",
            emoji(tag, style),
            color(Role::Accent, &attempt.command, style),
            color(Role::Dim, format!("(priority {})", attempt.priority), style),
            color(role, attempt.outcome.to_string(), style),
        ));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrap {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn parses_repeated_exec_lines() {
        let w = Wrap::try_parse_from(["run", "-e", "say hi", "--exec", "heal", "--json"]).unwrap();
        assert_eq!(w.args.lines, vec!["say hi", "heal"]);
        assert!(w.args.json);
        assert!(w.args.script.is_none());
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let input = "say hi\n\n   # comment\nheal\n";
        let lines: Vec<String> = read_lines(input.as_bytes())
            .unwrap()
            .into_iter()
            .filter(|l| is_command_line(l))
            .collect();
        assert_eq!(lines, vec!["say hi", "heal"]);
    }

    #[test]
    fn renders_attempts_plainly() {
        let mut d = Dispatcher::new();
        d.register_commands(ChatGame::default()).unwrap();
        let style = StyleOptions::plain();

        let text = render_report(&d.execute("give sword lots"), &style);
        assert!(text.starts_with("> give sword lots"));
        assert!(text.contains("give (priority 0) rejected: 'lots' is not a valid u32"));

        let text = render_report(&d.execute("dance"), &style);
        assert!(text.contains("no command named 'dance'"));
    }
}
