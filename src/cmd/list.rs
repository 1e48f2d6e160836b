/*!
`list.rs`

Implements the `list` subcommand: prints every registered command in
registration order.

JSON Output Shape:
{
  "status": "ok",
  "count": 12,
  "commands": [
    { "name": "heal", "priority": 10, "usage": "heal",
      "suspending": false, "preconditions": ["cooldown(1x/30.0s)"],
      "description": "..." }
  ]
}
*/

use anyhow::{Context, Result};
use clap::Args;

use hollow_dispatch::config::Config;
use hollow_dispatch::demo::ChatGame;
use hollow_dispatch::dispatch::{Command, Dispatcher};

use crate::cmd::format::{Role, StyleOptions, color, emoji, table};

/// CLI arguments for `hollow-dispatch list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Entry point for the list subcommand.
pub fn execute_list(args: ListArgs, config: &Config) -> Result<()> {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register_commands(ChatGame::new(config))?;
    let commands = dispatcher.commands();

    if args.json {
        let items: Vec<serde_json::Value> = commands.iter().map(command_json).collect();
        let out = serde_json::json!({
            "status": "ok",
            "count": items.len(),
            "commands": items,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialize command list")?
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{} {}",
        emoji("list", &style),
        color(Role::Primary, format!("{} commands", commands.len()), &style)
    );
    println!("{}", render_table(commands, &style));
    Ok(())
}

fn command_json(c: &Command) -> serde_json::Value {
    serde_json::json!({
        "name": c.name(),
        "priority": c.priority(),
        "usage": c.usage(),
        "suspending": c.handler().is_suspending(),
        "preconditions": c.preconditions().iter().map(|p| p.describe()).collect::<Vec<_>>(),
        "description": c.description().unwrap_or(""),
    })
}

fn render_table(commands: &[Command], style: &StyleOptions) -> String {
    let rows: Vec<Vec<String>> = commands
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let pre = c
                .preconditions()
                .iter()
                .map(|p| p.describe())
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                (i + 1).to_string(),
                c.name().to_string(),
                c.priority().to_string(),
                c.usage(),
                if pre.is_empty() { "-".into() } else { pre },
                if c.handler().is_suspending() { "async" } else { "sync" }.into(),
                c.description().unwrap_or("").to_string(),
            ]
        })
        .collect();
    table(
        &[
            "#",
            "NAME",
            "PRIORITY",
            "USAGE",
            "PRECONDITIONS",
            "KIND",
            "DESCRIPTION",
        ],
        &rows,
        style,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrap {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn parses_json_flag() {
        assert!(Wrap::try_parse_from(["list", "--json"]).unwrap().args.json);
        assert!(!Wrap::try_parse_from(["list"]).unwrap().args.json);
    }

    #[test]
    fn lists_every_demo_command() {
        let mut d = Dispatcher::new();
        d.register_commands(ChatGame::default()).unwrap();
        let mut style = StyleOptions::plain();
        style.term_width = 220;

        let text = render_table(d.commands(), &style);
        // header + rule + one row per command
        assert_eq!(text.lines().count(), d.commands().len() + 2);
        assert!(text.contains("say <text:String...>"));

        let wait = d.commands().iter().find(|c| c.name() == "wait").unwrap();
        assert_eq!(command_json(wait)["suspending"], true);
    }
}
