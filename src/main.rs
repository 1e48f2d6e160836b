use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;

use cmd::{ListArgs, RunArgs};
use hollow_dispatch::config::Config;
use hollow_dispatch::utils;

/// Hollow Dispatch - text command dispatcher host
///
/// Command layout:
///   hollow-dispatch run  [--script FILE] [-e LINE ...] [--json] [--state]
///   hollow-dispatch list [--json]
///
/// Global flags / env:
///   -v / -vv        Increase verbosity
///   -q / --quiet    Errors only
///   --config PATH   YAML or JSON config (or HOLLOW_CONFIG env)
///
/// Examples:
///   echo "say hello world" | hollow-dispatch run
///   hollow-dispatch run -e "heal" -e "heal" -e "wait 1.5" --json
///   hollow-dispatch run --script chat.txt --state -v
///   hollow-dispatch list --json
#[derive(Parser, Debug)]
#[command(
    name = "hollow-dispatch",
    version,
    author,
    about = "Hollow Dispatch - priority-ordered text command dispatcher",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (YAML or JSON; falls back to HOLLOW_CONFIG env)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch command lines against the bundled command set
    Run(RunArgs),

    /// List registered commands
    List(ListArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::resolve(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid config: {e:#}");
            std::process::exit(2);
        }
    };

    // Flags can raise the configured floor but never lower it
    let level = utils::derive_level(
        cli.verbose.max(config.verbose),
        cli.quiet || config.quiet,
    );
    utils::init_logging(level);

    match cli.command {
        Commands::Run(args) => cmd::execute_run(args, &config),
        Commands::List(args) => cmd::execute_list(args, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["hollow-dispatch", "run", "-vv", "--config", "c.yml", "-e", "hi"])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("c.yml"));
        assert!(matches!(cli.command, Commands::Run(ref a) if a.lines == ["hi"]));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["hollow-dispatch", "-q"]).is_err());
    }
}
