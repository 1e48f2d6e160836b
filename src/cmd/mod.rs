/*!
Subcommands of the `hollow-dispatch` binary.

Layout:
  src/cmd/
    mod.rs      (this file)
    run.rs      (RunArgs  + execute_run)
    list.rs     (ListArgs + execute_list)
    format.rs   (table / color / emoji helpers for human output)

Conventions:
  - Each subcommand module exposes exactly one public `execute_*` function
    that returns `anyhow::Result<()>`.
  - Argument structs derive `clap::Args` and are kept minimal.
*/

pub mod format;
pub mod list;
pub mod run;

pub use list::{ListArgs, execute_list};
pub use run::{RunArgs, execute_run};
