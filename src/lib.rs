//! Hollow Dispatch: priority-ordered text command dispatch with typed
//! arguments, precondition gates (cooldowns) and a scheduler hand-off for
//! long-running handlers.
//!
//! Modules:
//!   dispatch - registry, argument building, dispatch loop
//!   demo     - bundled chat-game command set used by the CLI
//!   config   - YAML / JSON configuration for the CLI host
//!   utils    - logging

pub mod config;
pub mod demo;
pub mod dispatch;
pub mod utils;

pub use dispatch::{Command, CommandModule, Dispatcher, Param};
