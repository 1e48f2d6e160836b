/*!
dispatcher.rs - the dispatch loop.

execute(line):
  1. split on the separator; head token names the command
  2. every command whose name matches (Unicode case-insensitive), ordered by
     descending priority, ties in registration order
  3. per candidate: all preconditions checked (no short-circuit), then
     arguments built, then the handler invoked or scheduled
  4. failures are recorded and logged; the loop always continues, so several
     same-named commands may run for one line
*/

use anyhow::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use super::builder::{SEPARATOR, build_arguments};
use super::command::{Command, CommandModule, Handler};
use super::parser::{ArgumentParser, TypeParsers};
use super::report::{Attempt, CooldownState, DispatchReport, Outcome, Rejection};
use super::scheduler::Scheduler;
use crate::{log_debug, log_error, log_info, log_trace};

/// Command registry plus the parser table, and the dispatch loop over them.
#[derive(Default)]
pub struct Dispatcher {
    commands: Vec<Command>,
    parsers: TypeParsers,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /* ---- Parser extension ---- */

    pub fn add_type_parser<P>(&mut self, parser: P) -> Result<()>
    where
        P: ArgumentParser + 'static,
    {
        self.parsers.add_type_parser(parser)
    }

    pub fn add_type_parser_fn<T, F>(&mut self, parser: F) -> Result<()>
    where
        T: Any + Send,
        F: Fn(&str) -> Result<T> + Send + Sync + 'static,
    {
        self.parsers.add_type_parser_fn(parser)
    }

    pub fn parsers(&self) -> &TypeParsers {
        &self.parsers
    }

    /* ---- Registration ---- */

    pub fn register(&mut self, command: Command) {
        for p in command.params() {
            if p.converter().is_none() && !self.parsers.supports(p.key()) {
                log_debug!(
                    "command {}: no parser registered yet for <{}:{}>",
                    command.name(),
                    p.name(),
                    p.key()
                );
            }
        }
        log_info!("Added command: {}", command.name());
        self.commands.push(command);
    }

    /// Register every command a module contributes. Returns how many.
    pub fn register_commands<M: CommandModule>(&mut self, module: M) -> Result<usize> {
        self.register_shared(Arc::new(module))
    }

    /// Like `register_commands`, for a module instance the host keeps a handle to.
    pub fn register_shared<M: CommandModule>(&mut self, module: Arc<M>) -> Result<usize> {
        module.type_parsers(&mut self.parsers)?;
        let commands = module.commands()?;
        let count = commands.len();
        for c in commands {
            self.register(c);
        }
        Ok(count)
    }

    /// `register_commands` on a default-constructed module.
    pub fn register_default<M: CommandModule + Default>(&mut self) -> Result<usize> {
        self.register_commands(M::default())
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Indices of the commands named `head`, in attempt order.
    pub fn candidates(&self, head: &str) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .commands
            .iter()
            .enumerate()
            .filter(|(_, c)| c.matches(head))
            .map(|(i, _)| i)
            .collect();
        // stable: equal priorities keep registration order
        found.sort_by_key(|&i| std::cmp::Reverse(self.commands[i].priority()));
        found
    }

    /* ---- Dispatch ---- */

    /// Dispatch one input line. Never fails; see the returned report.
    pub fn execute(&mut self, line: &str) -> DispatchReport {
        let pieces: Vec<&str> = line.split(SEPARATOR).collect();
        let (head, rest) = match pieces.split_first() {
            Some((head, rest)) => (*head, rest),
            None => ("", &[][..]),
        };

        let mut report = DispatchReport::new(line, head);

        for idx in self.candidates(head) {
            let command = &mut self.commands[idx];
            let outcome = run_candidate(
                command,
                rest,
                line,
                &self.parsers,
                self.scheduler.as_deref(),
            );
            log_trace!("{} (priority {}): {}", command.name(), command.priority(), outcome);
            report.attempts.push(Attempt {
                command: command.name().to_string(),
                priority: command.priority(),
                outcome,
            });
        }

        report
    }
}

fn run_candidate(
    command: &mut Command,
    tokens: &[&str],
    line: &str,
    parsers: &TypeParsers,
    scheduler: Option<&dyn Scheduler>,
) -> Outcome {
    if let Err(reason) = check_preconditions(command) {
        return Outcome::Rejected { reason };
    }

    let args = match build_arguments(tokens, command, parsers) {
        Ok(a) => a,
        Err(reason) => return Outcome::Rejected { reason },
    };

    log_debug!("Built arguments for command {line}.");

    match command.handler() {
        Handler::Sync(f) => match panic::catch_unwind(AssertUnwindSafe(|| f(args))) {
            Ok(Ok(())) => Outcome::Invoked,
            Ok(Err(e)) => {
                log_error!("Command {} failed: {e:?}", command.name());
                Outcome::Failed {
                    error: format!("{e:#}"),
                }
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log_error!("Command {} panicked: {msg}", command.name());
                Outcome::Failed {
                    error: format!("panicked: {msg}"),
                }
            }
        },
        Handler::Suspending(f) => {
            let Some(scheduler) = scheduler else {
                log_error!(
                    "Command {} is suspending but no scheduler is attached",
                    command.name()
                );
                return Outcome::Failed {
                    error: "no scheduler attached".to_string(),
                };
            };
            match panic::catch_unwind(AssertUnwindSafe(|| f(args))) {
                Ok(task) => {
                    scheduler.submit(command.name(), task);
                    Outcome::Scheduled
                }
                Err(payload) => {
                    let msg = panic_message(payload.as_ref());
                    log_error!("Command {} panicked: {msg}", command.name());
                    Outcome::Failed {
                        error: format!("panicked: {msg}"),
                    }
                }
            }
        }
    }
}

/// Every precondition is checked even after one fails. Only the first one is
/// inspected for cooldown diagnostics.
fn check_preconditions(command: &mut Command) -> Result<(), Rejection> {
    let mut first_failed = None;
    let mut failed = 0;
    for (i, p) in command.preconditions_mut().iter_mut().enumerate() {
        if p.check() {
            continue;
        }
        failed += 1;
        first_failed.get_or_insert(i);
    }

    let Some(index) = first_failed else {
        return Ok(());
    };

    let now = Instant::now();
    let cooldown = command
        .preconditions()
        .first()
        .and_then(|p| p.as_cooldown())
        .map(|cd| {
            let message = cd.diagnostic(command.name(), now);
            log_info!("{message}");
            CooldownState {
                remaining_uses: cd.remaining_uses(),
                reset_in_ms: cd.time_until_reset(now).as_millis() as u64,
                message,
            }
        });

    Err(Rejection::PreconditionFailed {
        index,
        failed,
        cooldown,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic payload".to_string()
}

/* ---- Tests ---- */
