/*!
Text-command dispatch pipeline.

  line -> Dispatcher::execute
            -> candidates (name match, priority order)
            -> preconditions (precondition.rs)
            -> argument build (builder.rs, using parser.rs)
            -> handler (sync) | Scheduler::submit (suspending)
            -> DispatchReport (report.rs)

Layout:
  src/dispatch/
    mod.rs           (this file, re-exports)
    parser.rs        (TypeParsers, ArgumentParser, TypeKey)
    precondition.rs  (Precondition, Cooldown, Predicate, Gate)
    command.rs       (Command, CommandBuilder, Param, Args, Handler, CommandModule)
    builder.rs       (build_arguments)
    scheduler.rs     (Scheduler, TokioScheduler)
    report.rs        (DispatchReport, Attempt, Outcome, Rejection)
    dispatcher.rs    (Dispatcher)
*/

pub mod builder;
pub mod command;
pub mod dispatcher;
pub mod parser;
pub mod precondition;
pub mod report;
pub mod scheduler;

pub use builder::{SEPARATOR, build_arguments};
pub use command::{Args, Command, CommandBuilder, CommandModule, Handler, Param, Task};
pub use dispatcher::Dispatcher;
pub use parser::{ArgumentParser, TypeKey, TypeParsers, Value};
pub use precondition::{Cooldown, Gate, Precondition, Predicate};
pub use report::{Attempt, CooldownState, DispatchReport, Outcome, Rejection};
pub use scheduler::{Scheduler, TokioScheduler};
