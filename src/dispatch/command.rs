/*!
command.rs - registered command entities and their parameter shape.

A `Command` is built once through `Command::builder` and its shape never
changes afterwards. Only precondition state (e.g. cooldown counters) mutates
during dispatch.

Example:
  Command::builder("give")
      .param(Param::of::<String>("item"))
      .param(Param::of::<i32>("amount").ensure(|n: i32| {
          if n > 0 { Ok(n) } else { anyhow::bail!("amount must be positive") }
      }))
      .handler(move |mut args| { ... })?
*/

use anyhow::{Result, anyhow, bail};
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use super::parser::{Converter, TypeKey, TypeParsers, Value, from_str_value};
use super::precondition::Precondition;

/// Boxed future produced by a suspending handler.
pub type Task = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

type Ensure = Box<dyn Fn(Value) -> Result<Value> + Send>;

/* ---- Parameters ---- */

/// Shape of one positional parameter.
pub struct Param {
    name: String,
    key: TypeKey,
    remainder: bool,
    converter: Option<Converter>,
    ensure: Option<Ensure>,
    /// Input type the `ensure` closure downcasts to.
    ensure_input: Option<TypeKey>,
}

impl Param {
    /// Parameter converted through the built-in table or a registered parser.
    pub fn of<T: Any + Send>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: TypeKey::of::<T>(),
            remainder: false,
            converter: None,
            ensure: None,
            ensure_input: None,
        }
    }

    /// Parameter converted through `T`'s own `FromStr` (enums and the like),
    /// with the registered parser for `T` as fallback.
    pub fn choice<T: FromStr + Any + Send>(name: impl Into<String>) -> Self {
        Self {
            converter: Some(from_str_value::<T>),
            ..Self::of::<T>(name)
        }
    }

    /// Consume every remaining token, re-joined with single spaces.
    /// Only valid on the last parameter.
    pub fn remainder(mut self) -> Self {
        self.remainder = true;
        self
    }

    /// Post-parse transform; its error fails the argument build.
    pub fn ensure<T, U, F>(mut self, f: F) -> Self
    where
        T: Any + Send,
        U: Any + Send,
        F: Fn(T) -> Result<U> + Send + 'static,
    {
        self.ensure_input = Some(TypeKey::of::<T>());
        self.ensure = Some(Box::new(move |value: Value| {
            let v = value
                .downcast::<T>()
                .map_err(|_| anyhow!("ensure expected a {}", std::any::type_name::<T>()))?;
            f(*v).map(|u| Box::new(u) as Value)
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn is_remainder(&self) -> bool {
        self.remainder
    }

    pub fn converter(&self) -> Option<Converter> {
        self.converter
    }

    pub(crate) fn apply_ensure(&self, value: Value) -> Result<Value> {
        match &self.ensure {
            Some(f) => f(value),
            None => Ok(value),
        }
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("type", &self.key.name())
            .field("remainder", &self.remainder)
            .field("ensure", &self.ensure.is_some())
            .finish()
    }
}

/* ---- Parsed Arguments ---- */

/// Typed arguments handed to a handler, in parameter order.
pub struct Args {
    values: Vec<Option<Value>>,
}

impl Args {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow argument `idx` as a `T`.
    pub fn get<T: Any>(&self, idx: usize) -> Result<&T> {
        let slot = self
            .values
            .get(idx)
            .ok_or_else(|| anyhow!("no argument at position {idx}"))?;
        let value = slot
            .as_ref()
            .ok_or_else(|| anyhow!("argument {idx} was already taken"))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| anyhow!("argument {idx} is not a {}", std::any::type_name::<T>()))
    }

    /// Move argument `idx` out as a `T`.
    pub fn take<T: Any>(&mut self, idx: usize) -> Result<T> {
        // check the type before moving the value out of its slot
        self.get::<T>(idx)?;
        match self.values[idx].take().map(|v| v.downcast::<T>()) {
            Some(Ok(v)) => Ok(*v),
            _ => bail!("argument {idx} is not a {}", std::any::type_name::<T>()),
        }
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args").field("len", &self.len()).finish()
    }
}

/* ---- Handlers ---- */

/// The callable bound to a command.
pub enum Handler {
    /// Runs to completion inside `execute`.
    Sync(Box<dyn Fn(Args) -> Result<()> + Send>),
    /// Produces a task that is submitted to the dispatcher's scheduler.
    Suspending(Box<dyn Fn(Args) -> Task + Send>),
}

impl Handler {
    pub fn is_suspending(&self) -> bool {
        matches!(self, Handler::Suspending(_))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Suspending(_) => f.write_str("Handler::Suspending"),
        }
    }
}

/* ---- Command ---- */

pub struct Command {
    name: String,
    priority: i32,
    description: Option<String>,
    params: Vec<Param>,
    preconditions: Vec<Box<dyn Precondition>>,
    handler: Handler,
}

impl Command {
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            priority: 0,
            description: None,
            params: Vec::new(),
            preconditions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn preconditions(&self) -> &[Box<dyn Precondition>] {
        &self.preconditions
    }

    pub(crate) fn preconditions_mut(&mut self) -> &mut [Box<dyn Precondition>] {
        &mut self.preconditions
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn has_remainder(&self) -> bool {
        self.params.last().is_some_and(Param::is_remainder)
    }

    /// Case-insensitive name match over Unicode lowercase mappings.
    pub fn matches(&self, head: &str) -> bool {
        names_match(&self.name, head)
    }

    /// `give <item:String> <amount:i32>`, `say <text:String...>`
    pub fn usage(&self) -> String {
        let mut out = self.name.clone();
        for p in &self.params {
            let dots = if p.is_remainder() { "..." } else { "" };
            out.push_str(&format!(" <{}:{}{}>", p.name(), p.key().name(), dots));
        }
        out
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("params", &self.params)
            .field("preconditions", &self.preconditions.len())
            .field("handler", &self.handler)
            .finish()
    }
}

/// Collects a command's shape; finished by `handler` or `suspending`.
pub struct CommandBuilder {
    name: String,
    priority: i32,
    description: Option<String>,
    params: Vec<Param>,
    preconditions: Vec<Box<dyn Precondition>>,
}

impl CommandBuilder {
    /// Higher priorities are attempted first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Attach a precondition; evaluated in attachment order.
    pub fn precondition(mut self, precondition: impl Precondition + 'static) -> Self {
        self.preconditions.push(Box::new(precondition));
        self
    }

    pub fn handler<F>(self, f: F) -> Result<Command>
    where
        F: Fn(Args) -> Result<()> + Send + 'static,
    {
        self.finish(Handler::Sync(Box::new(f)))
    }

    pub fn suspending<F, Fut>(self, f: F) -> Result<Command>
    where
        F: Fn(Args) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.finish(Handler::Suspending(Box::new(move |args| -> Task {
            Box::pin(f(args))
        })))
    }

    fn finish(self, handler: Handler) -> Result<Command> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            bail!("command name cannot be empty");
        }
        if name.contains(char::is_whitespace) {
            bail!("command name '{}' cannot contain whitespace", name);
        }
        let last = self.params.len().saturating_sub(1);
        if let Some((i, p)) = self
            .params
            .iter()
            .enumerate()
            .find(|(i, p)| p.is_remainder() && *i != last)
        {
            bail!(
                "command '{}': remainder parameter <{}> at position {} must be last",
                name,
                p.name(),
                i
            );
        }
        if let Some(p) = self
            .params
            .iter()
            .find(|p| p.ensure_input.is_some_and(|input| input != p.key))
        {
            bail!(
                "command '{}': ensure on <{}> takes {} but the parameter parses to {}",
                name,
                p.name(),
                p.ensure_input.map_or("?", |k| k.name()),
                p.key
            );
        }
        Ok(Command {
            name,
            priority: self.priority,
            description: self.description,
            params: self.params,
            preconditions: self.preconditions,
            handler,
        })
    }
}

/// Locale-independent case-insensitive comparison of command names.
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/* ---- Registration ---- */

/// A handler-owning type that contributes commands.
///
/// `commands` receives the shared instance so every handler can capture a
/// clone of it; the registry keeps those clones alive.
pub trait CommandModule: Send + Sync + 'static {
    /// Custom parsers the module's parameter types need. Runs before `commands`.
    fn type_parsers(&self, _parsers: &mut TypeParsers) -> Result<()> {
        Ok(())
    }

    fn commands(self: Arc<Self>) -> Result<Vec<Command>>;
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_misplaced_remainder() {
        let err = Command::builder("say")
            .param(Param::of::<String>("text").remainder())
            .param(Param::of::<i32>("times"))
            .handler(|_| Ok(()))
            .unwrap_err();
        assert!(err.to_string().contains("must be last"));
    }

    #[test]
    fn builder_rejects_bad_names() {
        assert!(Command::builder("  ").handler(|_| Ok(())).is_err());
        assert!(Command::builder("two words").handler(|_| Ok(())).is_err());
    }

    #[test]
    fn usage_and_matching() {
        let cmd = Command::builder("Say")
            .priority(3)
            .param(Param::of::<String>("text").remainder())
            .handler(|_| Ok(()))
            .unwrap();
        assert!(cmd.matches("say"));
        assert!(cmd.matches("SAY"));
        assert!(!cmd.matches("sa"));
        assert!(cmd.has_remainder());
        assert_eq!(cmd.usage(), "Say <text:String...>");
        assert_eq!(cmd.priority(), 3);
        assert!(!cmd.handler().is_suspending());
    }

    #[test]
    fn args_get_and_take() {
        let mut args = Args::new(vec![Box::new(5i32) as Value, Box::new("x".to_string())]);
        assert_eq!(*args.get::<i32>(0).unwrap(), 5);
        assert!(args.get::<u8>(0).is_err(), "wrong type");
        assert!(args.take::<i32>(1).is_err(), "wrong type leaves value in place");
        assert_eq!(args.take::<String>(1).unwrap(), "x");
        assert!(args.get::<String>(1).is_err(), "already taken");
        assert!(args.get::<i32>(7).is_err());
    }

    #[test]
    fn ensure_transforms_and_rejects() {
        let p = Param::of::<i32>("amount").ensure(|n: i32| {
            if n > 0 {
                Ok(n as u32)
            } else {
                bail!("must be positive")
            }
        });
        let v = p.apply_ensure(Box::new(4i32)).unwrap();
        assert_eq!(*v.downcast::<u32>().unwrap(), 4);
        assert!(p.apply_ensure(Box::new(-1i32)).is_err());
        assert!(p.apply_ensure(Box::new("wrong".to_string())).is_err());
    }

    #[test]
    fn ensure_input_must_match_param_type() {
        let err = Command::builder("give")
            .param(Param::of::<u32>("amount").ensure(|n: i64| Ok(n * 2)))
            .handler(|_| Ok(()))
            .unwrap_err();
        assert!(err.to_string().contains("ensure on <amount> takes i64"));

        let ok = Command::builder("give")
            .param(Param::of::<u32>("amount").ensure(|n: u32| Ok(n.min(99))))
            .handler(|_| Ok(()));
        assert!(ok.is_ok());
    }
}
