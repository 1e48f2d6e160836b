/*!
precondition.rs - gates evaluated before a command's arguments are built.

Variants:
  Cooldown  (usage quota per reset window; the only variant the dispatcher
             inspects for diagnostics)
  Predicate (closure returning bool)
  Gate      (shared on/off switch a host flips at runtime)

`check` takes `&mut self`: state is mutated in place and the dispatcher's
`&mut` access is what serializes it.
*/

use anyhow::{Result, anyhow};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::utils::human_duration;

/// A gate attached to a command. New variants only need `check`.
pub trait Precondition: Send {
    /// Whether the command may run now. May log or mutate internal counters.
    fn check(&mut self) -> bool;

    /// Downcast hook used for cooldown diagnostics.
    fn as_cooldown(&self) -> Option<&Cooldown> {
        None
    }

    /// Short label for listings.
    fn describe(&self) -> String {
        "precondition".to_string()
    }
}

/* ---- Cooldown ---- */

/// At most `max_uses` successful checks per `window`.
///
/// The first check opens a window; once `reset_at` has passed the next check
/// clears the counter and opens a fresh one.
#[derive(Debug, Clone)]
pub struct Cooldown {
    window: Duration,
    max_uses: u32,
    uses: u32,
    reset_at: Option<Instant>,
}

impl Cooldown {
    pub fn new(window: Duration, max_uses: u32) -> Self {
        Self {
            window,
            max_uses,
            uses: 0,
            reset_at: None,
        }
    }

    /// Window given in (possibly fractional) seconds. Negative, NaN and
    /// out-of-range values are rejected.
    pub fn from_secs(seconds: f64, max_uses: u32) -> Result<Self> {
        let window = Duration::try_from_secs_f64(seconds)
            .map_err(|e| anyhow!("invalid cooldown window {seconds}s: {e}"))?;
        Ok(Self::new(window, max_uses))
    }

    /// `check` against an explicit clock reading.
    pub fn check_at(&mut self, now: Instant) -> bool {
        if self.reset_at.is_none_or(|at| now >= at) {
            self.uses = 0;
            self.reset_at = Some(now + self.window);
        }
        if self.uses >= self.max_uses {
            return false;
        }
        self.uses += 1;
        true
    }

    pub fn max_uses(&self) -> u32 {
        self.max_uses
    }

    pub fn uses(&self) -> u32 {
        self.uses
    }

    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.uses)
    }

    /// End of the current window; `None` before the first check.
    pub fn time_until_reset(&self, now: Instant) -> Duration {
        self.reset_at
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or_default()
    }

    /// Log line emitted when this cooldown blocks `command`.
    pub fn diagnostic(&self, command: &str, now: Instant) -> String {
        format!(
            "The cooldown for command {} failed. The cooldown has {} uses left and will reset in {}",
            command,
            self.remaining_uses(),
            human_duration(self.time_until_reset(now))
        )
    }
}

impl Precondition for Cooldown {
    fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    fn as_cooldown(&self) -> Option<&Cooldown> {
        Some(self)
    }

    fn describe(&self) -> String {
        format!("cooldown({}x/{})", self.max_uses, human_duration(self.window))
    }
}

/* ---- Predicate ---- */

/// Closure-backed precondition.
pub struct Predicate<F> {
    label: String,
    f: F,
}

impl<F> Predicate<F>
where
    F: FnMut() -> bool + Send,
{
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> Precondition for Predicate<F>
where
    F: FnMut() -> bool + Send,
{
    fn check(&mut self) -> bool {
        (self.f)()
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl<F> fmt::Debug for Predicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("label", &self.label)
            .finish()
    }
}

/* ---- Gate ---- */

/// Passes while the shared flag is set. Clones share the flag.
#[derive(Debug, Clone)]
pub struct Gate {
    open: Arc<AtomicBool>,
}

impl Gate {
    pub fn new(open: bool) -> Self {
        Self {
            open: Arc::new(AtomicBool::new(open)),
        }
    }

    pub fn set(&self, open: bool) {
        self.open.store(open, Ordering::Relaxed);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}

impl Precondition for Gate {
    fn check(&mut self) -> bool {
        self.is_open()
    }

    fn describe(&self) -> String {
        "gate".to_string()
    }
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_single_use() {
        let start = Instant::now();
        let mut cd = Cooldown::new(Duration::from_secs(30), 1);
        assert!(cd.check_at(start));
        assert!(!cd.check_at(start + Duration::from_secs(1)));
        assert_eq!(cd.remaining_uses(), 0);
        assert_eq!(
            cd.time_until_reset(start + Duration::from_secs(10)),
            Duration::from_secs(20)
        );
    }

    #[test]
    fn cooldown_resets_after_window() {
        let start = Instant::now();
        let mut cd = Cooldown::new(Duration::from_secs(5), 2);
        assert!(cd.check_at(start));
        assert!(cd.check_at(start));
        assert!(!cd.check_at(start + Duration::from_secs(4)));

        assert!(cd.check_at(start + Duration::from_secs(5)));
        assert_eq!(cd.uses(), 1);
        assert_eq!(cd.remaining_uses(), 1);
    }

    #[test]
    fn cooldown_zero_quota_never_passes() {
        let mut cd = Cooldown::from_secs(1.0, 0).unwrap();
        assert_eq!(cd.max_uses(), 0);
        assert!(!cd.check());
    }

    #[test]
    fn cooldown_rejects_unrepresentable_windows() {
        assert!(Cooldown::from_secs(f64::INFINITY, 1).is_err());
        assert!(Cooldown::from_secs(f64::NAN, 1).is_err());
        assert!(Cooldown::from_secs(-1.0, 1).is_err());
        assert!(Cooldown::from_secs(1e30, 1).is_err());
        let cd = Cooldown::from_secs(2.5, 1).unwrap();
        assert_eq!(cd.describe(), "cooldown(1x/2.5s)");
    }

    #[test]
    fn cooldown_diagnostic_mentions_command_and_time() {
        let start = Instant::now();
        let mut cd = Cooldown::new(Duration::from_secs(90), 1);
        cd.check_at(start);
        let msg = cd.diagnostic("heal", start);
        assert!(msg.contains("heal"));
        assert!(msg.contains("0 uses left"));
        assert!(msg.contains("1m 30s"));
    }

    #[test]
    fn predicate_and_gate() {
        let mut calls = 0;
        let mut p = Predicate::new("even", move || {
            calls += 1;
            calls % 2 == 0
        });
        assert!(!p.check());
        assert!(p.check());
        assert!(p.as_cooldown().is_none());

        let gate = Gate::new(true);
        let mut attached = gate.clone();
        assert!(attached.check());
        gate.set(false);
        assert!(!attached.check());
    }
}
