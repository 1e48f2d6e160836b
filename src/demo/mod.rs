/*!
Bundled chat-game command set.

Used by the CLI host and as a worked example of registering a module:

  say <text...>              post a chat line (remainder parameter)
  give <item> <amount>       add to inventory; amount must be 1..=99
  hit <amount>               take damage
  heal                       priority 10: full heal, on a cooldown
  heal                       priority 5: +1 hp while below max
  speed <factor>             clamped to 0.25..=4.0
  spawn <enemy>              enum parameter; gated by pause/resume + cooldown
  pause / resume             close / open the spawn gate
  link <url>                 http(s) URL via a custom parser
  wait <seconds>             suspending; runs on the scheduler
  status                     log the current state
*/

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

use crate::config::{Config, CooldownConfig};
use crate::dispatch::{
    ArgumentParser, Args, Command, CommandModule, Gate, Param, Predicate, TypeParsers,
};
use crate::log_info;

pub const HEAL_COOLDOWN: CooldownConfig = CooldownConfig::new(30.0, 1);
pub const SPAWN_COOLDOWN: CooldownConfig = CooldownConfig::new(10.0, 3);

const MAX_HP: u32 = 9;
const MAX_WAIT_SECS: f64 = 30.0;

/* ---- Parameter Types ---- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Enemy {
    Crawlid,
    Vengefly,
    Gruzzer,
    Aspid,
}

impl FromStr for Enemy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crawlid" => Ok(Enemy::Crawlid),
            "vengefly" => Ok(Enemy::Vengefly),
            "gruzzer" => Ok(Enemy::Gruzzer),
            "aspid" => Ok(Enemy::Aspid),
            other => bail!("unknown enemy '{other}'"),
        }
    }
}

impl fmt::Display for Enemy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Enemy::Crawlid => "crawlid",
            Enemy::Vengefly => "vengefly",
            Enemy::Gruzzer => "gruzzer",
            Enemy::Aspid => "aspid",
        };
        f.write_str(s)
    }
}

/// Accepts absolute http / https URLs only.
pub struct UrlParser;

impl ArgumentParser for UrlParser {
    type Output = Url;

    fn parse(&self, token: &str) -> Result<Url> {
        let url = Url::parse(token).with_context(|| format!("invalid URL '{token}'"))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => bail!("unsupported URL scheme '{other}'"),
        }
    }
}

/* ---- State ---- */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameState {
    pub hp: u32,
    pub max_hp: u32,
    pub speed: f32,
    pub inventory: BTreeMap<String, u32>,
    pub spawned: Vec<Enemy>,
    pub links: Vec<String>,
    pub chat: Vec<String>,
    pub waited: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            hp: 5,
            max_hp: MAX_HP,
            speed: 1.0,
            inventory: BTreeMap::new(),
            spawned: Vec::new(),
            links: Vec::new(),
            chat: Vec::new(),
            waited: 0,
        }
    }
}

/// Handler-owning instance; every command closure holds a clone of the `Arc`.
pub struct ChatGame {
    heal_cooldown: CooldownConfig,
    spawn_cooldown: CooldownConfig,
    spawning: Gate,
    state: Mutex<GameState>,
}

impl ChatGame {
    pub fn new(config: &Config) -> Self {
        Self {
            heal_cooldown: config.cooldown_for("heal", HEAL_COOLDOWN),
            spawn_cooldown: config.cooldown_for("spawn", SPAWN_COOLDOWN),
            spawning: Gate::new(true),
            state: Mutex::new(GameState::default()),
        }
    }

    pub fn snapshot(&self) -> Result<GameState> {
        Ok(self.state()?.clone())
    }

    /// Handle to the switch behind `pause` / `resume`.
    pub fn spawning(&self) -> Gate {
        self.spawning.clone()
    }

    fn state(&self) -> Result<MutexGuard<'_, GameState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("game state lock poisoned"))
    }
}

impl Default for ChatGame {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/* ---- Commands ---- */

impl CommandModule for ChatGame {
    fn type_parsers(&self, parsers: &mut TypeParsers) -> Result<()> {
        parsers.add_type_parser(UrlParser)
    }

    fn commands(self: Arc<Self>) -> Result<Vec<Command>> {
        let mut out = Vec::new();

        let game = self.clone();
        out.push(
            Command::builder("say")
                .describe("Post a chat message")
                .param(Param::of::<String>("text").remainder())
                .handler(move |mut args: Args| {
                    let text = args.take::<String>(0)?;
                    log_info!("[chat] {text}");
                    game.state()?.chat.push(text);
                    Ok(())
                })?,
        );

        let game = self.clone();
        out.push(
            Command::builder("give")
                .describe("Add items to the inventory")
                .param(Param::of::<String>("item"))
                .param(Param::of::<u32>("amount").ensure(|n: u32| {
                    if (1..=99).contains(&n) {
                        Ok(n)
                    } else {
                        bail!("amount must be between 1 and 99, got {n}")
                    }
                }))
                .handler(move |mut args: Args| {
                    let item = args.take::<String>(0)?.to_ascii_lowercase();
                    let amount = args.take::<u32>(1)?;
                    let mut state = game.state()?;
                    let total = state.inventory.entry(item.clone()).or_insert(0);
                    *total = total.saturating_add(amount);
                    log_info!("[give] {amount} {item} (now {total})");
                    Ok(())
                })?,
        );

        let game = self.clone();
        out.push(
            Command::builder("hit")
                .describe("Take damage")
                .param(Param::of::<u32>("amount"))
                .handler(move |args: Args| {
                    let amount = *args.get::<u32>(0)?;
                    let mut state = game.state()?;
                    state.hp = state.hp.saturating_sub(amount);
                    log_info!("[hit] -{amount} hp ({}/{})", state.hp, state.max_hp);
                    Ok(())
                })?,
        );

        let game = self.clone();
        out.push(
            Command::builder("heal")
                .describe("Full heal")
                .priority(10)
                .precondition(self.heal_cooldown.to_cooldown()?)
                .handler(move |_| {
                    let mut state = game.state()?;
                    state.hp = state.max_hp;
                    log_info!("[heal] focus: hp restored to {}", state.hp);
                    Ok(())
                })?,
        );

        let (game, probe) = (self.clone(), self.clone());
        out.push(
            Command::builder("heal")
                .describe("Recover one hp")
                .priority(5)
                .precondition(Predicate::new("hp below max", move || {
                    probe
                        .state()
                        .map(|s| s.hp < s.max_hp)
                        .unwrap_or(false)
                }))
                .handler(move |_| {
                    let mut state = game.state()?;
                    state.hp = (state.hp + 1).min(state.max_hp);
                    log_info!("[heal] +1 hp ({}/{})", state.hp, state.max_hp);
                    Ok(())
                })?,
        );

        let game = self.clone();
        out.push(
            Command::builder("speed")
                .describe("Set the game speed multiplier")
                .param(Param::of::<f32>("factor").ensure(|f: f32| {
                    if !f.is_finite() {
                        bail!("speed must be a finite number");
                    }
                    Ok(f.clamp(0.25, 4.0))
                }))
                .handler(move |args: Args| {
                    let factor = *args.get::<f32>(0)?;
                    game.state()?.speed = factor;
                    log_info!("[speed] x{factor}");
                    Ok(())
                })?,
        );

        let game = self.clone();
        out.push(
            Command::builder("spawn")
                .describe("Spawn an enemy")
                .param(Param::choice::<Enemy>("enemy"))
                .precondition(self.spawning.clone())
                .precondition(self.spawn_cooldown.to_cooldown()?)
                .handler(move |mut args: Args| {
                    let enemy = args.take::<Enemy>(0)?;
                    game.state()?.spawned.push(enemy);
                    log_info!("[spawn] {enemy}");
                    Ok(())
                })?,
        );

        let gate = self.spawning.clone();
        out.push(
            Command::builder("pause")
                .describe("Stop accepting spawn requests")
                .handler(move |_| {
                    gate.set(false);
                    log_info!("[pause] spawning disabled");
                    Ok(())
                })?,
        );

        let gate = self.spawning.clone();
        out.push(
            Command::builder("resume")
                .describe("Accept spawn requests again")
                .handler(move |_| {
                    gate.set(true);
                    log_info!("[resume] spawning enabled");
                    Ok(())
                })?,
        );

        let game = self.clone();
        out.push(
            Command::builder("link")
                .describe("Share a link")
                .param(Param::of::<Url>("url"))
                .handler(move |mut args: Args| {
                    let url = args.take::<Url>(0)?;
                    log_info!("[link] {url}");
                    game.state()?.links.push(url.to_string());
                    Ok(())
                })?,
        );

        let game = self.clone();
        out.push(
            Command::builder("wait")
                .describe("Wait a while, then report back")
                .param(Param::of::<f64>("seconds").ensure(|s: f64| {
                    if !s.is_finite() || s < 0.0 {
                        bail!("seconds must be a non-negative number");
                    }
                    Ok(Duration::from_secs_f64(s.min(MAX_WAIT_SECS)))
                }))
                .suspending(move |mut args: Args| {
                    let game = game.clone();
                    let delay = args.take::<Duration>(0);
                    async move {
                        let delay = delay?;
                        tokio::time::sleep(delay).await;
                        game.state()?.waited += 1;
                        log_info!("[wait] done after {:?}", delay);
                        anyhow::Ok(())
                    }
                })?,
        );

        let game = self;
        out.push(
            Command::builder("status")
                .describe("Log the current game state")
                .handler(move |_| {
                    let state = game.snapshot()?;
                    log_info!(
                        "[status] hp {}/{} speed x{} items {} spawned {} links {}",
                        state.hp,
                        state.max_hp,
                        state.speed,
                        state.inventory.values().sum::<u32>(),
                        state.spawned.len(),
                        state.links.len()
                    );
                    Ok(())
                })?,
        );

        Ok(out)
    }
}

/* ---- Tests ---- */
