//! Macro token compiler.
//!
//! Compiles token sequences of the form `name[ modifier][R]` into queued
//! input actions. `modifier` is the literal `down`, the literal `up`, or a
//! decimal repeat count; a trailing `R` marks the produced actions as
//! chained so they drain within a single frame edge.
//!
//! Compilation is a side effect on the action queue and returns nothing. A
//! token that fails to parse or resolve aborts the remainder of the
//! sequence; actions already enqueued by earlier tokens stay queued and will
//! run. That partial execution is accepted and surfaced through diagnostics
//! only.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::key_sender::InputSink;
use crate::keymap;
use crate::scheduler::{ActionFn, ActionQueue};

/// Token grammar: `name[ modifier][R]`.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)\s?(down|up|\d+)?(R)?$").expect("token pattern is valid"));

/// Reserved token that queues pure delay placeholders.
const SLEEP_NAME: &str = "sleep";

/// One wheel detent, as defined by the platform.
const WHEEL_PULSE: i32 = 120;

/// How many press/release repeats of a directional burst share one settle
/// delay. Tuned against the target's input sampling; see queue_directional_burst.
const SETTLE_BATCH: u32 = 2;

/// One parsed token.
#[derive(Debug, PartialEq, Eq)]
struct Token<'a> {
    name: &'a str,
    /// `Some(true)` = press, `Some(false)` = release, `None` = full tap.
    state: Option<bool>,
    amount: u32,
    chain: bool,
}

fn parse_token(token: &str) -> Option<Token<'_>> {
    let caps = TOKEN_PATTERN.captures(token)?;
    let name = caps.get(1)?.as_str();
    let mut state = None;
    let mut amount = 1u32;
    if let Some(arg) = caps.get(2) {
        match arg.as_str() {
            "down" => state = Some(true),
            "up" => state = Some(false),
            digits => amount = digits.parse().ok()?,
        }
    }
    Some(Token {
        name,
        state,
        amount,
        chain: caps.get(3).is_some(),
    })
}

/// Compiles macro token sequences into queued actions.
///
/// Holds the shared action queue and the injection sink; every enqueued
/// operation captures a sink handle by value.
pub struct MacroCompiler {
    queue: Arc<ActionQueue>,
    sink: Arc<dyn InputSink>,
}

impl MacroCompiler {
    pub fn new(queue: Arc<ActionQueue>, sink: Arc<dyn InputSink>) -> Self {
        Self { queue, sink }
    }

    /// The queue this compiler feeds.
    pub fn queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    /// Compiles `tokens` in order, enqueueing their actions.
    ///
    /// Aborts at the first token that fails to parse or resolve; earlier
    /// tokens' actions are not rolled back.
    pub fn compile(&self, tokens: &[&str]) {
        let _ = self.compile_tokens(tokens);
    }

    /// Like [`compile`](Self::compile), but appends `on_complete` as one
    /// final chained action, and only when the whole sequence compiled.
    pub fn compile_with_callback(
        &self,
        tokens: &[&str],
        on_complete: impl FnOnce() + Send + 'static,
    ) {
        if self.compile_tokens(tokens) {
            self.queue.enqueue(0, Some(Box::new(on_complete)), true);
        }
    }

    /// Returns a trigger action that compiles `tokens` on the next frame
    /// edge, skipped entirely while a previous burst is still queued.
    pub fn binding(
        self: &Arc<Self>,
        tokens: &'static [&'static str],
    ) -> Box<dyn Fn() + Send + Sync> {
        let compiler = Arc::clone(self);
        Box::new(move || {
            if !compiler.queue.is_empty() {
                debug!("macro burst still queued, ignoring trigger");
                return;
            }
            let inner = Arc::clone(&compiler);
            compiler
                .queue
                .enqueue(0, Some(Box::new(move || inner.compile(tokens))), false);
        })
    }

    fn compile_tokens(&self, tokens: &[&str]) -> bool {
        for token in tokens {
            let Some(parsed) = parse_token(token) else {
                warn!(%token, "unparseable macro token, aborting remainder of sequence");
                return false;
            };

            if parsed.name == SLEEP_NAME {
                for _ in 0..parsed.amount {
                    self.queue.enqueue(0, None, parsed.chain);
                }
                continue;
            }

            let Some(vk) = keymap::lookup(parsed.name) else {
                warn!(%token, "unresolvable key name, aborting remainder of sequence");
                return false;
            };
            debug!(%token, vk, "compiled macro token");

            if parsed.state.is_none()
                && parsed.amount > 1
                && matches!(parsed.name, "up" | "down")
            {
                let pulse = if parsed.name == "up" { WHEEL_PULSE } else { -WHEEL_PULSE };
                self.queue_directional_burst(vk, parsed.amount, pulse, parsed.chain);
                continue;
            }

            for _ in 0..parsed.amount {
                self.queue_key(vk, parsed.state, parsed.chain);
            }
        }
        true
    }

    /// Enqueues one key token's transitions. A full tap is a press that
    /// waits for its own edge followed by a release carrying the token's
    /// chain flag.
    fn queue_key(&self, vk: u32, state: Option<bool>, chain: bool) {
        match state {
            Some(pressed) => self.queue_transition(vk, pressed, chain),
            None => {
                self.queue_transition(vk, true, false);
                self.queue_transition(vk, false, chain);
            }
        }
    }

    fn queue_transition(&self, vk: u32, pressed: bool, chain: bool) {
        let sink = Arc::clone(&self.sink);
        let op: ActionFn = Box::new(move || sink.send_key(vk, pressed));
        self.queue.enqueue(0, Some(op), chain);
    }

    /// Expansion for repeated menu-navigation arrows (`up N` / `down N`).
    ///
    /// The target drops discrete repeated presses delivered on the same
    /// frame, so each repeat is a press gated on its own edge, its release
    /// and a same-direction wheel pulse chained behind it, and every
    /// SETTLE_BATCH repeats an extra one-edge settle delay. The constants
    /// are tuned for one particular target build and do not generalize.
    fn queue_directional_burst(&self, vk: u32, amount: u32, pulse: i32, chain: bool) {
        for i in 0..amount {
            self.queue_transition(vk, true, false);
            self.queue_transition(vk, false, true);

            let sink = Arc::clone(&self.sink);
            let op: ActionFn = Box::new(move || sink.send_wheel(pulse));
            self.queue.enqueue(0, Some(op), true);

            if (i + 1) % SETTLE_BATCH == 0 {
                self.queue.enqueue(1, None, chain);
            }
        }
    }
}
