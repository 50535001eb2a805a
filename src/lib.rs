//! # Frame Key Sender
//!
//! A Windows command-line tool for injecting keystroke macros into a
//! specific process in lock-step with that process's rendered frames.
//!
//! ## Features
//!
//! - Frame-accurate input: the action queue advances on rendered-frame
//!   edges sampled from the RTSS shared memory region, not on wall time
//! - Compact macro grammar (`"m"`, `"enter 2"`, `"a down"`, `"sleep 2R"`)
//!   compiled into queued press/release/wait actions
//! - System-wide trigger keys via a low-level keyboard hook, with
//!   self-injection and foreground-process filtering
//! - Modifier-aware keybinds with edge-triggered dispatch
//! - JSON configuration for ambient tunables (targets, poll interval)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use frame_key_sender::{ActionQueue, KeySender, MacroCompiler};
//!
//! let queue = Arc::new(ActionQueue::new());
//! let sender = KeySender::new().unwrap();
//! let compiler = MacroCompiler::new(Arc::clone(&queue), Arc::new(sender));
//!
//! // Open the in-game phone, move up three entries, confirm.
//! compiler.compile(&["m", "enter", "up 3", "enter"]);
//!
//! // Normally the scheduler drives this once per detected frame edge.
//! while !queue.is_empty() {
//!     queue.advance();
//! }
//! ```
//!
//! ## Configuration
//!
//! Ambient tunables can be provided via JSON files:
//!
//! ```json
//! {
//!   "target_processes": ["GTA5_Enhanced.exe", "GTA5.exe"],
//!   "poll_interval": "1ms",
//!   "elevate_priority": true
//! }
//! ```
//!
//! Macro sequences themselves are embedded literal data, not file
//! configuration.

pub mod compiler;
pub mod config;
pub mod error;
pub mod frame_clock;
pub mod hook;
pub mod key_sender;
pub mod keybind;
pub mod keymap;
pub mod process_finder;
pub mod scheduler;

pub use compiler::MacroCompiler;
pub use config::Config;
pub use error::{FksError, Result};
pub use frame_clock::{FrameClock, FrameEdgeDetector, MockFrameClock};
pub use key_sender::{InputSink, KeySender, MockSink};
pub use keybind::{Decision, KeybindTable};
pub use process_finder::ProcessFinder;
pub use scheduler::{ActionQueue, Scheduler, DEFAULT_POLL_INTERVAL};
