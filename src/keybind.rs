//! Keybind table and trigger dispatch.
//!
//! A [`Keybind`] associates a trigger key with an action and an optional set
//! of modifier codes. Dispatch implements a per-bind Released → Pressed →
//! Released state machine: the action fires exactly once per genuine
//! key-down edge, key-repeat events while held are ignored, and a bind with
//! modifiers fires only while every modifier currently reads as held.
//!
//! Events for codes with a registered bind are swallowed on both edges;
//! everything else passes through to the rest of the input pipeline.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{FksError, Result};
use crate::keymap;

/// What the hook should do with a physical event after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Handled; do not propagate to the rest of the system.
    Swallow,
    /// Not ours; forward unmodified.
    Pass,
}

/// Action invoked when a bind fires.
pub type BindAction = Box<dyn Fn() + Send + Sync>;

/// One registered trigger binding.
pub struct Keybind {
    trigger: u32,
    modifiers: Vec<u32>,
    action: BindAction,
    held: AtomicBool,
}

impl Keybind {
    /// Whether this bind's trigger is currently between key-down and key-up.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

/// All keybinds, registered once at startup. After registration only the
/// per-bind held state and the observed held-code set mutate.
#[derive(Default)]
pub struct KeybindTable {
    binds: Vec<Keybind>,
    /// Every code currently observed down via genuine events, bound or not.
    /// This is what modifier checks read.
    held_codes: Mutex<HashSet<u32>>,
}

impl KeybindTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bind for a raw virtual-key trigger code.
    pub fn bind(&mut self, trigger: u32, modifiers: &[u32], action: BindAction) {
        self.binds.push(Keybind {
            trigger,
            modifiers: modifiers.to_vec(),
            action,
            held: AtomicBool::new(false),
        });
    }

    /// Registers a bind by key names, resolving them through the registry.
    pub fn bind_named(&mut self, trigger: &str, modifiers: &[&str], action: BindAction) -> Result<()> {
        let trigger_code = keymap::lookup(trigger).ok_or_else(|| FksError::unknown_key(trigger))?;
        let modifier_codes = modifiers
            .iter()
            .map(|name| keymap::lookup(name).ok_or_else(|| FksError::unknown_key(*name)))
            .collect::<Result<Vec<u32>>>()?;
        self.bind(trigger_code, &modifier_codes, action);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Whether `code` currently reads as held: the observed held-code set
    /// first, falling back to the held state of a bind registered for it.
    pub fn is_held(&self, code: u32) -> bool {
        if self
            .held_codes
            .lock()
            .expect("held code set mutex poisoned")
            .contains(&code)
        {
            return true;
        }
        self.binds
            .iter()
            .any(|bind| bind.trigger == code && bind.is_held())
    }

    /// Dispatches one physical key event.
    ///
    /// Synthetic (self-injected) events are ignored for matching and passed
    /// through; the caller is expected to have applied the foreground gate
    /// already. Genuine events update the held-code set before matching.
    pub fn dispatch(&self, code: u32, pressed: bool, injected: bool) -> Decision {
        if injected {
            return Decision::Pass;
        }

        {
            let mut held = self
                .held_codes
                .lock()
                .expect("held code set mutex poisoned");
            if pressed {
                held.insert(code);
            } else {
                held.remove(&code);
            }
        }

        let mut matched = false;
        for bind in &self.binds {
            if bind.trigger != code {
                continue;
            }
            matched = true;
            if pressed {
                if !bind.is_held() && self.modifiers_held(&bind.modifiers) {
                    bind.held.store(true, Ordering::SeqCst);
                    debug!(code, "keybind fired");
                    (bind.action)();
                }
            } else {
                bind.held.store(false, Ordering::SeqCst);
            }
        }

        if matched {
            Decision::Swallow
        } else {
            Decision::Pass
        }
    }

    fn modifiers_held(&self, modifiers: &[u32]) -> bool {
        modifiers.iter().all(|&code| self.is_held(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    const VK_SHIFT: u32 = 0x10;
    const VK_F2: u32 = 0x71;

    fn counting_table(trigger: u32, modifiers: &[u32]) -> (KeybindTable, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut table = KeybindTable::new();
        table.bind(
            trigger,
            modifiers,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (table, fired)
    }

    #[test]
    fn test_key_down_fires_once_and_swallows() {
        let (table, fired) = counting_table(VK_F2, &[]);

        assert_eq!(table.dispatch(VK_F2, true, false), Decision::Swallow);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_repeat_does_not_refire_until_release() {
        let (table, fired) = counting_table(VK_F2, &[]);

        table.dispatch(VK_F2, true, false);
        // Auto-repeat delivers more down events while held.
        table.dispatch(VK_F2, true, false);
        table.dispatch(VK_F2, true, false);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert_eq!(table.dispatch(VK_F2, false, false), Decision::Swallow);
        table.dispatch(VK_F2, true, false);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unbound_codes_pass_through() {
        let (table, fired) = counting_table(VK_F2, &[]);

        assert_eq!(table.dispatch(0x41, true, false), Decision::Pass);
        assert_eq!(table.dispatch(0x41, false, false), Decision::Pass);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_injected_events_are_ignored_and_passed() {
        let (table, fired) = counting_table(VK_F2, &[]);

        assert_eq!(table.dispatch(VK_F2, true, true), Decision::Pass);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!table.is_held(VK_F2));
    }

    #[test]
    fn test_modifier_must_be_held_when_trigger_arrives() {
        let (table, fired) = counting_table(VK_F2, &[VK_SHIFT]);

        // Without shift: swallowed (bound code) but no fire.
        assert_eq!(table.dispatch(VK_F2, true, false), Decision::Swallow);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        table.dispatch(VK_F2, false, false);

        // Shift down, then the trigger: fires.
        table.dispatch(VK_SHIFT, true, false);
        table.dispatch(VK_F2, true, false);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        table.dispatch(VK_F2, false, false);
        table.dispatch(VK_SHIFT, false, false);

        // Shift released first: pressing the trigger must not fire.
        table.dispatch(VK_SHIFT, true, false);
        table.dispatch(VK_SHIFT, false, false);
        table.dispatch(VK_F2, true, false);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_modifier_state_tracked_for_unbound_codes() {
        let (table, _fired) = counting_table(VK_F2, &[VK_SHIFT]);

        // Shift has no bind of its own; its events pass through but still
        // update the held-code set used by modifier checks.
        assert_eq!(table.dispatch(VK_SHIFT, true, false), Decision::Pass);
        assert!(table.is_held(VK_SHIFT));
        table.dispatch(VK_SHIFT, false, false);
        assert!(!table.is_held(VK_SHIFT));
    }

    #[test]
    fn test_is_held_falls_back_to_bind_state() {
        let (table, _fired) = counting_table(VK_F2, &[]);

        table.dispatch(VK_F2, true, false);
        assert!(table.is_held(VK_F2));
        table.dispatch(VK_F2, false, false);
        assert!(!table.is_held(VK_F2));
    }

    #[test]
    fn test_bind_named_resolves_through_registry() {
        let mut table = KeybindTable::new();
        let result = table.bind_named("f2", &["shift"], Box::new(|| {}));
        assert!(result.is_ok());
        assert_eq!(table.len(), 1);

        // The single-character layout fallback only exists on Windows, so an
        // unknown word is a hard miss elsewhere.
        #[cfg(not(windows))]
        {
            let result = table.bind_named("definitelynotakey42", &[], Box::new(|| {}));
            assert!(matches!(result, Err(FksError::UnknownKey { .. })));
        }
    }

    #[test]
    fn test_two_binds_same_trigger_both_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut table = KeybindTable::new();
        for _ in 0..2 {
            let counter = Arc::clone(&fired);
            table.bind(
                VK_F2,
                &[],
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        table.dispatch(VK_F2, true, false);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
