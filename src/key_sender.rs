//! Platform input injection.
//!
//! [`InputSink`] is the narrow fire-and-forget injection boundary used by the
//! macro compiler: key transitions and vertical wheel pulses. [`KeySender`]
//! is the Windows `SendInput` implementation; [`MockSink`] records events for
//! tests without touching the OS.

use std::sync::{Arc, Mutex};

use anyhow::Result;
#[cfg(windows)]
use tracing::debug;
#[cfg(not(windows))]
use tracing::trace;

/// Fire-and-forget input injection. No delivery acknowledgment.
pub trait InputSink: Send + Sync {
    /// Injects one key transition for a virtual-key code.
    fn send_key(&self, vk: u32, pressed: bool);

    /// Injects one vertical wheel pulse. Positive deltas scroll away from
    /// the user.
    fn send_wheel(&self, delta: i32);
}

/// Sends synthetic input through the platform injection API.
///
/// Keys are injected with their hardware scan code so targets that read
/// scan codes (most games) register them.
#[derive(Clone)]
pub struct KeySender;

impl KeySender {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

impl Default for KeySender {
    fn default() -> Self {
        Self
    }
}

/// Virtual-key codes that require KEYEVENTF_EXTENDEDKEY: navigation cluster,
/// arrows, and the right-side / distinguishable modifiers.
#[cfg(windows)]
const EXTENDED_KEYS: &[u32] = &[
    0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, // nav + arrows
    0x2D, 0x2E, // insert, delete
    0xA2, 0xA3, // left/right ctrl
    0xA0, 0xA1, // left/right shift
    0xA4, 0xA5, // left alt, right alt (AltGr)
    0x5D, // apps
];

#[cfg(windows)]
impl InputSink for KeySender {
    fn send_key(&self, vk: u32, pressed: bool) {
        use winapi::um::winuser::{
            MapVirtualKeyW, SendInput, INPUT, INPUT_KEYBOARD, KEYEVENTF_EXTENDEDKEY,
            KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, MAPVK_VK_TO_VSC,
        };

        let mut input: INPUT = unsafe { std::mem::zeroed() };
        input.type_ = INPUT_KEYBOARD;
        // SAFETY: `input` is INPUT_KEYBOARD, so the `ki` union arm is active.
        unsafe {
            let ki = input.u.ki_mut();
            ki.wVk = vk as u16;
            ki.wScan = MapVirtualKeyW(vk, MAPVK_VK_TO_VSC) as u16;
            ki.time = 0;
            ki.dwExtraInfo = 0;
            ki.dwFlags = KEYEVENTF_SCANCODE;
            if EXTENDED_KEYS.contains(&vk) {
                ki.dwFlags |= KEYEVENTF_EXTENDEDKEY;
            }
            if !pressed {
                ki.dwFlags |= KEYEVENTF_KEYUP;
            }
            SendInput(1, &mut input, std::mem::size_of::<INPUT>() as i32);
        }
        debug!(vk, pressed, "injected key transition");
    }

    fn send_wheel(&self, delta: i32) {
        use winapi::um::winuser::{SendInput, INPUT, INPUT_MOUSE, MOUSEEVENTF_WHEEL};

        let mut input: INPUT = unsafe { std::mem::zeroed() };
        input.type_ = INPUT_MOUSE;
        // SAFETY: `input` is INPUT_MOUSE, so the `mi` union arm is active.
        unsafe {
            let mi = input.u.mi_mut();
            mi.dx = 0;
            mi.dy = 0;
            mi.mouseData = delta as u32;
            mi.dwFlags = MOUSEEVENTF_WHEEL;
            mi.time = 0;
            mi.dwExtraInfo = 0;
            SendInput(1, &mut input, std::mem::size_of::<INPUT>() as i32);
        }
        debug!(delta, "injected wheel pulse");
    }
}

#[cfg(not(windows))]
impl InputSink for KeySender {
    fn send_key(&self, vk: u32, pressed: bool) {
        trace!(vk, pressed, "key injection is a no-op on this platform");
    }

    fn send_wheel(&self, delta: i32) {
        trace!(delta, "wheel injection is a no-op on this platform");
    }
}

/// One event recorded by [`MockSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Key { vk: u32, pressed: bool },
    Wheel { delta: i32 },
}

/// An [`InputSink`] that records injected events instead of delivering them.
///
/// Clones share the same event log, so tests can hand one handle to the
/// compiler and keep another for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything injected so far, in order.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().expect("mock sink mutex poisoned").clone()
    }

    /// Drops all recorded events.
    pub fn clear(&self) {
        self.events.lock().expect("mock sink mutex poisoned").clear();
    }
}

impl InputSink for MockSink {
    fn send_key(&self, vk: u32, pressed: bool) {
        self.events
            .lock()
            .expect("mock sink mutex poisoned")
            .push(SinkEvent::Key { vk, pressed });
    }

    fn send_wheel(&self, delta: i32) {
        self.events
            .lock()
            .expect("mock sink mutex poisoned")
            .push(SinkEvent::Wheel { delta });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_sender_creation() {
        let sender = KeySender::new();
        assert!(sender.is_ok());
    }

    #[test]
    fn test_key_sender_clone() {
        let sender = KeySender::new().unwrap();
        let sender2 = sender.clone();
        drop(sender);
        drop(sender2);
    }

    #[test]
    fn test_mock_sink_records_in_order() {
        let sink = MockSink::new();
        sink.send_key(0x41, true);
        sink.send_wheel(-120);
        sink.send_key(0x41, false);

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Key { vk: 0x41, pressed: true },
                SinkEvent::Wheel { delta: -120 },
                SinkEvent::Key { vk: 0x41, pressed: false },
            ]
        );
    }

    #[test]
    fn test_mock_sink_clones_share_log() {
        let sink = MockSink::new();
        let handle = sink.clone();
        handle.send_key(0x0D, true);
        assert_eq!(sink.events().len(), 1);

        sink.clear();
        assert!(handle.events().is_empty());
    }
}
