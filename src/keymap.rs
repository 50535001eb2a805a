//! Static key-name registry.
//!
//! Maps human-readable key names (lowercase) to Windows virtual-key codes.
//! Lookup is a case-insensitive exact match against the table; a miss falls
//! back to translating the first character through the active keyboard
//! layout (`VkKeyScanW`). No prefix or fuzzy matching.

use tracing::warn;

/// Name → virtual-key code table. Names are lowercase; lookup lowercases
/// its input before matching.
static KEY_TABLE: &[(&str, u32)] = &[
    // Letters (VK_A..VK_Z)
    ("a", 0x41),
    ("b", 0x42),
    ("c", 0x43),
    ("d", 0x44),
    ("e", 0x45),
    ("f", 0x46),
    ("g", 0x47),
    ("h", 0x48),
    ("i", 0x49),
    ("j", 0x4A),
    ("k", 0x4B),
    ("l", 0x4C),
    ("m", 0x4D),
    ("n", 0x4E),
    ("o", 0x4F),
    ("p", 0x50),
    ("q", 0x51),
    ("r", 0x52),
    ("s", 0x53),
    ("t", 0x54),
    ("u", 0x55),
    ("v", 0x56),
    ("w", 0x57),
    ("x", 0x58),
    ("y", 0x59),
    ("z", 0x5A),
    // Digit row
    ("0", 0x30),
    ("1", 0x31),
    ("2", 0x32),
    ("3", 0x33),
    ("4", 0x34),
    ("5", 0x35),
    ("6", 0x36),
    ("7", 0x37),
    ("8", 0x38),
    ("9", 0x39),
    // Function keys
    ("f1", 0x70),
    ("f2", 0x71),
    ("f3", 0x72),
    ("f4", 0x73),
    ("f5", 0x74),
    ("f6", 0x75),
    ("f7", 0x76),
    ("f8", 0x77),
    ("f9", 0x78),
    ("f10", 0x79),
    ("f11", 0x7A),
    ("f12", 0x7B),
    // Whitespace and editing
    ("enter", 0x0D),
    ("return", 0x0D),
    ("space", 0x20),
    ("tab", 0x09),
    ("escape", 0x1B),
    ("esc", 0x1B),
    ("backspace", 0x08),
    ("insert", 0x2D),
    ("delete", 0x2E),
    // Navigation cluster
    ("home", 0x24),
    ("end", 0x23),
    ("pageup", 0x21),
    ("pagedown", 0x22),
    ("up", 0x26),
    ("down", 0x28),
    ("left", 0x25),
    ("right", 0x27),
    // Modifiers
    ("shift", 0x10),
    ("ctrl", 0x11),
    ("control", 0x11),
    ("alt", 0x12),
    ("lshift", 0xA0),
    ("rshift", 0xA1),
    ("lctrl", 0xA2),
    ("rctrl", 0xA3),
    ("lalt", 0xA4),
    ("ralt", 0xA5),
    ("altgr", 0xA5),
    ("win", 0x5B),
    ("lwin", 0x5B),
    ("rwin", 0x5C),
    ("apps", 0x5D),
    // Locks and misc
    ("capslock", 0x14),
    ("numlock", 0x90),
    ("scrolllock", 0x91),
    ("pause", 0x13),
    ("printscreen", 0x2C),
    // Numpad
    ("numpad0", 0x60),
    ("numpad1", 0x61),
    ("numpad2", 0x62),
    ("numpad3", 0x63),
    ("numpad4", 0x64),
    ("numpad5", 0x65),
    ("numpad6", 0x66),
    ("numpad7", 0x67),
    ("numpad8", 0x68),
    ("numpad9", 0x69),
    ("multiply", 0x6A),
    ("add", 0x6B),
    ("subtract", 0x6D),
    ("decimal", 0x6E),
    ("divide", 0x6F),
    // OEM / punctuation (US layout)
    ("semicolon", 0xBA),
    ("plus", 0xBB),
    ("comma", 0xBC),
    ("minus", 0xBD),
    ("period", 0xBE),
    ("slash", 0xBF),
    ("grave", 0xC0),
    ("tilde", 0xC0),
    ("lbracket", 0xDB),
    ("backslash", 0xDC),
    ("rbracket", 0xDD),
    ("quote", 0xDE),
    // Mouse buttons
    ("lbutton", 0x01),
    ("rbutton", 0x02),
    ("mbutton", 0x04),
    ("xbutton1", 0x05),
    ("xbutton2", 0x06),
];

/// Resolves a key name to a virtual-key code.
///
/// Exact (case-insensitive) table match first, then single-character layout
/// translation of the first character. Returns `None` when both miss.
pub fn lookup(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    if let Some(&(_, vk)) = KEY_TABLE.iter().find(|(n, _)| *n == lower) {
        return Some(vk);
    }
    match char_fallback(&lower) {
        Some(vk) => Some(vk),
        None => {
            warn!(key = %name, "failed to resolve key name");
            None
        }
    }
}

/// The full registry, for `--list-keys` style output.
pub fn entries() -> &'static [(&'static str, u32)] {
    KEY_TABLE
}

/// Translates the first character of `name` through the active keyboard
/// layout. The low byte of `VkKeyScanW` is the virtual-key code.
#[cfg(windows)]
fn char_fallback(name: &str) -> Option<u32> {
    use winapi::um::winuser::VkKeyScanW;

    let ch = name.chars().next()?;
    let mut units = [0u16; 2];
    let encoded = ch.encode_utf16(&mut units);
    let scan = unsafe { VkKeyScanW(encoded[0]) };
    if scan == -1 {
        return None;
    }
    Some((scan as u16 & 0xFF) as u32)
}

#[cfg(not(windows))]
fn char_fallback(_name: &str) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_letters_and_digits() {
        assert_eq!(lookup("a"), Some(0x41));
        assert_eq!(lookup("z"), Some(0x5A));
        assert_eq!(lookup("0"), Some(0x30));
        assert_eq!(lookup("9"), Some(0x39));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("ENTER"), Some(0x0D));
        assert_eq!(lookup("F2"), Some(0x71));
        assert_eq!(lookup("Shift"), Some(0x10));
    }

    #[test]
    fn test_lookup_arrows_and_navigation() {
        assert_eq!(lookup("up"), Some(0x26));
        assert_eq!(lookup("down"), Some(0x28));
        assert_eq!(lookup("left"), Some(0x25));
        assert_eq!(lookup("right"), Some(0x27));
        assert_eq!(lookup("pageup"), Some(0x21));
        assert_eq!(lookup("pagedown"), Some(0x22));
    }

    #[test]
    fn test_lookup_aliases_share_codes() {
        assert_eq!(lookup("enter"), lookup("return"));
        assert_eq!(lookup("escape"), lookup("esc"));
        assert_eq!(lookup("grave"), lookup("tilde"));
    }

    #[test]
    fn test_lookup_unknown_multichar_name_misses() {
        // Multi-character names never hit the single-character fallback path
        // with a table match, and the fallback only considers the first
        // character, so an unknown word either misses entirely (non-Windows)
        // or resolves through the layout.
        #[cfg(not(windows))]
        assert_eq!(lookup("xyz123notakey"), None);
    }

    #[test]
    fn test_entries_are_lowercase_and_nonempty() {
        assert!(!entries().is_empty());
        for (name, _) in entries() {
            assert_eq!(*name, name.to_lowercase());
        }
    }
}
