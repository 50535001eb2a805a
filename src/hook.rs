//! System-wide keyboard interception.
//!
//! Installs a WH_KEYBOARD_LL hook on a dedicated Win32 message-loop thread
//! and routes genuine key edges to the [`KeybindTable`]. Two guards keep the
//! process from triggering itself: events carrying the injected flag are
//! never matched, and events arriving while the target application is not
//! the foreground window are ignored. Both kinds still propagate to the rest
//! of the input pipeline; only matched, genuine, foregrounded events are
//! swallowed.
//!
//! The hook lives for the remainder of the process once installed; there is
//! no uninstall path because the tool's lifetime is the automation session.

use std::sync::Arc;

use crate::error::Result;
use crate::keybind::KeybindTable;

/// Shared state the hook callback reads on every event.
#[cfg(windows)]
struct HookShared {
    table: Arc<KeybindTable>,
    /// Executable name of the attached target process.
    target: String,
}

#[cfg(windows)]
static HOOK_SHARED: std::sync::OnceLock<HookShared> = std::sync::OnceLock::new();

/// Installs the low-level keyboard hook and starts its message loop thread.
///
/// `target` is the executable name the foreground gate compares against.
/// Fails if a hook is already installed in this process or the platform
/// rejects the hook. Only one install per process.
#[cfg(windows)]
pub fn install(table: Arc<KeybindTable>, target: String) -> Result<()> {
    use std::sync::mpsc;

    use crate::error::FksError;

    HOOK_SHARED
        .set(HookShared { table, target })
        .map_err(|_| FksError::hook("keyboard hook already installed in this process"))?;

    let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(), String>>();

    std::thread::Builder::new()
        .name("fks-hook-loop".to_string())
        .spawn(move || run_hook_message_loop(ready_tx))
        .map_err(|e| FksError::hook(e.to_string()))?;

    ready_rx
        .recv()
        .map_err(|_| FksError::hook("hook thread exited before reporting status"))?
        .map_err(FksError::hook)
}

#[cfg(not(windows))]
pub fn install(_table: Arc<KeybindTable>, _target: String) -> Result<()> {
    Err(crate::error::FksError::unsupported_platform(
        "low-level keyboard hooks are Windows only",
    ))
}

/// Dedicated hook thread: installs the hook, reports the result, then pumps
/// messages for the lifetime of the process.
#[cfg(windows)]
fn run_hook_message_loop(ready: std::sync::mpsc::Sender<std::result::Result<(), String>>) {
    use winapi::um::libloaderapi::GetModuleHandleW;
    use winapi::um::winuser::{
        DispatchMessageW, GetMessageW, SetWindowsHookExW, TranslateMessage, MSG, WH_KEYBOARD_LL,
    };

    // SAFETY: a WH_KEYBOARD_LL hook needs no module handle for its own
    // process, and this thread runs the required message loop below.
    let hook = unsafe {
        SetWindowsHookExW(
            WH_KEYBOARD_LL,
            Some(keyboard_hook_proc),
            GetModuleHandleW(std::ptr::null()),
            0,
        )
    };
    if hook.is_null() {
        let _ = ready.send(Err(format!(
            "SetWindowsHookEx failed: {}",
            std::io::Error::last_os_error()
        )));
        return;
    }
    let _ = ready.send(Ok(()));
    tracing::info!("low-level keyboard hook installed");

    // SAFETY: standard Win32 GetMessage/DispatchMessage pump.
    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        while GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) > 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Low-level keyboard hook callback. Must return quickly; everything heavy
/// a bound action does is deferred through the action queue.
#[cfg(windows)]
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: usize,
    l_param: isize,
) -> isize {
    use winapi::um::winuser::{
        CallNextHookEx, HC_ACTION, KBDLLHOOKSTRUCT, LLKHF_INJECTED, WM_KEYDOWN, WM_KEYUP,
        WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    use crate::keybind::Decision;
    use crate::process_finder;

    if n_code == HC_ACTION {
        // SAFETY: for HC_ACTION, l_param points to a KBDLLHOOKSTRUCT.
        let event = &*(l_param as *const KBDLLHOOKSTRUCT);
        let injected = event.flags & LLKHF_INJECTED != 0;

        if let Some(shared) = HOOK_SHARED.get() {
            let pressed = matches!(w_param as u32, WM_KEYDOWN | WM_SYSKEYDOWN);
            let released = matches!(w_param as u32, WM_KEYUP | WM_SYSKEYUP);
            let foreground_is_target = process_finder::foreground_process_name()
                .map(|name| name.eq_ignore_ascii_case(&shared.target))
                .unwrap_or(false);

            if (pressed || released)
                && !injected
                && foreground_is_target
                && shared.table.dispatch(event.vkCode, pressed, injected) == Decision::Swallow
            {
                return 1;
            }
        }
    }

    CallNextHookEx(std::ptr::null_mut(), n_code, w_param, l_param)
}
