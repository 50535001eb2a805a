//! Process discovery and focus queries.
//!
//! This module answers two narrow questions for the rest of the crate:
//! which of the configured target executables is currently running
//! (attachment, via `sysinfo`), and which executable owns the foreground
//! window right now (the trigger hook's focus gate, via the platform API).

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

use crate::error::Result;

/// Finds running processes by executable name.
///
/// Uses the `sysinfo` crate to enumerate running processes and match them
/// by name, case-insensitively.
pub struct ProcessFinder {
    system: System,
}

impl Clone for ProcessFinder {
    fn clone(&self) -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for ProcessFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessFinder {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Returns the first of `candidates` that is currently running.
    ///
    /// Candidate order is significant: the caller lists preferred
    /// executable variants first (e.g. an enhanced build before the base
    /// build) and attaches to whichever shows up first.
    pub fn find_running(&mut self, candidates: &[String]) -> Option<String> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        for candidate in candidates {
            let candidate_lower = candidate.to_lowercase();
            let running = self.system.processes().values().any(|process| {
                process
                    .name()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&candidate_lower)
            });
            if running {
                debug!(process = %candidate, "target process found");
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Whether a process whose name contains `process_name` is running.
    pub fn is_process_running(&mut self, process_name: &str) -> bool {
        self.find_running(&[process_name.to_string()]).is_some()
    }
}

/// Returns the executable name of the process owning the foreground window.
///
/// `None` when there is no foreground window or the owning process cannot
/// be opened (elevated targets, exiting processes).
#[cfg(windows)]
pub fn foreground_process_name() -> Option<String> {
    use winapi::shared::minwindef::{DWORD, MAX_PATH};
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::OpenProcess;
    use winapi::um::psapi::GetModuleFileNameExW;
    use winapi::um::winnt::{PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};
    use winapi::um::winuser::{GetForegroundWindow, GetWindowThreadProcessId};

    // SAFETY: plain Win32 queries; every handle opened here is closed before
    // returning.
    unsafe {
        let window = GetForegroundWindow();
        if window.is_null() {
            return None;
        }

        let mut pid: DWORD = 0;
        GetWindowThreadProcessId(window, &mut pid);
        if pid == 0 {
            return None;
        }

        let process = OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, 0, pid);
        if process.is_null() {
            return None;
        }

        let mut buffer = [0u16; MAX_PATH];
        let len = GetModuleFileNameExW(
            process,
            std::ptr::null_mut(),
            buffer.as_mut_ptr(),
            MAX_PATH as DWORD,
        );
        CloseHandle(process);
        if len == 0 {
            return None;
        }

        let full_path = String::from_utf16_lossy(&buffer[..len as usize]);
        let name = full_path
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(&full_path)
            .to_string();
        Some(name)
    }
}

#[cfg(not(windows))]
pub fn foreground_process_name() -> Option<String> {
    None
}

/// Raises this process to the ABOVE_NORMAL priority class so hook and poll
/// latency stay low under load.
#[cfg(windows)]
pub fn elevate_priority() -> Result<()> {
    use winapi::um::processthreadsapi::{GetCurrentProcess, SetPriorityClass};
    use winapi::um::winbase::ABOVE_NORMAL_PRIORITY_CLASS;

    // SAFETY: GetCurrentProcess returns a pseudo-handle that needs no cleanup.
    let ok = unsafe { SetPriorityClass(GetCurrentProcess(), ABOVE_NORMAL_PRIORITY_CLASS) };
    if ok == 0 {
        return Err(crate::error::FksError::priority(
            std::io::Error::last_os_error().to_string(),
        ));
    }
    Ok(())
}

#[cfg(not(windows))]
pub fn elevate_priority() -> Result<()> {
    Ok(())
}
