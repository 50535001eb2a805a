//! Frame-time sampling.
//!
//! The scheduler does not tick on wall-clock time; it ticks on frame edges
//! detected in an external frame-time signal. [`FrameClock`] is the sampling
//! boundary, [`RtssFrameClock`] reads the per-application frametime that
//! RivaTuner Statistics Server publishes in its shared memory region, and
//! [`FrameEdgeDetector`] turns raw samples into "a new frame occurred" edges.
//!
//! All raw memory layout knowledge lives in this module; nothing outside it
//! touches the shared region.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Samples the external frame-time signal.
///
/// `None` means "not currently available" and is a neutral no-op for the
/// caller, not an error.
pub trait FrameClock: Send {
    /// Returns the current frame duration in milliseconds, if available.
    fn sample(&mut self) -> Option<f64>;
}

/// Reports an edge whenever the sampled value changes.
///
/// Missing samples read as `0.0`, matching the upstream telemetry format
/// where a zero frametime means "no data". A side effect worth knowing
/// about: a target capped to a perfectly constant frametime produces no
/// edges, because edge detection relies on frametime variance.
#[derive(Debug, Default)]
pub struct FrameEdgeDetector {
    previous: f64,
}

impl FrameEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one sample; returns `true` when it differs from the last one.
    pub fn observe(&mut self, sample: Option<f64>) -> bool {
        let value = sample.unwrap_or(0.0);
        if value != self.previous {
            self.previous = value;
            true
        } else {
            false
        }
    }
}

/// Name of the RTSS shared memory mapping.
#[cfg(windows)]
const RTSS_MAPPING_NAME: &str = "RTSSSharedMemoryV2";

/// Header field offsets: per-entry size, app array offset, app array length.
#[cfg(windows)]
const HDR_ENTRY_SIZE_OFFSET: usize = 8;
#[cfg(windows)]
const HDR_ARR_OFFSET_OFFSET: usize = 12;
#[cfg(windows)]
const HDR_ARR_LEN_OFFSET: usize = 16;

/// Offset of the application name within an app entry.
#[cfg(windows)]
const APP_NAME_OFFSET: usize = 4;

/// Offset of the raw frametime dword within an app entry, in microseconds.
#[cfg(windows)]
const FRAMETIME_OFFSET: usize = 280;

/// Reads the target application's frametime out of the RTSS shared memory
/// region.
///
/// The app-entry address is located once by scanning the entry array for a
/// name containing the target process, then cached for every later sample.
#[cfg(windows)]
pub struct RtssFrameClock {
    map_handle: winapi::um::winnt::HANDLE,
    base: *const u8,
    entry_addr: Option<usize>,
    target: String,
}

// SAFETY: the mapped view is read-only and the handle is only released in
// Drop; moving the struct to the poll thread is fine.
#[cfg(windows)]
unsafe impl Send for RtssFrameClock {}

#[cfg(windows)]
impl RtssFrameClock {
    /// Opens the RTSS shared memory region read-only.
    ///
    /// Fails when RTSS is not running (no mapping to open) or the view
    /// cannot be mapped; both are startup-fatal conditions for the caller.
    pub fn open(target: &str) -> Result<Self> {
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::memoryapi::{MapViewOfFile, OpenFileMappingW, FILE_MAP_READ};

        let wide: Vec<u16> = RTSS_MAPPING_NAME
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: `wide` is a NUL-terminated UTF-16 string that outlives the call.
        let handle = unsafe { OpenFileMappingW(FILE_MAP_READ, 0, wide.as_ptr()) };
        if handle.is_null() {
            return Err(crate::error::FksError::frame_source(
                "could not open RTSS shared memory; is RivaTuner Statistics Server running?",
            ));
        }

        // SAFETY: `handle` is a valid file-mapping handle; a zero length maps
        // the whole section.
        let base = unsafe { MapViewOfFile(handle, FILE_MAP_READ, 0, 0, 0) };
        if base.is_null() {
            // SAFETY: `handle` came from OpenFileMappingW above.
            unsafe { CloseHandle(handle) };
            return Err(crate::error::FksError::frame_source(
                "failed to map view of RTSS shared memory",
            ));
        }

        Ok(Self {
            map_handle: handle,
            base: base as *const u8,
            entry_addr: None,
            target: target.to_string(),
        })
    }

    /// Scans the app-entry array for the target process and caches the
    /// matching entry's address.
    fn locate_entry(&mut self) -> Option<usize> {
        use std::ffi::CStr;

        let base = self.base as usize;
        // SAFETY: the header fields live at fixed offsets from the start of
        // the mapped section; reads are unaligned-safe.
        let (entry_size, arr_offset, arr_len) = unsafe {
            (
                std::ptr::read_unaligned((base + HDR_ENTRY_SIZE_OFFSET) as *const u32) as usize,
                std::ptr::read_unaligned((base + HDR_ARR_OFFSET_OFFSET) as *const u32) as usize,
                std::ptr::read_unaligned((base + HDR_ARR_LEN_OFFSET) as *const u32) as usize,
            )
        };
        if entry_size == 0 || arr_len == 0 {
            return None;
        }

        for i in 0..arr_len {
            let entry = base + arr_offset + i * entry_size;
            // SAFETY: the app name is a NUL-terminated C string embedded in a
            // fixed-size field at APP_NAME_OFFSET.
            let name = unsafe { CStr::from_ptr((entry + APP_NAME_OFFSET) as *const i8) };
            if name.to_string_lossy().contains(&self.target) {
                self.entry_addr = Some(entry);
                return Some(entry);
            }
        }
        None
    }
}

#[cfg(windows)]
impl FrameClock for RtssFrameClock {
    fn sample(&mut self) -> Option<f64> {
        let entry = match self.entry_addr {
            Some(addr) => addr,
            None => self.locate_entry()?,
        };
        // SAFETY: `entry` points into the mapped section located by
        // locate_entry; the frametime dword sits at a fixed offset.
        let raw = unsafe { std::ptr::read_unaligned((entry + FRAMETIME_OFFSET) as *const u32) };
        Some(f64::from(raw) / 1000.0)
    }
}

#[cfg(windows)]
impl Drop for RtssFrameClock {
    fn drop(&mut self) {
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::memoryapi::UnmapViewOfFile;

        // SAFETY: `base` and `map_handle` were produced by open() and are
        // released exactly once.
        unsafe {
            UnmapViewOfFile(self.base as *const winapi::ctypes::c_void);
            CloseHandle(self.map_handle);
        }
    }
}

/// Opens the platform frame-time source for `target`.
#[cfg(windows)]
pub fn open_platform_clock(target: &str) -> Result<Box<dyn FrameClock>> {
    Ok(Box::new(RtssFrameClock::open(target)?))
}

/// Opens the platform frame-time source for `target`.
///
/// There is no source on this platform; the collaborator is reported as
/// unavailable.
#[cfg(not(windows))]
pub fn open_platform_clock(_target: &str) -> Result<Box<dyn FrameClock>> {
    Err(crate::error::FksError::unsupported_platform(
        "frame-time sampling requires the RTSS shared memory region (Windows only)",
    ))
}

/// A scripted [`FrameClock`] for tests. Clones share the sample queue;
/// sampling past the end reports "no value".
#[derive(Debug, Clone, Default)]
pub struct MockFrameClock {
    samples: Arc<Mutex<VecDeque<Option<f64>>>>,
}

impl MockFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one sample to the script.
    pub fn push_sample(&self, sample: Option<f64>) {
        self.samples
            .lock()
            .expect("mock clock mutex poisoned")
            .push_back(sample);
    }

    /// Appends a run of distinct values, each of which reads as one edge.
    pub fn push_frames(&self, count: usize) {
        let mut samples = self.samples.lock().expect("mock clock mutex poisoned");
        let start = samples.len();
        for i in 0..count {
            samples.push_back(Some(16.0 + (start + i) as f64));
        }
    }
}

impl FrameClock for MockFrameClock {
    fn sample(&mut self) -> Option<f64> {
        self.samples
            .lock()
            .expect("mock clock mutex poisoned")
            .pop_front()
            .flatten()
    }
}
