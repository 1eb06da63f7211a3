//! FFI bindings for Synheart Motion
//!
//! This module provides C-compatible functions for driving the motion core from
//! other languages. Strings are null-terminated; returned strings are allocated
//! and must be freed by the caller using `motion_free_string`.
//!
//! The FFI surface is poll-based: hosts call `motion_latest_snapshot` from
//! their own UI timer while the core's refresh scheduler runs.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::MotionConfig;
use crate::monitor::MotionCore;
use crate::sensors::{available_sensor_labels, SensorCapabilities};
use crate::types::HealthMetricsSnapshot;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn snapshot_to_cstr(snapshot: &HealthMetricsSnapshot) -> *mut c_char {
    match snapshot.to_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Opaque handle to a motion core
pub struct MotionCoreHandle {
    core: MotionCore,
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a motion core with default settings.
///
/// # Safety
/// - Returns a pointer to a newly allocated core.
/// - Must be freed with `motion_core_free`.
#[no_mangle]
pub unsafe extern "C" fn motion_core_new(has_hardware_step_counter: bool) -> *mut MotionCoreHandle {
    clear_last_error();

    let core = MotionCore::initialize(has_hardware_step_counter);
    Box::into_raw(Box::new(MotionCoreHandle { core }))
}

/// Create a motion core from a JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string.
/// - Must be freed with `motion_core_free`.
/// - Returns NULL on error; call `motion_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn motion_core_new_with_config(
    config_json: *const c_char,
) -> *mut MotionCoreHandle {
    clear_last_error();

    let json_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    let result = MotionConfig::from_json(&json_str).and_then(MotionCore::with_config);
    match result {
        Ok(core) => Box::into_raw(Box::new(MotionCoreHandle { core })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a motion core, stopping its schedulers.
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn motion_core_free(core: *mut MotionCoreHandle) {
    if !core.is_null() {
        drop(Box::from_raw(core));
    }
}

// ============================================================================
// Ingest
// ============================================================================

/// Feed one accelerometer sample.
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `motion_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn motion_on_accelerometer_sample(
    core: *const MotionCoreHandle,
    x: f32,
    y: f32,
    z: f32,
    timestamp_ms: u64,
) -> i32 {
    clear_last_error();

    if core.is_null() {
        set_last_error("Null core pointer");
        return -1;
    }

    match (*core).core.on_accelerometer_sample(x, y, z, timestamp_ms) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Feed a raw hardware step counter reading.
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`.
/// - Returns the step total, or -1 on error (e.g. the core is in simulation mode).
#[no_mangle]
pub unsafe extern "C" fn motion_on_hardware_step_count(
    core: *const MotionCoreHandle,
    raw: u64,
) -> i64 {
    clear_last_error();

    if core.is_null() {
        set_last_error("Null core pointer");
        return -1;
    }

    match (*core).core.on_hardware_step_count(raw) {
        Ok(total) => i64::try_from(total).unwrap_or(i64::MAX),
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Scheduling
// ============================================================================

/// Start the 1 Hz refresh scheduler (restarts it if already running).
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn motion_start(core: *const MotionCoreHandle) {
    if let Some(handle) = core.as_ref() {
        handle.core.start();
    }
}

/// Stop the refresh scheduler. Safe to call repeatedly.
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn motion_stop(core: *const MotionCoreHandle) {
    if let Some(handle) = core.as_ref() {
        handle.core.stop();
    }
}

/// Reset step and activity state; returns the zeroed snapshot as JSON.
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`.
/// - Returns a newly allocated string that must be freed with `motion_free_string`.
#[no_mangle]
pub unsafe extern "C" fn motion_reset(core: *const MotionCoreHandle) -> *mut c_char {
    clear_last_error();

    match core.as_ref() {
        Some(handle) => snapshot_to_cstr(&handle.core.reset()),
        None => {
            set_last_error("Null core pointer");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Compute a fresh snapshot and return it as JSON.
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`.
/// - Returns a newly allocated string that must be freed with `motion_free_string`.
#[no_mangle]
pub unsafe extern "C" fn motion_compute_metrics(core: *const MotionCoreHandle) -> *mut c_char {
    clear_last_error();

    match core.as_ref() {
        Some(handle) => snapshot_to_cstr(&handle.core.compute_metrics()),
        None => {
            set_last_error("Null core pointer");
            ptr::null_mut()
        }
    }
}

/// Return the most recently published snapshot as JSON.
///
/// # Safety
/// - `core` must be a valid pointer returned by `motion_core_new*`.
/// - Returns a newly allocated string that must be freed with `motion_free_string`.
#[no_mangle]
pub unsafe extern "C" fn motion_latest_snapshot(core: *const MotionCoreHandle) -> *mut c_char {
    clear_last_error();

    match core.as_ref() {
        Some(handle) => snapshot_to_cstr(&handle.core.latest_snapshot()),
        None => {
            set_last_error("Null core pointer");
            ptr::null_mut()
        }
    }
}

/// Format sensor capability flags (JSON) into a JSON array of labels.
///
/// # Safety
/// - `capabilities_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `motion_free_string`.
/// - Returns NULL on error; call `motion_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn motion_sensor_labels(capabilities_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(capabilities_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid capabilities string pointer");
            return ptr::null_mut();
        }
    };

    let capabilities: SensorCapabilities = match serde_json::from_str(&json_str) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&available_sensor_labels(&capabilities)) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Motion functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Motion function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn motion_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Motion function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn motion_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Motion library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn motion_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
