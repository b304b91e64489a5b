//! FFI bindings for efforia-pok
//!
//! This module provides C-compatible functions for issuing and checking
//! certificates from editor plugins written in other languages. All functions
//! take null-terminated C strings and return allocated memory that must be
//! freed by the caller using `pok_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::PokError;
use crate::normalizer::Normalizer;
use crate::pipeline::CertificateProcessor;
use crate::types::Certificate;
use crate::validate::parse_session;
use crate::verify::{certificate_matches_session, validate_certificate};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Convert a C string to an owned Rust string; NULL or invalid UTF-8 gives None
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Convert a Rust string to a C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a result to C: the string on success, NULL plus last error otherwise
fn finish(result: Result<String, PokError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Certificates
// ============================================================================

/// Validate session JSON and return the certificate JSON.
///
/// # Safety
/// - `session_json` must be a valid null-terminated C string.
/// - `author_address` may be NULL; otherwise it must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pok_free_string`.
/// - Returns NULL on error; call `pok_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pok_session_to_certificate(
    session_json: *const c_char,
    author_address: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json) = cstr_to_string(session_json) else {
        set_last_error("Invalid session JSON string pointer");
        return ptr::null_mut();
    };

    let mut processor = CertificateProcessor::new();
    if !author_address.is_null() {
        match cstr_to_string(author_address) {
            Some(author) => processor = processor.author(author),
            None => {
                set_last_error("Invalid author address string pointer");
                return ptr::null_mut();
            }
        }
    }

    finish(processor.certify_json(&json))
}

/// Validate session JSON and return its fingerprint (64 lowercase hex chars).
///
/// # Safety
/// - `session_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pok_free_string`.
/// - Returns NULL on error; call `pok_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pok_fingerprint_session(session_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json) = cstr_to_string(session_json) else {
        set_last_error("Invalid session JSON string pointer");
        return ptr::null_mut();
    };

    finish(parse_session(&json).map(|session| {
        crate::fingerprint::fingerprint_hash(&Normalizer::normalize(&session))
    }))
}

/// Check that a certificate was issued for a session.
///
/// Returns 1 if the fingerprints match, 0 if they differ, and -1 on error
/// (bad pointers, invalid JSON, malformed certificate or session).
///
/// # Safety
/// - `certificate_json` and `session_json` must be valid null-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn pok_verify_session(
    certificate_json: *const c_char,
    session_json: *const c_char,
) -> i32 {
    clear_last_error();

    let (Some(cert_str), Some(session_str)) =
        (cstr_to_string(certificate_json), cstr_to_string(session_json))
    else {
        set_last_error("Invalid string pointer");
        return -1;
    };

    let checked = serde_json::from_str::<Certificate>(&cert_str)
        .map_err(PokError::from)
        .and_then(|cert| {
            validate_certificate(&cert)?;
            let session = parse_session(&session_str)?;
            Ok(certificate_matches_session(&cert, &session))
        });

    match checked {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a pok function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a pok function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pok_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next pok function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pok_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pok_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
