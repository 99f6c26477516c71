//! # netseries core
//!
//! Synthetic multivariate time-series generation over a graph of super
//! nodes. Independent super nodes are smooth random curves; dependent super
//! nodes add weighted contributions from sub nodes generated before them.
//!
//! ## Example
//!
//! ```rust
//! use netseries_core::{generate_with, Configuration, GenerateOptions};
//!
//! let yaml = r#"
//! n_cycles: 100
//! supernodes:
//!   0:
//!     node_type: independent
//!     n_subnodes: 1
//!     boundaries: [[0, 1]]
//!     control_points: [0.2, 0.8]
//! "#;
//! let config = Configuration::from_yaml_str(yaml).unwrap();
//! let series = generate_with(&config, &GenerateOptions::seeded(7)).unwrap();
//! assert_eq!(series.subnode(0, 0).unwrap().len(), 100);
//! ```
//!
//! The same entry points are reachable over a C ABI (`ns_init`, `ns_call`,
//! `ns_free`, `ns_last_error`) through the method [`Registry`].

use parking_lot::Mutex;
use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::sync::OnceLock;

pub mod compose;
pub mod config;
pub mod curve;
pub mod error;
pub mod generate;
pub mod graph;
pub mod preview;
pub mod registry;
pub mod series;
pub mod spline;

pub use config::{Boundary, Configuration, InputEdge, NodeKind, SuperNodeSpec, SupernodeId};
pub use curve::{synthesize, Series};
pub use error::{GenError, GenResult};
pub use generate::{generate, generate_with, generate_with_rng, GenerateOptions, ResolveOrder};
pub use graph::DependencyGraph;
pub use registry::Registry;
pub use series::{CycleRecord, GeneratedSeries, SeriesStats};

/// Global registry instance
static GLOBAL_REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

thread_local! {
    /// Message of the most recent failed `ns_call` on this thread
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Error codes returned to FFI callers
pub const NS_ERR_SUCCESS: c_int = 0;
pub const NS_ERR_NOT_INITIALIZED: c_int = 1;
pub const NS_ERR_UNKNOWN_METHOD: c_int = 2;
pub const NS_ERR_PARSE_ERROR: c_int = 3;
pub const NS_ERR_INVALID_CONFIGURATION: c_int = 4;
pub const NS_ERR_INSUFFICIENT_CONTROL_POINTS: c_int = 5;
pub const NS_ERR_DEGENERATE_RANGE: c_int = 6;
pub const NS_ERR_UNKNOWN_UPSTREAM: c_int = 7;
pub const NS_ERR_CONNECTION_LENGTH: c_int = 8;
pub const NS_ERR_CYCLIC_DEPENDENCY: c_int = 9;
/// Error returned when input is too large for safety
pub const NS_ERR_TOO_LARGE: c_int = 10;
pub const NS_ERR_INTERNAL: c_int = 99;

const MAX_INPUT_LEN: usize = 10 * 1024 * 1024; // 10 MB

impl GenError {
    /// Stable integer code for FFI callers
    pub fn code(&self) -> c_int {
        match self {
            GenError::InvalidConfiguration(_) => NS_ERR_INVALID_CONFIGURATION,
            GenError::InsufficientControlPoints { .. } => NS_ERR_INSUFFICIENT_CONTROL_POINTS,
            GenError::DegenerateRange { .. } => NS_ERR_DEGENERATE_RANGE,
            GenError::UnknownUpstreamSupernode { .. } => NS_ERR_UNKNOWN_UPSTREAM,
            GenError::ConnectionLengthMismatch { .. } => NS_ERR_CONNECTION_LENGTH,
            GenError::CyclicDependency(_) => NS_ERR_CYCLIC_DEPENDENCY,
            GenError::Parse(_) => NS_ERR_PARSE_ERROR,
            GenError::UnknownMethod(_) => NS_ERR_UNKNOWN_METHOD,
            GenError::Internal(_) => NS_ERR_INTERNAL,
        }
    }
}

fn set_last_error(message: Option<String>) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Copy `data` into a `malloc`ed buffer owned by the caller
unsafe fn hand_out(data: &[u8], out_ptr: *mut *mut u8, out_len: *mut usize) -> c_int {
    let len = data.len();
    let ptr = libc::malloc(len.max(1)) as *mut u8;
    if ptr.is_null() {
        return NS_ERR_INTERNAL;
    }

    std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, len);

    *out_ptr = ptr;
    *out_len = len;
    NS_ERR_SUCCESS
}

/// Initialize the engine runtime
///
/// Must be called once before any `ns_call` invocations.
///
/// # Safety
/// Safe to call multiple times (idempotent).
#[no_mangle]
pub unsafe extern "C" fn ns_init() -> c_int {
    GLOBAL_REGISTRY.get_or_init(|| Mutex::new(Registry::with_engine()));
    NS_ERR_SUCCESS
}

/// Call an engine method by name
///
/// # Arguments
/// * `method_ptr` - Null-terminated UTF-8 method name
/// * `in_ptr` - Request buffer
/// * `in_len` - Request length in bytes
/// * `out_ptr` - Response buffer pointer (allocated by this function)
/// * `out_len` - Response length (written by this function)
///
/// # Returns
/// * `NS_ERR_SUCCESS` (0) on success
/// * Error code (>0) on failure; `ns_last_error` holds the message
///
/// # Safety
/// Caller must:
/// - Ensure `method_ptr` is valid null-terminated UTF-8
/// - Ensure `in_ptr` points to at least `in_len` bytes
/// - Call `ns_free()` on `*out_ptr` when done
#[no_mangle]
pub unsafe extern "C" fn ns_call(
    method_ptr: *const c_char,
    in_ptr: *const u8,
    in_len: usize,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> c_int {
    if method_ptr.is_null() {
        return NS_ERR_PARSE_ERROR;
    }

    if in_len > 0 && in_ptr.is_null() {
        return NS_ERR_PARSE_ERROR;
    }

    if in_len > MAX_INPUT_LEN {
        return NS_ERR_TOO_LARGE;
    }

    if out_ptr.is_null() || out_len.is_null() {
        return NS_ERR_INTERNAL;
    }

    let Some(registry) = GLOBAL_REGISTRY.get() else {
        return NS_ERR_NOT_INITIALIZED;
    };

    let method = match CStr::from_ptr(method_ptr).to_str() {
        Ok(s) => s,
        Err(_) => return NS_ERR_PARSE_ERROR,
    };

    let input = if in_len == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(in_ptr, in_len)
    };

    let registry = registry.lock();
    match registry.call(method, input) {
        Ok(data) => {
            set_last_error(None);
            hand_out(&data, out_ptr, out_len)
        }
        Err(e) => {
            tracing::debug!(method, error = %e, "ns_call failed");
            let code = e.code();
            set_last_error(Some(e.to_string()));
            code
        }
    }
}

/// Copy the message of the last failed call into a new buffer
///
/// Returns `NS_ERR_SUCCESS` with an empty buffer when the last call succeeded.
/// The message is kept per thread, so it must be read on the thread that
/// made the failing `ns_call`.
///
/// # Safety
/// Same ownership rules as `ns_call`: free the buffer with `ns_free()`.
#[no_mangle]
pub unsafe extern "C" fn ns_last_error(out_ptr: *mut *mut u8, out_len: *mut usize) -> c_int {
    if out_ptr.is_null() || out_len.is_null() {
        return NS_ERR_INTERNAL;
    }
    let message = LAST_ERROR.with(|slot| slot.borrow().clone()).unwrap_or_default();
    hand_out(message.as_bytes(), out_ptr, out_len)
}

/// Free memory allocated by `ns_call` or `ns_last_error`
///
/// # Safety
/// Must only be called once per buffer returned by this library.
/// Pointer must not be used after calling this function.
#[no_mangle]
pub unsafe extern "C" fn ns_free(ptr: *mut u8, _len: usize) {
    if !ptr.is_null() {
        libc::free(ptr as *mut libc::c_void);
    }
}

/// Get the global registry (for testing/advanced usage)
pub fn get_registry() -> Option<&'static Mutex<Registry>> {
    GLOBAL_REGISTRY.get()
}
