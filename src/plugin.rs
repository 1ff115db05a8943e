//! Plugin loader - open an accelerator backend and resolve its entry point
//!
//! Boundary only: `open(path)` dlopens the library (lazy binding) and looks
//! up one entry symbol; `close` dlcloses it. A library without the entry
//! symbol is closed again before the error is returned.

use core::ffi::c_void;
use core::ptr::NonNull;
use std::ffi::{CStr, CString};
use std::path::Path;

use crate::error::PluginError;
use crate::logging::debug;

/// Entry symbol exported by backend plugins
pub const DEFAULT_ENTRY_SYMBOL: &str = "GetPjrtApi";

/// Loaded plugin with its resolved entry point
#[derive(Debug)]
pub struct Plugin {
    handle: NonNull<c_void>,
    entry: NonNull<c_void>,
}

impl Plugin {
    /// Load `path` and resolve [`DEFAULT_ENTRY_SYMBOL`]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        Self::open_with_entry(path, DEFAULT_ENTRY_SYMBOL)
    }

    /// Load `path` and resolve `entry_symbol`
    pub fn open_with_entry(path: impl AsRef<Path>, entry_symbol: &str) -> Result<Self, PluginError> {
        let path = path.as_ref();
        let cpath = path
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or(PluginError::InvalidPath)?;
        let csymbol = CString::new(entry_symbol).map_err(|_| PluginError::MissingSymbol {
            symbol: entry_symbol.to_owned(),
        })?;

        // Safety: both strings are nul-terminated and outlive the calls.
        unsafe {
            let handle = NonNull::new(libc::dlopen(cpath.as_ptr(), libc::RTLD_LAZY))
                .ok_or_else(|| PluginError::Open(last_dl_error()))?;

            let Some(entry) = NonNull::new(libc::dlsym(handle.as_ptr(), csymbol.as_ptr())) else {
                libc::dlclose(handle.as_ptr());
                return Err(PluginError::MissingSymbol {
                    symbol: entry_symbol.to_owned(),
                });
            };

            debug!(plugin = %path.display(), symbol = entry_symbol, "Plugin loaded");
            Ok(Self { handle, entry })
        }
    }

    /// Address of the resolved entry symbol
    ///
    /// Valid until the plugin is closed; the caller casts it to the backend's
    /// entry function type.
    #[inline]
    pub fn entry(&self) -> NonNull<c_void> {
        self.entry
    }

    /// Unload the library
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Plugin {
    fn drop(&mut self) {
        // Safety: handle came from a successful dlopen and is closed once.
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        }
    }
}

// Safety: dl handles are process-global and usable from any thread.
unsafe impl Send for Plugin {}
unsafe impl Sync for Plugin {}

fn last_dl_error() -> String {
    // Safety: dlerror returns null or a nul-terminated thread-local string.
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            "unknown error".into()
        } else {
            CStr::from_ptr(err).to_string_lossy().into_owned()
        }
    }
}
