//! Lifecycle controller - the process-wide registry behind the C ABI
//!
//! Rust hosts own a [`Registry`] directly. C hosts cannot, so this module
//! holds one instance for them:
//!
//! ```text
//! init() ─► host startup ─► malloc/calloc/realloc/free ... ─► host shutdown ─► uninit()
//! ```
//!
//! Facade calls share the read side of the lock; `init`/`uninit` take the
//! write side, so a teardown never overlaps an in-flight allocation. Using
//! the facade outside `init`..`uninit` is a contract violation and panics.

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::config::Config;
use crate::logging::{self, warn, LogConfig};
use crate::registry::{Registry, TeardownReport};

static GLOBAL: Lazy<RwLock<Option<Registry>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide registry using [`Config::load`]
///
/// A config that fails to load falls back to defaults.
///
/// # Panics
/// If the registry is already initialized.
pub fn init() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            logging::init();
            warn!(error = %err, "Falling back to default registry config");
            Config::default()
        }
    };
    init_with_config(&config);
}

/// Install the process-wide registry with explicit settings
///
/// # Panics
/// If the registry is already initialized.
pub fn init_with_config(config: &Config) {
    logging::init_with_config(LogConfig::from_settings(&config.logging));

    let mut global = GLOBAL.write();
    assert!(global.is_none(), "allocation registry initialized twice");
    *global = Some(Registry::with_config(&config.registry));
}

/// Free everything still registered and drop the process-wide registry
///
/// # Panics
/// If the registry is not initialized.
pub fn uninit() -> TeardownReport {
    let Some(registry) = GLOBAL.write().take() else {
        panic!("allocation registry uninit without init");
    };
    registry.uninit()
}

/// Whether the process-wide registry is installed
pub fn is_initialized() -> bool {
    GLOBAL.read().is_some()
}

/// Run `f` against the process-wide registry
///
/// # Panics
/// If called before [`init`] or after [`uninit`].
pub fn with_registry<R>(f: impl FnOnce(&Registry) -> R) -> R {
    let global = GLOBAL.read();
    let Some(registry) = global.as_ref() else {
        panic!("allocation registry used outside init/uninit");
    };
    f(registry)
}
