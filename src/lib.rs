//! slotalloc - indirect allocation registry for embedding hosts
//!
//! Sits in front of a general-purpose heap and gives every live allocation a
//! stable small-integer slot. The host can then enumerate, audit and
//! bulk-release every native allocation made on its behalf.
//!
//! ```text
//! Registry (facade, one mutex)
//! ├── SlotTable: slot → block back-references, next-fit + doubling
//! ├── Header: 16-byte prefix carrying the block's own slot
//! └── RawAllocator: where blocks come from (libc heap by default)
//! ```
//!
//! Rust hosts own a [`Registry`]. C hosts use the `slotalloc_*` functions in
//! [`ffi`], backed by the process-wide instance in [`lifecycle`].

pub mod config;
pub mod error;
pub mod ffi;
pub mod lifecycle;
pub mod logging;
#[cfg(unix)]
pub mod plugin;
pub mod registry;

pub use config::{Config, RegistryConfig};
pub use error::{AllocError, ConfigError, PluginError};
pub use registry::{
    Allocation, LibcAllocator, RawAllocator, Registry, RegistryStats, Slot, TeardownReport,
    HEADER_SIZE,
};
