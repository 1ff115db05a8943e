//! Level macros re-exported so modules log through `crate::logging`

pub use tracing::{debug, error, info, trace, warn};
