//! Runtime plumbing shared by MediCheck binaries: logging bootstrap and a
//! tracing layer that streams session activity to a live feed.

pub mod logging;
pub mod tracing_layer;

pub use logging::{LogConfig, init_logging};
pub use tracing_layer::{SessionEventLayer, SessionLogEvent};
