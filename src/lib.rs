pub mod interface;
pub mod service;
pub mod shared;

// Flat re-exports for binaries and integration tests.
pub use interface::{http, notification};
pub use service::{ai, detection};
pub use shared::{config, entities, error, logging, media, ports};
