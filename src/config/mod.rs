/// Main configuration module.
///
/// Re-exports the static relay timing constants and the file-loaded server
/// descriptors.
pub mod relay;
pub mod servers;

pub use servers::{ConfigError, RelayConfig, RoomConfig, ServerConfig, Thresholds};
