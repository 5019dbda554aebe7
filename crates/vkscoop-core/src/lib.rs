//! Shared utilities for the vkscoop capture layer: settings, errors,
//! logging init, SPIR-V version words and the stale-cached global map.

pub mod error;
pub mod logging;
pub mod settings;
pub mod spirv;
pub mod stale_map;

pub use error::ScoopError;
pub use settings::CaptureSettings;

#[doc(hidden)]
pub use dashmap::DashMap as __DashMap;
