pub mod fan_out;
pub mod manifest_service;

pub use fan_out::{fan_out, FanOutMode};
pub use manifest_service::{ManifestFormat, ManifestService, ManifestServiceError};
