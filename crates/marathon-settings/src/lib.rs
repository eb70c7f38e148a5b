//! # marathon-settings
//!
//! Configuration for the Marathon events client, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`MarathonSettings::default()`]
//! 2. **Settings file**: JSON, merged over defaults
//! 3. **Environment variables**: `MARATHON_*` overrides (highest priority)
//!
//! There is no process-wide settings cache: callers load a value once and
//! hand it to the event hub they construct.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, load_settings_from_path, merge_layer};
pub use types::*;
