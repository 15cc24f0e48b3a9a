//! Parse and validate `keel.toml`.

pub mod kind;
pub mod manifest;

pub use kind::TaskKind;
pub use manifest::{Manifest, ManifestError};
