//! Filesystem, process and Maven metadata helpers for Keel.
#![forbid(unsafe_code)]

pub mod error;
pub mod fs;
pub mod maven;
pub mod pom;
pub mod process;
