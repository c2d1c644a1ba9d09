//! Lua definition frontend.
//!
//! Units are described in Lua files evaluated against the `cairn` global.
//!
//! # Submodules
//!
//! - [`entrypoint`] - Loading a definition file and collecting its exports
//! - [`globals`] - The `cairn` table (`cairn.fetch{}`, `cairn.package{}`, ...)
//! - [`runtime`] - Low-level Lua VM management

pub mod entrypoint;
pub mod globals;
pub mod runtime;

pub use entrypoint::{Definitions, LoadError, load_definitions};
