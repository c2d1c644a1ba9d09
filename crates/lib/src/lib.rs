//! cairn-lib: content-addressed unit evaluation for cairn
//!
//! This crate provides the evaluation engine behind the `cairn` CLI:
//! - `Unit`: fetched artifacts and packages with content-derived identities
//! - `placeholder`: markers that let one unit's text reference another's store path
//! - `Evaluator`: the cycle-checked walk from a root unit to every dependency
//! - `SpecWriter`: atomic, idempotent persistence of one specification per unit
//! - `lua`: the Lua frontend units are defined in

pub mod consts;
pub mod emit;
pub mod eval;
pub mod lua;
pub mod placeholder;
pub mod registry;
pub mod store;
pub mod unit;
pub mod util;
