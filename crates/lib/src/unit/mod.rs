//! Buildable units and their content-addressed identities.
//!
//! A unit is either a [`Fetch`] (a downloaded artifact, always a leaf) or a
//! [`Package`] (a script over other units). Both expose the [`Identify`]
//! capability: an identifier, a content hash and a [`Specification`].
//!
//! Identity is derived from logical content only. For packages this means
//! the script and environment *after* interpolation, so a package's identity
//! depends on the identities of everything it references. References are
//! written as markers (see [`placeholder`](crate::placeholder)); rendering a
//! unit inside a script template yields its marker.

mod context;
mod fetch;
pub mod lua;
mod package;
mod spec;
mod types;

pub use context::{current_store_root, with_store_root};
pub use fetch::Fetch;
pub use package::{Package, PackageBuilder, ResolvedPackage, ScriptTemplate};
pub use spec::{FetchSpec, PackageSpec, Specification};
pub use types::{Identify, Unit, UnitId};
