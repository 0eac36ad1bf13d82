//! Pack registries and reference resolution.
//!
//! A registry is a named remote that holds many packs. This module defines:
//! - [`PackReference`] - where a pack comes from (registry + ref, or a path)
//! - [`ReferenceResolver`] - pins references to concrete refs, side-effect free
//! - [`RegistrySource`] - the remote access seam
//! - [`GitRegistry`] - the `git`-backed implementation
//!
//! # Example
//!
//! ```
//! use packwright::registry::{PackReference, DEFAULT_REGISTRY};
//!
//! let reference = PackReference::registry("redis").with_ref("v1.2.0");
//! assert_eq!(reference.registry_name(), Some(DEFAULT_REGISTRY));
//! assert!(!reference.is_latest());
//! ```

pub mod git;
pub mod reference;
pub mod source;

pub use git::GitRegistry;
pub use reference::{
    verify_local_pack, PackReference, Pinned, ReferenceResolver, DEFAULT_REGISTRY, LATEST_REF,
};
pub use source::{RegistryConfig, RegistryLocation, Registries, RegistrySource, RemoteError};
