//! Variable resolution engine.
//!
//! Given a loaded [`Pack`](crate::pack::Pack) tree and a list of
//! [`VariableSource`]s, [`Resolver::resolve`] produces the final, typed
//! value of every declared variable, scoped by pack path.
//!
//! Precedence, lowest first: pack default, shared override file, per-pack
//! override file, environment, command line. A source qualified with a
//! pack path always beats a bare one for that pack, whatever its kind.
//!
//! # Example
//!
//! ```
//! use packwright::variables::{SourceKind, VariableSource};
//!
//! let source = VariableSource::command_line("cache.port=6380").unwrap();
//! assert_eq!(source.kind, SourceKind::CommandLine);
//! assert_eq!(source.target.pack.as_deref(), Some("cache"));
//! ```

pub mod file;
pub mod resolver;
pub mod source;

pub use file::load_override_file;
pub use resolver::{ResolvedVariable, ResolvedVariableSet, Resolver, ResolverConfig};
pub use source::{split_assignment, SourceKind, SourceValue, TargetPath, VariableSource, ENV_PREFIX};
