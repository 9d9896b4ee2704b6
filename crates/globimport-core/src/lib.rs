#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Rewrites `import.meta.importGlob(...)` calls into concrete imports and
//! tracks which modules depend on which glob patterns.

pub mod config;
pub mod dev;
pub mod error;
pub mod expr;
pub mod glob;
pub mod paths;
pub mod splice;

pub use config::{Config, GlobImportOptions};
pub use dev::{GlobImportPlugin, HostModuleGraph, HostWatcher, ModuleGraph};
pub use error::{Error, Result};
pub use glob::{
    compute_affected_modules, transform_module, AliasResolver, DependencyIndex, FsGlobMatcher,
    GlobMatcher, GlobTransformer, ModuleResolver, NoopResolver, ResolvedGlobSet, TransformOutput,
};
pub use splice::{SourceBuffer, SourceMap};

/// Version of the crate, from Cargo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
