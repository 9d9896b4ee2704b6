//! Glob-import pipeline.
//!
//! - `call`: find and validate `import.meta.importGlob(...)` calls
//! - `resolve`: make written patterns absolute (aliases included)
//! - `base`: pick the directory to scan from
//! - `matcher`: expand patterns against the filesystem
//! - `query`: import specifier queries
//! - `transform`: generate and splice the replacement code
//! - `index`: per-module glob dependencies for invalidation

pub mod base;
pub mod call;
pub mod index;
pub mod matcher;
pub mod query;
pub mod resolve;
pub mod transform;

pub use call::{
    parse_import_globs, GlobAs, GlobCallKind, GlobCallOccurrence, GlobOptions, GlobQuery,
    ResolvedGlobSet,
};
pub use index::{compute_affected_modules, DependencyIndex};
pub use matcher::{ExpandOptions, FsGlobMatcher, GlobMatcher};
pub use resolve::{to_absolute_glob, AliasResolver, ModuleResolver, NoopResolver};
pub use transform::{transform_module, GlobTransformer, TransformOutput};
