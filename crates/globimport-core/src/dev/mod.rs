//! Dev-session integration: the plugin hooks and a reference module graph.

pub mod hmr;
pub mod plugin;

pub use hmr::{HmrPayload, HmrUpdate, ModuleGraph, ModuleNode, UpdateKind};
pub use plugin::{FileEventKind, GlobImportPlugin, HostModuleGraph, HostWatcher, WatchConfig};
