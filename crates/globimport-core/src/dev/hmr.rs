//! Module graph and update payloads for dev sessions.
//!
//! Provides:
//! - A minimal module graph (id → file, invalidation timestamps)
//! - Vite-compatible `update` payloads, broadcast to subscribers

use super::plugin::HostModuleGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the payload broadcast channel.
const CHANNEL_CAPACITY: usize = 64;

/// A node in the module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    /// The module id (absolute path or virtual id).
    pub id: String,
    /// The file backing the module.
    pub file: String,
    /// Last invalidation timestamp, 0 when never invalidated.
    pub last_invalidation_timestamp: u64,
}

impl ModuleNode {
    #[must_use]
    pub fn new(id: String, file: String) -> Self {
        Self {
            id,
            file,
            last_invalidation_timestamp: 0,
        }
    }
}

/// Messages sent to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HmrPayload {
    /// Modules to re-fetch.
    Update { updates: Vec<HmrUpdate> },
    /// A module failed to re-transform.
    Error { message: String },
}

impl HmrPayload {
    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Kind of a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    JsUpdate,
}

/// A single module update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmrUpdate {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    /// Id of the module to update.
    pub path: String,
    /// Id of the module accepting the update (the module itself).
    pub accepted_path: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl HmrUpdate {
    /// A `js-update` of `module_id` accepted by itself.
    pub fn js_update(module_id: &str, timestamp: u64) -> Self {
        Self {
            kind: UpdateKind::JsUpdate,
            path: module_id.to_string(),
            accepted_path: module_id.to_string(),
            timestamp,
        }
    }
}

/// Tracks loaded modules and fans update payloads out to subscribers.
pub struct ModuleGraph {
    /// Id → node.
    modules: RwLock<HashMap<String, ModuleNode>>,
    /// File → ids of the modules it backs.
    file_to_ids: RwLock<HashMap<String, BTreeSet<String>>>,
    tx: broadcast::Sender<HmrPayload>,
}

impl ModuleGraph {
    /// Create a new empty module graph.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            modules: RwLock::new(HashMap::new()),
            file_to_ids: RwLock::new(HashMap::new()),
            tx,
        }
    }

    /// Register a module in the graph.
    pub fn ensure_module(&self, id: &str, file: &str) {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        if !modules.contains_key(id) {
            modules.insert(
                id.to_string(),
                ModuleNode::new(id.to_string(), file.to_string()),
            );
            self.file_to_ids
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(file.to_string())
                .or_default()
                .insert(id.to_string());
        }
    }

    /// Look up a module by id.
    pub fn get(&self, id: &str) -> Option<ModuleNode> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every payload sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<HmrPayload> {
        self.tx.subscribe()
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl HostModuleGraph for ModuleGraph {
    fn modules_by_file(&self, file: &str) -> Vec<String> {
        self.file_to_ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn invalidate(&self, module_id: &str) {
        if let Some(module) = self
            .modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(module_id)
        {
            module.last_invalidation_timestamp = now_ms();
            trace!(module_id, "invalidated module");
        }
    }

    fn send_update(&self, payload: HmrPayload) {
        // No subscribers is not an error.
        let _ = self.tx.send(payload);
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_payload_json() {
        let payload = HmrPayload::Update {
            updates: vec![HmrUpdate::js_update("/src/main.ts", 42)],
        };
        assert_eq!(
            payload.to_json().unwrap(),
            r#"{"type":"update","updates":[{"type":"js-update","path":"/src/main.ts","acceptedPath":"/src/main.ts","timestamp":42}]}"#
        );
    }

    #[test]
    fn test_error_payload_json() {
        let payload = HmrPayload::Error {
            message: "boom".to_string(),
        };
        assert_eq!(payload.to_json().unwrap(), r#"{"type":"error","message":"boom"}"#);
    }

    #[test]
    fn test_modules_by_file() {
        let graph = ModuleGraph::new();
        graph.ensure_module("/src/main.ts", "/src/main.ts");
        graph.ensure_module("/src/main.ts?worker", "/src/main.ts");
        graph.ensure_module("/src/other.ts", "/src/other.ts");

        assert_eq!(
            graph.modules_by_file("/src/main.ts"),
            vec!["/src/main.ts", "/src/main.ts?worker"]
        );
        assert!(graph.modules_by_file("/src/missing.ts").is_empty());
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_invalidate_sets_timestamp() {
        let graph = ModuleGraph::new();
        graph.ensure_module("/src/main.ts", "/src/main.ts");
        assert_eq!(graph.get("/src/main.ts").unwrap().last_invalidation_timestamp, 0);

        graph.invalidate("/src/main.ts");
        assert!(graph.get("/src/main.ts").unwrap().last_invalidation_timestamp > 0);

        // Unknown modules are ignored.
        graph.invalidate("/src/missing.ts");
    }

    #[tokio::test]
    async fn test_send_update_reaches_subscribers() {
        let graph = ModuleGraph::new();
        graph.send_update(HmrPayload::Error {
            message: "before subscribe".to_string(),
        });

        let mut rx = graph.subscribe();
        let payload = HmrPayload::Update {
            updates: vec![HmrUpdate::js_update("/m.ts", 1)],
        };
        graph.send_update(payload.clone());
        assert_eq!(rx.recv().await.unwrap(), payload);
    }
}
