use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Render a node number the way the mesh displays it
pub fn node_id(num: u32) -> String {
    format!("!{num:08x}")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub num: u32,
    pub long_name: String,
    pub short_name: String,
    pub last_heard: Option<u64>,
}

/// Nodes reported by the radio, keyed by `!xxxxxxxx` id.
///
/// Written by the transport's packet pump, read when naming senders.
#[derive(Debug, Clone, Default)]
pub struct NodeDirectory {
    inner: Arc<Mutex<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    nodes: HashMap<String, NodeInfo>,
    my_node_num: Option<u32>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update_node(&self, node: NodeInfo) {
        self.inner.lock().await.nodes.insert(node.id.clone(), node);
    }

    pub async fn get(&self, id: &str) -> Option<NodeInfo> {
        self.inner.lock().await.nodes.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.nodes.len()
    }

    pub async fn set_my_node_num(&self, num: u32) {
        self.inner.lock().await.my_node_num = Some(num);
    }

    pub async fn my_node_num(&self) -> Option<u32> {
        self.inner.lock().await.my_node_num
    }
}

/// Resolves sender ids to display names.
///
/// Order: configured override, radio-reported long name, short name, raw id.
#[derive(Debug, Clone, Default)]
pub struct NodeNames {
    overrides: Arc<HashMap<String, String>>,
    directory: NodeDirectory,
}

impl NodeNames {
    pub fn new(overrides: HashMap<String, String>, directory: NodeDirectory) -> Self {
        Self {
            overrides: Arc::new(overrides),
            directory,
        }
    }

    pub async fn resolve(&self, id: &str) -> String {
        if let Some(name) = self.overrides.get(id) {
            return name.clone();
        }

        if let Some(node) = self.directory.get(id).await {
            let long_name = node.long_name.trim();
            if !long_name.is_empty() {
                return long_name.to_string();
            }
            let short_name = node.short_name.trim();
            if !short_name.is_empty() {
                return short_name.to_string();
            }
        }

        id.to_string()
    }
}
