use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::core::ExecutionContext;
use crate::error::NodeError;
use crate::item::Item;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionStatus {
    Succeeded,
    Failed,
}

/// Result of one node invocation.
///
/// `outputs` holds one item array per output branch, in the branch order
/// documented on each executor. Single-output nodes use one branch.
#[derive(Debug, Clone)]
pub struct NodeRunResult {
    pub status: NodeExecutionStatus,
    pub outputs: Vec<Vec<Item>>,
    pub metadata: HashMap<String, Value>,
    pub error: Option<String>,
}

impl Default for NodeRunResult {
    fn default() -> Self {
        NodeRunResult {
            status: NodeExecutionStatus::Succeeded,
            outputs: Vec::new(),
            metadata: HashMap::new(),
            error: None,
        }
    }
}

impl NodeRunResult {
    /// Successful result with a single output branch.
    pub fn single(items: Vec<Item>) -> Self {
        NodeRunResult {
            outputs: vec![items],
            ..Default::default()
        }
    }

    /// Successful result with multiple ordered output branches.
    pub fn branches(outputs: Vec<Vec<Item>>) -> Self {
        NodeRunResult {
            outputs,
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Trait for node execution. Each node type implements this.
///
/// `input` carries one item array per input connection; most nodes read only
/// connection 0, compare-datasets reads two.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(
        &self,
        node_id: &str,
        config: &Value,
        input: &[Vec<Item>],
        context: &ExecutionContext,
    ) -> Result<NodeRunResult, NodeError>;
}

/// Registry of node executors by node type string
pub struct NodeExecutorRegistry {
    executors: HashMap<String, Box<dyn NodeExecutor>>,
}

impl NodeExecutorRegistry {
    /// Registry with all built-in executors registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "compare-datasets",
            Box::new(super::compare_datasets::CompareDatasetsExecutor),
        );
        registry.register(
            "remove-duplicates",
            Box::new(super::remove_duplicates::RemoveDuplicatesExecutor),
        );
        registry.register("summarize", Box::new(super::summarize::SummarizeExecutor));
        registry.register(
            "split-in-batches",
            Box::new(super::split_in_batches::SplitInBatchesExecutor),
        );
        registry.register("item-lists", Box::new(super::item_lists::ItemListsExecutor));
        registry
    }

    pub fn empty() -> Self {
        NodeExecutorRegistry {
            executors: HashMap::new(),
        }
    }

    pub fn register(&mut self, node_type: &str, executor: Box<dyn NodeExecutor>) {
        self.executors.insert(node_type.to_string(), executor);
    }

    pub fn get(&self, node_type: &str) -> Option<&dyn NodeExecutor> {
        self.executors.get(node_type).map(|e| e.as_ref())
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.executors.keys().cloned().collect()
    }
}

impl Default for NodeExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
