//! # itemflow — data-transform nodes for workflow hosts
//!
//! `itemflow` is a library of node executors for workflow-automation
//! engines. Each node receives arrays of [`Item`]s (a JSON record plus
//! optional binary attachments and paired-item provenance), transforms
//! them in a single pass, and returns one or more output branches:
//!
//! - **Compare Datasets**: pairs records across two inputs by key fields
//!   and classifies them as only-in-A, same, different, or only-in-B.
//! - **Remove Duplicates**: dedups within a batch or across executions via
//!   persisted key history, an incremental counter, or a date watermark.
//! - **Summarize**: groups records by split fields and computes per-group
//!   aggregates (sum, average, count, concatenation, min/max, append).
//! - **Split In Batches**: emits fixed-size slices of a larger input across
//!   repeated host-driven calls, with its cursor in static workflow data.
//! - **Item Lists**: sort, limit, aggregate-into-one, split-a-list-out.
//!
//! The host engine owns scheduling, parameter resolution, and the
//! continue-on-fail policy; nodes are invoked through the
//! [`NodeExecutor`] trait with an [`ExecutionContext`] the host supplies.
//!
//! # Quick Start
//!
//! ```rust
//! use itemflow::{ExecutionContext, Item, NodeExecutorRegistry};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = NodeExecutorRegistry::new();
//!     let executor = registry.get("summarize").unwrap();
//!     let input = vec![vec![
//!         Item::new(json!({"group": "a", "value": 1})),
//!         Item::new(json!({"group": "a", "value": 2})),
//!     ]];
//!     let config = json!({
//!         "fieldsToSplitBy": ["group"],
//!         "fieldsToSummarize": [{"field": "value", "aggregation": "sum"}]
//!     });
//!     let result = executor
//!         .execute("node-1", &config, &input, &ExecutionContext::default())
//!         .await
//!         .unwrap();
//!     println!("{:?}", result.outputs[0]);
//! }
//! ```

pub mod core;
pub mod error;
pub mod item;
pub mod nodes;

pub use crate::core::{ExecutionContext, StaticDataStore};
pub use crate::error::NodeError;
pub use crate::item::{BinaryData, Item, PairedItem};
pub use crate::nodes::{
    NodeExecutionStatus, NodeExecutor, NodeExecutorRegistry, NodeRunResult,
};
