//! Split In Batches node executor.
//!
//! Emits fixed-size slices of a larger input across repeated host-driven
//! invocations. The cursor (remaining items, run index) lives in the
//! workflow's static data, keyed by node id. Output branches, in order:
//! `done`, `loop`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ExecutionContext;
use crate::error::NodeError;
use crate::item::{Item, PairedItem};
use crate::nodes::executor::{NodeExecutor, NodeRunResult};
use crate::nodes::main_input;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct SplitInBatchesConfig {
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default)]
    options: BatchOptions,
}

fn default_batch_size() -> usize {
    1
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct BatchOptions {
    /// Discard any stored cursor and treat this call's input as a new set.
    #[serde(default)]
    reset: bool,
}

/// Cursor persisted between invocations.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct BatchCursor {
    remaining: Vec<Item>,
    current_run_index: usize,
}

pub struct SplitInBatchesExecutor;

#[async_trait]
impl NodeExecutor for SplitInBatchesExecutor {
    async fn execute(
        &self,
        node_id: &str,
        config: &Value,
        input: &[Vec<Item>],
        context: &ExecutionContext,
    ) -> Result<NodeRunResult, NodeError> {
        let config: SplitInBatchesConfig = serde_json::from_value(config.clone())
            .map_err(|e| NodeError::ConfigError(e.to_string()))?;
        if config.batch_size == 0 {
            return Err(NodeError::ConfigError(
                "batchSize must be at least 1".to_string(),
            ));
        }
        let items = main_input(input)?;

        let stored = if config.options.reset {
            context.static_data().remove(node_id);
            None
        } else {
            context.static_data().get(node_id)
        };

        match stored {
            None => {
                // First call: stamp absolute provenance, emit the head slice
                // and store the tail.
                let mut all: Vec<Item> = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| item.clone().with_paired(PairedItem::Index(index)))
                    .collect();
                let tail = all.split_off(config.batch_size.min(all.len()));
                let cursor = BatchCursor {
                    remaining: tail,
                    current_run_index: 0,
                };
                let no_items_left = cursor.remaining.is_empty();
                tracing::debug!(
                    node_id,
                    batch = all.len(),
                    remaining = cursor.remaining.len(),
                    "started batch iteration"
                );
                context
                    .static_data()
                    .set(node_id, serde_json::to_value(&cursor)?);
                Ok(NodeRunResult::branches(vec![vec![], all])
                    .with_metadata("currentRunIndex", Value::from(0))
                    .with_metadata("noItemsLeft", Value::Bool(no_items_left)))
            }
            Some(state) => {
                let mut cursor: BatchCursor = serde_json::from_value(state)
                    .map_err(|e| NodeError::StateError(format!("Corrupt batch cursor: {}", e)))?;

                if cursor.remaining.is_empty() {
                    // Exhausted: route this call's input to `done` and drop
                    // the cursor so a later call starts over.
                    let run_index = cursor.current_run_index + 1;
                    context.static_data().remove(node_id);
                    tracing::debug!(node_id, run_index, "batch iteration finished");
                    return Ok(NodeRunResult::branches(vec![items.to_vec(), vec![]])
                        .with_metadata("currentRunIndex", Value::from(run_index))
                        .with_metadata("noItemsLeft", Value::Bool(true)));
                }

                let tail = cursor
                    .remaining
                    .split_off(config.batch_size.min(cursor.remaining.len()));
                let batch = std::mem::replace(&mut cursor.remaining, tail);
                cursor.current_run_index += 1;
                let run_index = cursor.current_run_index;
                let no_items_left = cursor.remaining.is_empty();
                context
                    .static_data()
                    .set(node_id, serde_json::to_value(&cursor)?);
                Ok(NodeRunResult::branches(vec![vec![], batch])
                    .with_metadata("currentRunIndex", Value::from(run_index))
                    .with_metadata("noItemsLeft", Value::Bool(no_items_left)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    use crate::core::StaticDataStore;

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(json!({"n": i}))).collect()
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new().with_static_data(Arc::new(StaticDataStore::new()))
    }

    #[tokio::test]
    async fn test_batches_until_exhausted() {
        let executor = SplitInBatchesExecutor;
        let context = context();
        let config = json!({"batchSize": 2});
        let input = items(5);

        let first = executor
            .execute("b1", &config, &[input], &context)
            .await
            .unwrap();
        assert!(first.outputs[0].is_empty());
        assert_eq!(first.outputs[1].len(), 2);
        assert_eq!(first.metadata["noItemsLeft"], json!(false));

        let second = executor
            .execute("b1", &config, &[vec![]], &context)
            .await
            .unwrap();
        assert_eq!(second.outputs[1].len(), 2);

        let third = executor
            .execute("b1", &config, &[vec![]], &context)
            .await
            .unwrap();
        assert_eq!(third.outputs[1].len(), 1);
        assert_eq!(third.metadata["noItemsLeft"], json!(true));

        // The loop body's final results arrive with the next call and are
        // routed to `done`; the cursor is gone afterwards.
        let done = executor
            .execute("b1", &config, &[items(1)], &context)
            .await
            .unwrap();
        assert_eq!(done.outputs[0].len(), 1);
        assert!(done.outputs[1].is_empty());
        assert_eq!(done.metadata["noItemsLeft"], json!(true));
        assert!(context.static_data().is_empty());
    }

    #[tokio::test]
    async fn test_batch_run_index_advances() {
        let executor = SplitInBatchesExecutor;
        let context = context();
        let config = json!({"batchSize": 1});

        let first = executor
            .execute("b2", &config, &[items(2)], &context)
            .await
            .unwrap();
        assert_eq!(first.metadata["currentRunIndex"], json!(0));

        let second = executor
            .execute("b2", &config, &[vec![]], &context)
            .await
            .unwrap();
        assert_eq!(second.metadata["currentRunIndex"], json!(1));
    }

    #[tokio::test]
    async fn test_batch_paired_items_absolute() {
        let executor = SplitInBatchesExecutor;
        let context = context();
        let config = json!({"batchSize": 2});

        executor
            .execute("b3", &config, &[items(3)], &context)
            .await
            .unwrap();
        let second = executor
            .execute("b3", &config, &[vec![]], &context)
            .await
            .unwrap();
        assert_eq!(second.outputs[1][0].paired_item, Some(PairedItem::Index(2)));
    }

    #[tokio::test]
    async fn test_batch_reset_starts_over() {
        let executor = SplitInBatchesExecutor;
        let context = context();
        let config = json!({"batchSize": 1});

        executor
            .execute("b4", &config, &[items(3)], &context)
            .await
            .unwrap();

        let reset_config = json!({"batchSize": 1, "options": {"reset": true}});
        let result = executor
            .execute("b4", &reset_config, &[items(2)], &context)
            .await
            .unwrap();
        assert_eq!(result.metadata["currentRunIndex"], json!(0));
        assert_eq!(result.outputs[1][0].json["n"], json!(0));
    }

    #[tokio::test]
    async fn test_batch_size_zero_rejected() {
        let executor = SplitInBatchesExecutor;
        let context = context();
        let config = json!({"batchSize": 0});
        let err = executor
            .execute("b5", &config, &[items(1)], &context)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_single_batch_input_signals_done_next_call() {
        let executor = SplitInBatchesExecutor;
        let context = context();
        let config = json!({"batchSize": 10});

        let first = executor
            .execute("b6", &config, &[items(3)], &context)
            .await
            .unwrap();
        assert_eq!(first.outputs[1].len(), 3);
        assert_eq!(first.metadata["noItemsLeft"], json!(true));

        let second = executor
            .execute("b6", &config, &[items(3)], &context)
            .await
            .unwrap();
        assert_eq!(second.outputs[0].len(), 3);
    }
}
