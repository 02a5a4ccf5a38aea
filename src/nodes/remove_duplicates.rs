//! Remove Duplicates node executor.
//!
//! Deduplicates either within the current batch (full-record or
//! selected-field equality) or across executions, using key history,
//! an incremental counter, or a date watermark persisted in the workflow's
//! static data.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::core::ExecutionContext;
use crate::error::NodeError;
use crate::item::compare::{canonical_key, to_f64};
use crate::item::{field_path, Item, PairedItem};
use crate::nodes::executor::{NodeExecutor, NodeRunResult};
use crate::nodes::{collect_item_error, main_input};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct RemoveDuplicatesConfig {
    #[serde(default)]
    operation: DedupeOperation,
    #[serde(default)]
    compare: CompareFields,
    #[serde(default)]
    fields_to_exclude: Vec<String>,
    #[serde(default)]
    fields_to_compare: Vec<String>,
    #[serde(default)]
    logic: SeenLogic,
    /// Field holding the dedup key for cross-run operations.
    #[serde(default)]
    dedupe_field: Option<String>,
    #[serde(default = "default_history_size")]
    history_size: usize,
    #[serde(default)]
    options: DedupeOptions,
}

fn default_history_size() -> usize {
    10_000
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
enum DedupeOperation {
    #[default]
    RemoveInputItems,
    RemoveItemsSeenInPreviousExecutions,
    ClearDeduplicationHistory,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
enum CompareFields {
    #[default]
    AllFields,
    AllFieldsExcept,
    SelectedFields,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
enum SeenLogic {
    #[default]
    RemoveItemsWithAlreadySeenKeyValues,
    RemoveItemsUpToStoredIncrementalKey,
    RemoveItemsUpToStoredDate,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct DedupeOptions {
    #[serde(default)]
    disable_dot_notation: bool,
}

pub struct RemoveDuplicatesExecutor;

#[async_trait]
impl NodeExecutor for RemoveDuplicatesExecutor {
    async fn execute(
        &self,
        node_id: &str,
        config: &Value,
        input: &[Vec<Item>],
        context: &ExecutionContext,
    ) -> Result<NodeRunResult, NodeError> {
        let config: RemoveDuplicatesConfig = serde_json::from_value(config.clone())
            .map_err(|e| NodeError::ConfigError(e.to_string()))?;
        let items = main_input(input)?;

        match config.operation {
            DedupeOperation::RemoveInputItems => remove_input_items(&config, items),
            DedupeOperation::RemoveItemsSeenInPreviousExecutions => {
                remove_previously_seen(node_id, &config, items, context)
            }
            DedupeOperation::ClearDeduplicationHistory => {
                let cleared = context.static_data().remove(node_id).is_some();
                tracing::debug!(node_id, cleared, "cleared deduplication history");
                Ok(NodeRunResult::single(items.to_vec())
                    .with_metadata("historyCleared", Value::Bool(cleared)))
            }
        }
    }
}

fn remove_input_items(
    config: &RemoveDuplicatesConfig,
    items: &[Item],
) -> Result<NodeRunResult, NodeError> {
    let dot = !config.options.disable_dot_notation;
    if config.compare == CompareFields::SelectedFields && config.fields_to_compare.is_empty() {
        return Err(NodeError::ConfigError(
            "fieldsToCompare must name at least one field".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let key = match config.compare {
            CompareFields::AllFields => canonical_key(&item.json),
            CompareFields::AllFieldsExcept => {
                let mut trimmed = item.json.clone();
                for field in &config.fields_to_exclude {
                    field_path::remove_path(&mut trimmed, field, dot);
                }
                canonical_key(&trimmed)
            }
            CompareFields::SelectedFields => {
                let values: Vec<Value> = config
                    .fields_to_compare
                    .iter()
                    .map(|field| item.field(field, dot).cloned().unwrap_or(Value::Null))
                    .collect();
                canonical_key(&Value::Array(values))
            }
        };
        if seen.insert(key) {
            kept.push(item.clone().with_paired(PairedItem::Index(index)));
        }
    }

    let removed = items.len() - kept.len();
    Ok(NodeRunResult::single(kept).with_metadata("removedItems", Value::from(removed)))
}

/// State stored per node id for the cross-run operations.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct DedupeHistory {
    #[serde(default)]
    seen_keys: Vec<String>,
    #[serde(default)]
    incremental_key: Option<f64>,
    #[serde(default)]
    date: Option<String>,
}

fn remove_previously_seen(
    node_id: &str,
    config: &RemoveDuplicatesConfig,
    items: &[Item],
    context: &ExecutionContext,
) -> Result<NodeRunResult, NodeError> {
    let dot = !config.options.disable_dot_notation;
    let field = config.dedupe_field.as_deref().ok_or_else(|| {
        NodeError::ConfigError("dedupeField is required for cross-run deduplication".to_string())
    })?;

    let mut history: DedupeHistory = match context.static_data().get(node_id) {
        Some(state) => serde_json::from_value(state)
            .map_err(|e| NodeError::StateError(format!("Corrupt dedup history: {}", e)))?,
        None => DedupeHistory::default(),
    };

    let mut kept = Vec::new();
    match config.logic {
        SeenLogic::RemoveItemsWithAlreadySeenKeyValues => {
            let mut seen: HashSet<String> = history.seen_keys.iter().cloned().collect();
            for (index, item) in items.iter().enumerate() {
                let value = match item.field(field, dot) {
                    Some(value) => value,
                    None => {
                        collect_item_error(
                            NodeError::FieldNotFound(field.to_string()),
                            Some(PairedItem::Index(index)),
                            context,
                            &mut kept,
                        )?;
                        continue;
                    }
                };
                let key = canonical_key(value);
                if seen.insert(key.clone()) {
                    history.seen_keys.push(key);
                    kept.push(item.clone().with_paired(PairedItem::Index(index)));
                }
            }
            if history.seen_keys.len() > config.history_size {
                let evict = history.seen_keys.len() - config.history_size;
                tracing::debug!(node_id, evict, "evicting oldest dedup keys");
                history.seen_keys.drain(..evict);
            }
        }
        SeenLogic::RemoveItemsUpToStoredIncrementalKey => {
            let watermark = history.incremental_key;
            for (index, item) in items.iter().enumerate() {
                let key = item
                    .field(field, dot)
                    .and_then(to_f64)
                    .ok_or_else(|| {
                        NodeError::TypeError(format!(
                            "Value of '{}' is not numeric",
                            field
                        ))
                    });
                let key = match key {
                    Ok(key) => key,
                    Err(e) => {
                        collect_item_error(
                            e,
                            Some(PairedItem::Index(index)),
                            context,
                            &mut kept,
                        )?;
                        continue;
                    }
                };
                if watermark.map_or(true, |w| key > w) {
                    kept.push(item.clone().with_paired(PairedItem::Index(index)));
                }
                if history.incremental_key.map_or(true, |w| key > w) {
                    history.incremental_key = Some(key);
                }
            }
        }
        SeenLogic::RemoveItemsUpToStoredDate => {
            let watermark = match &history.date {
                Some(date) => Some(parse_date(date).map_err(|e| {
                    NodeError::StateError(format!("Corrupt date watermark: {}", e))
                })?),
                None => None,
            };
            let mut max_seen = watermark;
            for (index, item) in items.iter().enumerate() {
                let date = item
                    .field(field, dot)
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        NodeError::FieldNotFound(field.to_string())
                    })
                    .and_then(|s| {
                        parse_date(s).map_err(|e| {
                            NodeError::TypeError(format!(
                                "Value of '{}' is not an RFC 3339 date: {}",
                                field, e
                            ))
                        })
                    });
                let date = match date {
                    Ok(date) => date,
                    Err(e) => {
                        collect_item_error(
                            e,
                            Some(PairedItem::Index(index)),
                            context,
                            &mut kept,
                        )?;
                        continue;
                    }
                };
                if watermark.map_or(true, |w| date > w) {
                    kept.push(item.clone().with_paired(PairedItem::Index(index)));
                }
                if max_seen.map_or(true, |m| date > m) {
                    max_seen = Some(date);
                }
            }
            history.date = max_seen.map(|d| d.to_rfc3339());
        }
    }

    let removed = items.len().saturating_sub(kept.len());
    context
        .static_data()
        .set(node_id, serde_json::to_value(&history)?);

    Ok(NodeRunResult::single(kept).with_metadata("removedItems", Value::from(removed)))
}

fn parse_date(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
}
