//! Item Lists node executor: single-stream list operations
//! (sort, limit, aggregate into one record, split a list field out).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::core::ExecutionContext;
use crate::error::NodeError;
use crate::item::{field_path, Item, PairedItem};
use crate::nodes::executor::{NodeExecutor, NodeRunResult};
use crate::nodes::{collect_item_error, main_input};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct ItemListsConfig {
    operation: ListOperation,
    #[serde(default)]
    sort_fields: Vec<SortField>,
    #[serde(default = "default_max_items")]
    max_items: usize,
    #[serde(default)]
    keep: KeepMode,
    /// Field collected by `aggregate-items`; whole records when absent.
    #[serde(default)]
    field_to_aggregate: Option<String>,
    /// Output field for `aggregate-items` / `split-out-items`.
    #[serde(default)]
    destination_field: Option<String>,
    #[serde(default)]
    field_to_split_out: Option<String>,
    #[serde(default)]
    include: IncludeMode,
    #[serde(default)]
    options: ListOptions,
}

fn default_max_items() -> usize {
    1
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum ListOperation {
    Sort,
    Limit,
    AggregateItems,
    SplitOutItems,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct SortField {
    field_name: String,
    #[serde(default)]
    order: SortOrder,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
enum KeepMode {
    #[default]
    FirstItems,
    LastItems,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
enum IncludeMode {
    #[default]
    NoOtherFields,
    AllOtherFields,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct ListOptions {
    #[serde(default)]
    disable_dot_notation: bool,
}

pub struct ItemListsExecutor;

#[async_trait]
impl NodeExecutor for ItemListsExecutor {
    async fn execute(
        &self,
        _node_id: &str,
        config: &Value,
        input: &[Vec<Item>],
        context: &ExecutionContext,
    ) -> Result<NodeRunResult, NodeError> {
        let config: ItemListsConfig = serde_json::from_value(config.clone())
            .map_err(|e| NodeError::ConfigError(e.to_string()))?;
        let items = main_input(input)?;

        let output = match config.operation {
            ListOperation::Sort => execute_sort(&config, items)?,
            ListOperation::Limit => execute_limit(&config, items),
            ListOperation::AggregateItems => execute_aggregate(&config, items),
            ListOperation::SplitOutItems => execute_split_out(&config, items, context)?,
        };

        Ok(NodeRunResult::single(output))
    }
}

fn execute_sort(config: &ItemListsConfig, items: &[Item]) -> Result<Vec<Item>, NodeError> {
    if config.sort_fields.is_empty() {
        return Err(NodeError::ConfigError(
            "Sort operation requires sortFields".to_string(),
        ));
    }
    let dot = !config.options.disable_dot_notation;

    let mut sorted: Vec<Item> = items
        .iter()
        .enumerate()
        .map(|(index, item)| item.clone().with_paired(PairedItem::Index(index)))
        .collect();

    sorted.sort_by(|a, b| {
        for sort_field in &config.sort_fields {
            let a_val = a.field(&sort_field.field_name, dot);
            let b_val = b.field(&sort_field.field_name, dot);

            let cmp = match (a_val, b_val) {
                (Some(Value::Number(a)), Some(Value::Number(b))) => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .unwrap_or(Ordering::Equal),
                (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                _ => Ordering::Equal,
            };

            let cmp = match sort_field.order {
                SortOrder::Ascending => cmp,
                SortOrder::Descending => cmp.reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });

    Ok(sorted)
}

fn execute_limit(config: &ItemListsConfig, items: &[Item]) -> Vec<Item> {
    let count = config.max_items.min(items.len());
    let range = match config.keep {
        KeepMode::FirstItems => 0..count,
        KeepMode::LastItems => items.len() - count..items.len(),
    };
    range
        .map(|index| items[index].clone().with_paired(PairedItem::Index(index)))
        .collect()
}

fn execute_aggregate(config: &ItemListsConfig, items: &[Item]) -> Vec<Item> {
    let dot = !config.options.disable_dot_notation;
    let destination = config.destination_field.as_deref().unwrap_or("data");

    let collected: Vec<Value> = match &config.field_to_aggregate {
        Some(field) => items
            .iter()
            .filter_map(|item| item.field(field, dot).cloned())
            .collect(),
        None => items.iter().map(|item| item.json.clone()).collect(),
    };

    let mut json = Map::new();
    json.insert(destination.to_string(), Value::Array(collected));
    vec![Item::from_object(json).with_paired(PairedItem::Many(
        (0..items.len()).map(PairedItem::Index).collect(),
    ))]
}

fn execute_split_out(
    config: &ItemListsConfig,
    items: &[Item],
    context: &ExecutionContext,
) -> Result<Vec<Item>, NodeError> {
    let dot = !config.options.disable_dot_notation;
    let field = config.field_to_split_out.as_deref().ok_or_else(|| {
        NodeError::ConfigError("Split-out operation requires fieldToSplitOut".to_string())
    })?;
    let destination = config.destination_field.as_deref().unwrap_or(field);

    let mut output = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let elements = match item.field(field, dot) {
            Some(Value::Array(elements)) => elements.clone(),
            Some(other) => {
                collect_item_error(
                    NodeError::TypeError(format!(
                        "Field '{}' is not a list: {}",
                        field, other
                    )),
                    Some(PairedItem::Index(index)),
                    context,
                    &mut output,
                )?;
                continue;
            }
            None => {
                collect_item_error(
                    NodeError::FieldNotFound(field.to_string()),
                    Some(PairedItem::Index(index)),
                    context,
                    &mut output,
                )?;
                continue;
            }
        };

        for element in elements {
            let mut json = match config.include {
                IncludeMode::AllOtherFields => {
                    let mut rest = item.json.clone();
                    field_path::remove_path(&mut rest, field, dot);
                    rest
                }
                IncludeMode::NoOtherFields => Value::Object(Map::new()),
            };
            field_path::set_path(&mut json, destination, element, dot);
            output.push(Item::new(json).with_paired(PairedItem::Index(index)));
        }
    }

    Ok(output)
}
