//! Summarize node executor.
//!
//! Groups items by a set of split fields and computes per-group aggregates
//! (sum, average, count, concatenation, min/max, append), flattened either
//! into one item per group or a single nested item.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::core::ExecutionContext;
use crate::error::NodeError;
use crate::item::compare::{canonical_key, number_value, to_display_string, to_f64};
use crate::item::{Item, PairedItem};
use crate::nodes::executor::{NodeExecutor, NodeRunResult};
use crate::nodes::main_input;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct SummarizeConfig {
    #[serde(default)]
    fields_to_split_by: Vec<String>,
    fields_to_summarize: Vec<SummarizeField>,
    #[serde(default)]
    options: SummarizeOptions,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct SummarizeField {
    field: String,
    aggregation: Aggregation,
    #[serde(default)]
    separator: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum Aggregation {
    Append,
    Average,
    Concatenate,
    Count,
    CountUnique,
    Max,
    Min,
    Sum,
}

impl Aggregation {
    fn output_field(&self, field: &str) -> String {
        let prefix = match self {
            Aggregation::Append => "appended",
            Aggregation::Average => "average",
            Aggregation::Concatenate => "concatenated",
            Aggregation::Count => "count",
            Aggregation::CountUnique => "unique_count",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Sum => "sum",
        };
        format!("{}_{}", prefix, field)
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            Aggregation::Average | Aggregation::Max | Aggregation::Min | Aggregation::Sum
        )
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct SummarizeOptions {
    #[serde(default)]
    output_format: OutputFormat,
    #[serde(default)]
    ignore_items_without_valid_fields: bool,
    #[serde(default)]
    disable_dot_notation: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
enum OutputFormat {
    #[default]
    SeparateItems,
    SingleItem,
}

pub struct SummarizeExecutor;

#[async_trait]
impl NodeExecutor for SummarizeExecutor {
    async fn execute(
        &self,
        _node_id: &str,
        config: &Value,
        input: &[Vec<Item>],
        _context: &ExecutionContext,
    ) -> Result<NodeRunResult, NodeError> {
        let config: SummarizeConfig = serde_json::from_value(config.clone())
            .map_err(|e| NodeError::ConfigError(e.to_string()))?;
        if config.fields_to_summarize.is_empty() {
            return Err(NodeError::ConfigError(
                "fieldsToSummarize must name at least one field".to_string(),
            ));
        }
        let items = main_input(input)?;
        let dot = !config.options.disable_dot_notation;

        let groups = group_items(items, &config, dot);

        match config.options.output_format {
            OutputFormat::SeparateItems => {
                let mut output = Vec::with_capacity(groups.len());
                for group in &groups {
                    let mut json = Map::new();
                    for (field, value) in config.fields_to_split_by.iter().zip(&group.key) {
                        json.insert(field.clone(), value.clone());
                    }
                    for (spec_index, spec) in config.fields_to_summarize.iter().enumerate() {
                        json.insert(
                            spec.aggregation.output_field(&spec.field),
                            aggregate(spec, &group.values[spec_index], &config.options)?,
                        );
                    }
                    output.push(
                        Item::from_object(json).with_paired(paired_from(&group.indices)),
                    );
                }
                Ok(NodeRunResult::single(output))
            }
            OutputFormat::SingleItem => {
                let mut root = Value::Object(Map::new());
                let mut all_indices = Vec::new();
                for group in &groups {
                    let mut leaf = Map::new();
                    for (spec_index, spec) in config.fields_to_summarize.iter().enumerate() {
                        leaf.insert(
                            spec.aggregation.output_field(&spec.field),
                            aggregate(spec, &group.values[spec_index], &config.options)?,
                        );
                    }
                    insert_nested(&mut root, &group.key, Value::Object(leaf));
                    all_indices.extend(group.indices.iter().copied());
                }
                Ok(NodeRunResult::single(vec![
                    Item::new(root).with_paired(paired_from(&all_indices)),
                ]))
            }
        }
    }
}

struct Group {
    key: Vec<Value>,
    indices: Vec<usize>,
    /// Collected raw values, in input order, one bucket per entry of
    /// `fieldsToSummarize`. The same field may appear under several
    /// aggregations, so buckets are positional rather than keyed by name.
    values: Vec<Vec<Value>>,
}

fn group_items(items: &[Item], config: &SummarizeConfig, dot: bool) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        let key: Vec<Value> = config
            .fields_to_split_by
            .iter()
            .map(|field| item.field(field, dot).cloned().unwrap_or(Value::Null))
            .collect();

        if config.options.ignore_items_without_valid_fields
            && key.iter().any(|value| value.is_null())
        {
            continue;
        }

        let hash = canonical_key(&Value::Array(key.clone()));
        let group_index = *by_key.entry(hash).or_insert_with(|| {
            groups.push(Group {
                key: key.clone(),
                indices: Vec::new(),
                values: vec![Vec::new(); config.fields_to_summarize.len()],
            });
            groups.len() - 1
        });

        let group = &mut groups[group_index];
        group.indices.push(index);
        for (spec_index, spec) in config.fields_to_summarize.iter().enumerate() {
            let value = item.field(&spec.field, dot).cloned().unwrap_or(Value::Null);
            group.values[spec_index].push(value);
        }
    }

    groups
}

fn aggregate(
    spec: &SummarizeField,
    values: &[Value],
    options: &SummarizeOptions,
) -> Result<Value, NodeError> {
    if spec.aggregation.is_numeric() {
        let mut numbers = Vec::with_capacity(values.len());
        for value in values {
            match to_f64(value) {
                Some(n) => numbers.push(n),
                None if options.ignore_items_without_valid_fields => {}
                None => {
                    return Err(NodeError::TypeError(format!(
                        "Value of '{}' is not numeric: {}",
                        spec.field, value
                    )))
                }
            }
        }
        let result = match spec.aggregation {
            Aggregation::Sum => numbers.iter().sum::<f64>(),
            Aggregation::Average => {
                if numbers.is_empty() {
                    return Ok(Value::Null);
                }
                numbers.iter().sum::<f64>() / numbers.len() as f64
            }
            Aggregation::Min => match numbers.iter().cloned().reduce(f64::min) {
                Some(min) => min,
                None => return Ok(Value::Null),
            },
            Aggregation::Max => match numbers.iter().cloned().reduce(f64::max) {
                Some(max) => max,
                None => return Ok(Value::Null),
            },
            _ => unreachable!(),
        };
        return Ok(number_value(result));
    }

    Ok(match spec.aggregation {
        Aggregation::Append => Value::Array(values.to_vec()),
        Aggregation::Count => {
            Value::from(values.iter().filter(|v| !v.is_null()).count())
        }
        Aggregation::CountUnique => {
            let unique: std::collections::HashSet<String> = values
                .iter()
                .filter(|v| !v.is_null())
                .map(canonical_key)
                .collect();
            Value::from(unique.len())
        }
        Aggregation::Concatenate => {
            let separator = spec.separator.as_deref().unwrap_or(",");
            Value::String(
                values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(to_display_string)
                    .collect::<Vec<_>>()
                    .join(separator),
            )
        }
        _ => unreachable!(),
    })
}

/// Nest a group's leaf under its rendered key values. Keys nest by display
/// string, so distinct values with the same rendering (`1` and `"1"`) share
/// a slot and the later group's leaf wins.
fn insert_nested(root: &mut Value, key: &[Value], leaf: Value) {
    let mut current = root;
    for value in key {
        let map = match current.as_object_mut() {
            Some(map) => map,
            None => return,
        };
        current = map
            .entry(to_display_string(value))
            .or_insert_with(|| Value::Object(Map::new()));
    }
    *current = leaf;
}

fn paired_from(indices: &[usize]) -> PairedItem {
    PairedItem::Many(indices.iter().map(|&i| PairedItem::Index(i)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(values: Vec<Value>) -> Vec<Item> {
        values.into_iter().map(Item::new).collect()
    }

    fn orders() -> Vec<Item> {
        items(vec![
            json!({"region": "eu", "amount": 10, "product": "a"}),
            json!({"region": "us", "amount": 5, "product": "b"}),
            json!({"region": "eu", "amount": 20, "product": "c"}),
        ])
    }

    #[tokio::test]
    async fn test_summarize_sum_by_region() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSplitBy": ["region"],
            "fieldsToSummarize": [{"field": "amount", "aggregation": "sum"}]
        });

        let result = executor
            .execute("s1", &config, &[orders()], &context)
            .await
            .unwrap();
        let output = &result.outputs[0];
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].json, json!({"region": "eu", "sum_amount": 30}));
        assert_eq!(output[1].json, json!({"region": "us", "sum_amount": 5}));
    }

    #[tokio::test]
    async fn test_summarize_multiple_aggregations() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSplitBy": ["region"],
            "fieldsToSummarize": [
                {"field": "amount", "aggregation": "average"},
                {"field": "product", "aggregation": "concatenate", "separator": "+"},
                {"field": "product", "aggregation": "count"}
            ]
        });

        let result = executor
            .execute("s2", &config, &[orders()], &context)
            .await
            .unwrap();
        let eu = &result.outputs[0][0].json;
        assert_eq!(eu["average_amount"], json!(15));
        assert_eq!(eu["concatenated_product"], json!("a+c"));
        assert_eq!(eu["count_product"], json!(2));
    }

    #[tokio::test]
    async fn test_summarize_no_split_fields() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSummarize": [{"field": "amount", "aggregation": "max"}]
        });

        let result = executor
            .execute("s3", &config, &[orders()], &context)
            .await
            .unwrap();
        let output = &result.outputs[0];
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].json, json!({"max_amount": 20}));
    }

    #[tokio::test]
    async fn test_summarize_single_item_output() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSplitBy": ["region"],
            "fieldsToSummarize": [{"field": "amount", "aggregation": "sum"}],
            "options": {"outputFormat": "singleItem"}
        });

        let result = executor
            .execute("s4", &config, &[orders()], &context)
            .await
            .unwrap();
        let output = &result.outputs[0];
        assert_eq!(output.len(), 1);
        assert_eq!(
            output[0].json,
            json!({"eu": {"sum_amount": 30}, "us": {"sum_amount": 5}})
        );
    }

    #[tokio::test]
    async fn test_summarize_append_and_count_unique() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSummarize": [
                {"field": "region", "aggregation": "append"},
                {"field": "region", "aggregation": "countUnique"}
            ]
        });

        let result = executor
            .execute("s5", &config, &[orders()], &context)
            .await
            .unwrap();
        let json = &result.outputs[0][0].json;
        assert_eq!(json["appended_region"], json!(["eu", "us", "eu"]));
        assert_eq!(json["unique_count_region"], json!(2));
    }

    #[tokio::test]
    async fn test_summarize_same_field_under_two_aggregations() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSummarize": [
                {"field": "product", "aggregation": "concatenate", "separator": "+"},
                {"field": "product", "aggregation": "count"}
            ]
        });
        let input = items(vec![json!({"product": "a"}), json!({"product": "c"})]);

        let result = executor
            .execute("s9", &config, &[input], &context)
            .await
            .unwrap();
        let json = &result.outputs[0][0].json;
        // Each value is collected once per input item, not once per
        // aggregation naming the field.
        assert_eq!(json["concatenated_product"], json!("a+c"));
        assert_eq!(json["count_product"], json!(2));
    }

    #[tokio::test]
    async fn test_summarize_single_item_key_rendering_last_wins() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSplitBy": ["k"],
            "fieldsToSummarize": [{"field": "amount", "aggregation": "sum"}],
            "options": {"outputFormat": "singleItem"}
        });
        let input = items(vec![
            json!({"k": 1, "amount": 10}),
            json!({"k": "1", "amount": 20}),
        ]);

        let result = executor
            .execute("s10", &config, &[input], &context)
            .await
            .unwrap();
        // `1` and `"1"` render to the same nesting key; the later group's
        // leaf replaces the earlier one.
        assert_eq!(result.outputs[0][0].json, json!({"1": {"sum_amount": 20}}));
    }

    #[tokio::test]
    async fn test_summarize_invalid_numeric_fails() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSummarize": [{"field": "amount", "aggregation": "sum"}]
        });
        let input = items(vec![json!({"amount": "not a number"})]);

        let err = executor
            .execute("s6", &config, &[input], &context)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::TypeError(_)));
    }

    #[tokio::test]
    async fn test_summarize_ignore_invalid_fields() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSplitBy": ["region"],
            "fieldsToSummarize": [{"field": "amount", "aggregation": "sum"}],
            "options": {"ignoreItemsWithoutValidFields": true}
        });
        let input = items(vec![
            json!({"region": "eu", "amount": 1}),
            json!({"amount": 99}),
            json!({"region": "eu", "amount": "x"}),
        ]);

        let result = executor
            .execute("s7", &config, &[input], &context)
            .await
            .unwrap();
        let output = &result.outputs[0];
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].json, json!({"region": "eu", "sum_amount": 1}));
    }

    #[tokio::test]
    async fn test_summarize_paired_items_cover_group() {
        let executor = SummarizeExecutor;
        let context = ExecutionContext::default();
        let config = json!({
            "fieldsToSplitBy": ["region"],
            "fieldsToSummarize": [{"field": "amount", "aggregation": "count"}]
        });

        let result = executor
            .execute("s8", &config, &[orders()], &context)
            .await
            .unwrap();
        assert_eq!(
            result.outputs[0][0].paired_item,
            Some(PairedItem::Many(vec![
                PairedItem::Index(0),
                PairedItem::Index(2)
            ]))
        );
    }
}
