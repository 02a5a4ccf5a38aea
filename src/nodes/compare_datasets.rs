//! Compare Datasets node executor.
//!
//! Pairs records across two input streams by configured key fields and
//! classifies every record into one of four ordered output branches:
//! `in A only`, `same`, `different`, `in B only`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::core::ExecutionContext;
use crate::error::NodeError;
use crate::item::compare::values_equal;
use crate::item::{field_path, Item, PairedItem};
use crate::nodes::executor::{NodeExecutor, NodeRunResult};
use crate::nodes::main_input;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct CompareDatasetsConfig {
    merge_by_fields: Vec<FieldPair>,
    #[serde(default)]
    resolve: ResolveMode,
    /// Which side a `mix` resolution starts from.
    #[serde(default)]
    prefer_when_mix: PreferSide,
    /// Fields taken from the other side under `mix`.
    #[serde(default)]
    except_when_mix: Vec<String>,
    #[serde(default)]
    options: CompareOptions,
}

#[derive(Deserialize, Debug, Clone)]
struct FieldPair {
    field1: String,
    field2: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
enum ResolveMode {
    PreferInput1,
    PreferInput2,
    Mix,
    #[default]
    IncludeBoth,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
enum PreferSide {
    #[default]
    Input1,
    Input2,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
enum MultipleMatches {
    #[default]
    First,
    All,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct CompareOptions {
    #[serde(default)]
    fuzzy_compare: bool,
    #[serde(default)]
    disable_dot_notation: bool,
    #[serde(default)]
    multiple_matches: MultipleMatches,
    /// Fields ignored when deciding same vs different.
    #[serde(default)]
    skip_fields: Vec<String>,
}

pub struct CompareDatasetsExecutor;

#[async_trait]
impl NodeExecutor for CompareDatasetsExecutor {
    async fn execute(
        &self,
        _node_id: &str,
        config: &Value,
        input: &[Vec<Item>],
        _context: &ExecutionContext,
    ) -> Result<NodeRunResult, NodeError> {
        let config: CompareDatasetsConfig = serde_json::from_value(config.clone())
            .map_err(|e| NodeError::ConfigError(e.to_string()))?;
        if config.merge_by_fields.is_empty() {
            return Err(NodeError::ConfigError(
                "mergeByFields must name at least one field pair".to_string(),
            ));
        }

        let items_a = main_input(input)?;
        let items_b = input
            .get(1)
            .map(|items| items.as_slice())
            .ok_or_else(|| NodeError::MissingInput("second".to_string()))?;

        let dot = !config.options.disable_dot_notation;
        let fuzzy = config.options.fuzzy_compare;

        let keys_a: Vec<Option<Vec<Value>>> = items_a
            .iter()
            .map(|item| key_of(item, &config.merge_by_fields, |p| &p.field1, dot))
            .collect();
        let keys_b: Vec<Option<Vec<Value>>> = items_b
            .iter()
            .map(|item| key_of(item, &config.merge_by_fields, |p| &p.field2, dot))
            .collect();

        let mut in_a_only = Vec::new();
        let mut same = Vec::new();
        let mut different = Vec::new();
        let mut in_b_only = Vec::new();
        let mut matched_b: HashSet<usize> = HashSet::new();

        for (index_a, item_a) in items_a.iter().enumerate() {
            let key_a = match &keys_a[index_a] {
                Some(key) => key,
                // A record without its key fields cannot be paired.
                None => {
                    in_a_only.push(sourced(item_a, index_a, 0));
                    continue;
                }
            };

            let matches: Vec<usize> = keys_b
                .iter()
                .enumerate()
                .filter(|(_, key_b)| {
                    key_b
                        .as_ref()
                        .map_or(false, |key_b| keys_match(key_a, key_b, fuzzy))
                })
                .map(|(index_b, _)| index_b)
                .collect();

            if matches.is_empty() {
                in_a_only.push(sourced(item_a, index_a, 0));
                continue;
            }

            let taken: &[usize] = match config.options.multiple_matches {
                MultipleMatches::First => &matches[..1],
                MultipleMatches::All => matches.as_slice(),
            };

            for &index_b in taken {
                matched_b.insert(index_b);
                let item_b = &items_b[index_b];
                let paired = PairedItem::Many(vec![
                    PairedItem::Sourced { item: index_a, input: 0 },
                    PairedItem::Sourced { item: index_b, input: 1 },
                ]);

                let diff = field_differences(item_a, item_b, &config, fuzzy);
                if diff.is_empty() {
                    same.push(item_a.clone().with_paired(paired));
                } else {
                    different.push(resolve_pair(item_a, item_b, key_a, diff, &config, dot)
                        .with_paired(paired));
                }
            }
        }

        for (index_b, item_b) in items_b.iter().enumerate() {
            if !matched_b.contains(&index_b) {
                in_b_only.push(sourced(item_b, index_b, 1));
            }
        }

        Ok(NodeRunResult::branches(vec![
            in_a_only, same, different, in_b_only,
        ]))
    }
}

fn sourced(item: &Item, index: usize, input: usize) -> Item {
    item.clone()
        .with_paired(PairedItem::Sourced { item: index, input })
}

fn key_of<'a>(
    item: &Item,
    pairs: &'a [FieldPair],
    side: impl Fn(&'a FieldPair) -> &'a String,
    dot: bool,
) -> Option<Vec<Value>> {
    pairs
        .iter()
        .map(|pair| item.field(side(pair), dot).cloned())
        .collect()
}

fn keys_match(key_a: &[Value], key_b: &[Value], fuzzy: bool) -> bool {
    key_a.len() == key_b.len()
        && key_a
            .iter()
            .zip(key_b)
            .all(|(a, b)| values_equal(a, b, fuzzy))
}

/// Top-level fields whose values differ between a paired A and B record.
/// Key fields and configured skip fields never count. The enumerated names
/// are literal object keys, so lookups here never treat a dot as nesting.
fn field_differences(
    item_a: &Item,
    item_b: &Item,
    config: &CompareDatasetsConfig,
    fuzzy: bool,
) -> Vec<String> {
    let excluded: HashSet<&str> = config
        .merge_by_fields
        .iter()
        .flat_map(|pair| [pair.field1.as_str(), pair.field2.as_str()])
        .chain(config.options.skip_fields.iter().map(String::as_str))
        .collect();

    let mut fields: Vec<String> = Vec::new();
    for side in [&item_a.json, &item_b.json] {
        if let Some(object) = side.as_object() {
            for key in object.keys() {
                if !excluded.contains(key.as_str()) && !fields.contains(key) {
                    fields.push(key.clone());
                }
            }
        }
    }

    fields
        .into_iter()
        .filter(|field| {
            let a = field_path::get_path(&item_a.json, field, false).unwrap_or(&Value::Null);
            let b = field_path::get_path(&item_b.json, field, false).unwrap_or(&Value::Null);
            !values_equal(a, b, fuzzy)
        })
        .collect()
}

fn resolve_pair(
    item_a: &Item,
    item_b: &Item,
    key: &[Value],
    diff: Vec<String>,
    config: &CompareDatasetsConfig,
    dot: bool,
) -> Item {
    match config.resolve {
        ResolveMode::PreferInput1 => item_a.clone(),
        ResolveMode::PreferInput2 => item_b.clone(),
        ResolveMode::Mix => {
            let (base, other) = match config.prefer_when_mix {
                PreferSide::Input1 => (item_a, item_b),
                PreferSide::Input2 => (item_b, item_a),
            };
            let mut mixed = base.clone();
            for field in &config.except_when_mix {
                let value = field_path::get_path(&other.json, field, dot)
                    .cloned()
                    .unwrap_or(Value::Null);
                field_path::set_path(&mut mixed.json, field, value, dot);
            }
            mixed
        }
        ResolveMode::IncludeBoth => {
            let mut keys = Map::new();
            for (pair, value) in config.merge_by_fields.iter().zip(key) {
                keys.insert(pair.field1.clone(), value.clone());
            }
            // Diff names come from field_differences and are literal keys.
            let mut differences = Map::new();
            for field in &diff {
                differences.insert(
                    field.clone(),
                    serde_json::json!({
                        "input1": field_path::get_path(&item_a.json, field, false)
                            .cloned()
                            .unwrap_or(Value::Null),
                        "input2": field_path::get_path(&item_b.json, field, false)
                            .cloned()
                            .unwrap_or(Value::Null),
                    }),
                );
            }
            Item::new(serde_json::json!({
                "keys": Value::Object(keys),
                "input1": item_a.json.clone(),
                "input2": item_b.json.clone(),
                "different": Value::Object(differences),
            }))
        }
    }
}
