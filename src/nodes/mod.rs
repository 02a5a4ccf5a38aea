//! Built-in node executors.

pub mod compare_datasets;
mod executor;
pub mod item_lists;
pub mod remove_duplicates;
pub mod split_in_batches;
pub mod summarize;

pub use executor::{
    NodeExecutionStatus, NodeExecutor, NodeExecutorRegistry, NodeRunResult,
};

use crate::core::ExecutionContext;
use crate::error::NodeError;
use crate::item::{Item, PairedItem};

/// The node's main input stream (connection 0).
pub(crate) fn main_input<'a>(input: &'a [Vec<Item>]) -> Result<&'a [Item], NodeError> {
    input
        .first()
        .map(|items| items.as_slice())
        .ok_or_else(|| NodeError::MissingInput("main".to_string()))
}

/// Apply the host's continue-on-fail policy to a per-record failure: either
/// collect an error-flagged item or abort the invocation.
pub(crate) fn collect_item_error(
    error: NodeError,
    paired: Option<PairedItem>,
    context: &ExecutionContext,
    sink: &mut Vec<Item>,
) -> Result<(), NodeError> {
    if context.continue_on_fail() {
        sink.push(Item::from_error(&error, paired));
        Ok(())
    } else {
        Err(error)
    }
}
