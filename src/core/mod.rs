//! Host-provided execution services: the per-invocation context and the
//! static data that survives across invocations of a workflow.

mod execution_context;
mod static_data;

pub use execution_context::ExecutionContext;
pub use static_data::StaticDataStore;
