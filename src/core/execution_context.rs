use std::sync::Arc;

use crate::core::static_data::StaticDataStore;

/// Per-invocation execution context supplied by the host.
#[derive(Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    continue_on_fail: bool,
    static_data: Arc<StaticDataStore>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        ExecutionContext {
            execution_id: uuid::Uuid::new_v4().to_string(),
            continue_on_fail: false,
            static_data: Arc::new(StaticDataStore::new()),
        }
    }

    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    pub fn with_static_data(mut self, static_data: Arc<StaticDataStore>) -> Self {
        self.static_data = static_data;
        self
    }

    /// Host error-continuation policy: when set, per-record failures become
    /// error-flagged output items instead of failing the invocation.
    pub fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    pub fn static_data(&self) -> &Arc<StaticDataStore> {
        &self.static_data
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_context_default() {
        let ctx = ExecutionContext::default();
        assert!(!ctx.continue_on_fail());
        assert_eq!(ctx.execution_id.len(), 36);
        assert!(ctx.static_data().is_empty());
    }

    #[test]
    fn test_execution_context_builders() {
        let store = Arc::new(StaticDataStore::new());
        let ctx = ExecutionContext::new()
            .with_continue_on_fail(true)
            .with_static_data(Arc::clone(&store));
        assert!(ctx.continue_on_fail());
        assert!(Arc::ptr_eq(ctx.static_data(), &store));
    }

    #[test]
    fn test_execution_ids_unique() {
        assert_ne!(
            ExecutionContext::new().execution_id,
            ExecutionContext::new().execution_id
        );
    }
}
