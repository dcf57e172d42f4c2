use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::contract::{OperationTag, QueueRecord};
use crate::error::{DispatchError, RegistryError};

/// Executes one kind of queue record.
///
/// Records are redelivered verbatim after a failure, so implementations must
/// tolerate running more than once for the same record.
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError>;
}

#[async_trait]
impl<T: Strategy + ?Sized> Strategy for Arc<T> {
    async fn execute(&self, record: &QueueRecord) -> Result<(), DispatchError> {
        (**self).execute(record).await
    }
}

/// Fixed mapping from operation tag to strategy, built once at start-up.
pub struct StrategyRegistry {
    strategies: BTreeMap<OperationTag, Box<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn builder() -> StrategyRegistryBuilder {
        StrategyRegistryBuilder {
            strategies: BTreeMap::new(),
        }
    }

    pub fn resolve(&self, tag: &str) -> Result<&dyn Strategy, DispatchError> {
        OperationTag::parse(tag)
            .and_then(|operation| self.strategies.get(&operation))
            .map(|strategy| strategy.as_ref())
            .ok_or_else(|| DispatchError::UnknownOperation(tag.to_string()))
    }

    pub fn operations(&self) -> Vec<OperationTag> {
        self.strategies.keys().copied().collect()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("operations", &self.operations())
            .finish()
    }
}

pub struct StrategyRegistryBuilder {
    strategies: BTreeMap<OperationTag, Box<dyn Strategy>>,
}

impl StrategyRegistryBuilder {
    pub fn register(
        mut self,
        tag: OperationTag,
        strategy: impl Strategy + 'static,
    ) -> Result<Self, RegistryError> {
        if self.strategies.contains_key(&tag) {
            return Err(RegistryError::DuplicateOperation(tag.as_str()));
        }
        self.strategies.insert(tag, Box::new(strategy));
        Ok(self)
    }

    pub fn build(self) -> StrategyRegistry {
        StrategyRegistry {
            strategies: self.strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Noop;

    #[async_trait]
    impl Strategy for Noop {
        async fn execute(&self, _record: &QueueRecord) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Strategy for AlwaysFails {
        async fn execute(&self, _record: &QueueRecord) -> Result<(), DispatchError> {
            Err(DispatchError::downstream("nope"))
        }
    }

    fn record(tag: &str) -> QueueRecord {
        QueueRecord {
            record_identifier: "r-1".to_string(),
            operation_tag: tag.to_string(),
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn resolves_registered_strategy_by_tag() {
        let registry = StrategyRegistry::builder()
            .register(OperationTag::RegisterDevice, Noop)
            .and_then(|builder| builder.register(OperationTag::DeleteDevice, AlwaysFails))
            .expect("registration should pass")
            .build();

        let register = registry
            .resolve("register-device")
            .expect("strategy should resolve");
        assert!(register.execute(&record("register-device")).await.is_ok());

        let delete = registry
            .resolve(" DELETE-DEVICE ")
            .expect("strategy should resolve");
        assert!(delete.execute(&record("delete-device")).await.is_err());
    }

    #[test]
    fn unknown_and_unregistered_tags_fail_to_resolve() {
        let registry = StrategyRegistry::builder()
            .register(OperationTag::RegisterDevice, Noop)
            .expect("registration should pass")
            .build();

        assert_eq!(
            registry.resolve("teleport").err(),
            Some(DispatchError::UnknownOperation("teleport".to_string()))
        );
        assert_eq!(
            registry.resolve("push-to-all").err(),
            Some(DispatchError::UnknownOperation("push-to-all".to_string()))
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let error = StrategyRegistry::builder()
            .register(OperationTag::SeedChunks, Noop)
            .and_then(|builder| builder.register(OperationTag::SeedChunks, Noop))
            .err()
            .expect("duplicate should fail");
        assert_eq!(error, RegistryError::DuplicateOperation("seed-chunks"));
    }
}
