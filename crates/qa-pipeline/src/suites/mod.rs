//! Suite adapters.
//!
//! Every suite kind is driven through the [`Runnable`] trait. The
//! orchestrator looks adapters up in a [`SuiteRegistry`] by kind and never
//! branches on the kind itself.

pub mod acceptance;
pub mod command;
pub mod integration;
pub mod performance;
pub mod unit;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use qa_core::{RunConfiguration, SuiteExecutionError, SuiteKind, SuiteResult};

pub use acceptance::AcceptanceSuite;
pub use command::{CommandOutput, SuiteCommand};
pub use integration::IntegrationSuite;
pub use performance::PerformanceSuite;
pub use unit::UnitSuite;

/// One executable suite.
///
/// `run` returns `Err` only when the suite could not be executed at all;
/// failing tests are reported inside the `SuiteResult`.
#[async_trait]
pub trait Runnable: Send + Sync {
    fn kind(&self) -> SuiteKind;

    async fn run(&self, config: &RunConfiguration) -> Result<SuiteResult, SuiteExecutionError>;
}

/// Adapters keyed by suite kind. Registering a kind twice replaces the
/// earlier adapter.
#[derive(Clone, Default)]
pub struct SuiteRegistry {
    suites: BTreeMap<SuiteKind, Arc<dyn Runnable>>,
}

impl SuiteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four command-backed adapters.
    pub fn command_backed() -> Self {
        Self::new()
            .with(UnitSuite)
            .with(IntegrationSuite)
            .with(PerformanceSuite)
            .with(AcceptanceSuite)
    }

    pub fn with(mut self, suite: impl Runnable + 'static) -> Self {
        self.register(Arc::new(suite));
        self
    }

    pub fn register(&mut self, suite: Arc<dyn Runnable>) {
        self.suites.insert(suite.kind(), suite);
    }

    pub fn get(&self, kind: SuiteKind) -> Option<Arc<dyn Runnable>> {
        self.suites.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<SuiteKind> {
        self.suites.keys().copied().collect()
    }
}

impl std::fmt::Debug for SuiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_backed_registry_covers_every_kind() {
        let registry = SuiteRegistry::command_backed();
        assert_eq!(registry.kinds(), SuiteKind::ALL.to_vec());
        for kind in SuiteKind::ALL {
            assert_eq!(registry.get(kind).map(|s| s.kind()), Some(kind));
        }
    }

    #[test]
    fn empty_registry_has_no_adapters() {
        assert!(SuiteRegistry::new().get(SuiteKind::Unit).is_none());
    }
}
