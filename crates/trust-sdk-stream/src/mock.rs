//! In-memory transport for tests and dry runs.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::Span;

use trust_sdk_core::{Annotation, Context, Error, MockConfig, Result};

use crate::provider::{StreamProvider, StreamType};

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    connects: usize,
    batches: Vec<Vec<Annotation>>,
}

/// Records every published batch in memory.
///
/// Clones share state, so a test can keep one clone to inspect what was
/// published through another.
#[derive(Debug, Clone)]
pub struct MockStreamProvider {
    state: Arc<Mutex<MockState>>,
    config: MockConfig,
    span: Span,
}

impl MockStreamProvider {
    pub fn new(config: MockConfig, span: Span) -> Self {
        Self {
            state: Arc::default(),
            config,
            span,
        }
    }

    /// A provider whose every publish fails with `DeliveryFailed`.
    pub fn failing() -> Self {
        Self::new(
            MockConfig {
                simulate_failure: true,
            },
            Span::none(),
        )
    }

    /// Batches published so far, in order.
    pub fn published(&self) -> Vec<Vec<Annotation>> {
        self.state().batches.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Number of connects that actually opened the transport.
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock cannot leave the state half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockStreamProvider {
    fn default() -> Self {
        Self::new(MockConfig::default(), Span::none())
    }
}

#[async_trait]
impl StreamProvider for MockStreamProvider {
    fn stream_type(&self) -> StreamType {
        StreamType::Mock
    }

    async fn connect(&self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        let mut state = self.state();
        if !state.connected {
            state.connected = true;
            state.connects += 1;
            tracing::debug!(parent: &self.span, "mock stream connected");
        }
        Ok(())
    }

    async fn publish(&self, ctx: &Context, batch: Vec<Annotation>) -> Result<()> {
        ctx.check()?;
        let mut state = self.state();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if self.config.simulate_failure {
            return Err(Error::DeliveryFailed {
                attempts: 1,
                reason: "simulated failure".to_string(),
            });
        }
        tracing::debug!(parent: &self.span, annotations = batch.len(), "mock batch recorded");
        state.batches.push(batch);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state().connected = false;
        Ok(())
    }
}
