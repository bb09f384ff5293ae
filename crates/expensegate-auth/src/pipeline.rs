//! Ordered admission stages
//!
//! The entry point builds one [`RequestContext`] per request and runs it
//! through the [`Pipeline`]. Stages execute in registration order and the
//! first rejection stops the run.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::admission::AdmissionInterceptor;
use crate::context::RequestContext;
use crate::error::AdmissionError;
use crate::gate::AuthenticationGate;

/// One step of request admission
#[async_trait]
pub trait Stage: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Inspect or annotate the context; `Err` rejects the request
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), AdmissionError>;
}

/// Stages run in order for every request
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Empty pipeline that admits everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Authentication followed by rate limiting
    pub fn standard(gate: AuthenticationGate, interceptor: AdmissionInterceptor) -> Self {
        Self::new().stage(gate).stage(interceptor)
    }

    /// Append a stage
    #[must_use]
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage against `ctx`
    ///
    /// # Errors
    ///
    /// Returns the first stage rejection; later stages do not run.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<(), AdmissionError> {
        for stage in &self.stages {
            if let Err(e) = stage.handle(ctx).await {
                debug!(stage = stage.name(), path = %ctx.path(), error = %e, "Request rejected");
                return Err(e);
            }
        }
        Ok(())
    }
}
