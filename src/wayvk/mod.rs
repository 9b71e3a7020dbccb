// The wayvk compositor core
//
// Austin Shafer - 2020
pub mod config;
pub mod frame;
pub mod input;
pub mod session;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

use config::Config;
use frame::{FramePipeline, TickOutcome};
use input::{InputRouter, InputSource};
use session::{Session, SessionRegistry};
use surface::SurfaceProvider;
use utils::{anyhow, bail, log, Result};

/// The toplevel compositor
///
/// Owns the surface provider, the input source and the sessions, and
/// runs the main loop over them. Everything happens on one thread:
/// drain input, tick the frame pipeline, then update the sessions.
pub struct Wayvk<P: SurfaceProvider, I: InputSource> {
    w_provider: P,
    w_input: I,
    w_router: InputRouter,
    w_registry: SessionRegistry,
    /// None once shut down
    w_pipeline: Option<FramePipeline<P>>,
}

impl<P: SurfaceProvider, I: InputSource> Wayvk<P, I> {
    /// Register every session and create the frame pipeline
    ///
    /// The first session starts out active.
    pub fn new(
        config: &Config,
        mut provider: P,
        input: I,
        sessions: Vec<Box<dyn Session>>,
    ) -> Result<Self> {
        if sessions.is_empty() {
            bail!("wayvk needs at least one session");
        }

        let mut registry = SessionRegistry::new();
        session::register_all(&mut registry, sessions)?;

        let pipeline =
            FramePipeline::new(&mut provider, config.acquire_timeout_ns, config.degraded)?;

        Ok(Self {
            w_provider: provider,
            w_input: input,
            w_router: InputRouter::new(config.modkey),
            w_registry: registry,
            w_pipeline: Some(pipeline),
        })
    }

    pub fn provider(&self) -> &P {
        &self.w_provider
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.w_registry
    }

    pub fn router(&self) -> &InputRouter {
        &self.w_router
    }

    /// Run one iteration of the main loop
    ///
    /// Returns None once the quit chord has been pressed, in which case
    /// no frame was drawn.
    pub fn iterate(&mut self) -> Result<Option<TickOutcome>> {
        self.w_router
            .drain(&mut self.w_input, &mut self.w_registry)?;
        if !self.w_router.is_running() {
            return Ok(None);
        }

        let pipeline = self
            .w_pipeline
            .as_mut()
            .ok_or_else(|| anyhow!("wayvk has already been shut down"))?;
        let outcome = pipeline.tick(&mut self.w_provider, &mut self.w_registry)?;
        self.w_registry.frame_update();

        Ok(Some(outcome))
    }

    /// Loop until the quit chord, then shut down
    pub fn run(&mut self) -> Result<()> {
        while self.iterate()?.is_some() {}
        self.shutdown()
    }

    /// Drain the frame pipeline, clean up the sessions and free the
    /// pipeline's resources, in that order
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(mut pipeline) = self.w_pipeline.take() {
            let drained = pipeline.drain(&mut self.w_provider)?;
            self.w_registry.teardown(&drained);
            pipeline.destroy(&mut self.w_provider, drained);
            log::debug!("wayvk shut down");
        }
        Ok(())
    }
}

impl<P: SurfaceProvider, I: InputSource> Drop for Wayvk<P, I> {
    /// Reached without `shutdown` when the loop failed. The slots still
    /// have to be freed before the provider destroys the device.
    fn drop(&mut self) {
        if let Some(mut pipeline) = self.w_pipeline.take() {
            match pipeline.drain_idle(&mut self.w_provider) {
                Ok(drained) => {
                    self.w_registry.teardown(&drained);
                    pipeline.destroy(&mut self.w_provider, drained);
                }
                Err(e) => log::error!("Could not free the frame pipeline: {:?}", e),
            }
        }
    }
}
