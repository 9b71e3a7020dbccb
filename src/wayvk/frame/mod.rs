
use crate::config::DegradedPolicy;
use crate::session::SessionRegistry;
use crate::surface::{Acquire, FrameContent, Presented, SurfaceProvider};
use utils::{anyhow, bail, log, Context, Result};

use std::convert::TryInto;

/// How many frames may be queued on the GPU at once
pub const FRAMES_IN_FLIGHT: usize = 2;

/// The synchronization bundle for one in-flight frame
struct FrameSlot<P: SurfaceProvider> {
    /// Signaled when the GPU finishes this slot's frame
    fs_fence: P::Fence,
    /// Signaled when the acquired image is ready to render to
    fs_image_ready: P::Semaphore,
    /// Signaled when rendering is done and the image can be presented
    fs_render_done: P::Semaphore,
    /// Re-recorded each time the slot comes around
    fs_cbuf: P::CommandBuffer,
}

impl<P: SurfaceProvider> FrameSlot<P> {
    fn new(provider: &mut P) -> Result<Self> {
        Ok(Self {
            fs_fence: provider.create_fence()?,
            fs_image_ready: provider.create_semaphore()?,
            fs_render_done: provider.create_semaphore()?,
            fs_cbuf: provider.create_command_buffer()?,
        })
    }

    fn destroy(self, provider: &mut P) {
        provider.destroy_command_buffer(self.fs_cbuf);
        provider.destroy_semaphore(self.fs_render_done);
        provider.destroy_semaphore(self.fs_image_ready);
        provider.destroy_fence(self.fs_fence);
    }
}

/// What happened during a tick
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was submitted and presented
    Presented { image: u32 },
    /// No image was available. Nothing was submitted and the slot is
    /// untouched.
    Skipped,
    /// The swapchain is suboptimal or out of date
    Degraded {
        /// a frame still made it to the screen
        submitted: bool,
        /// the swapchain was rebuilt afterwards
        recreated: bool,
    },
}

/// Proof that nothing is in flight
///
/// Only `FramePipeline::drain` hands these out. Tearing down sessions
/// and destroying the pipeline both require one.
#[derive(Debug)]
pub struct Drained {
    _priv: (),
}

/// A fixed ring of in-flight frames
pub struct FramePipeline<P: SurfaceProvider> {
    fp_slots: [FrameSlot<P>; FRAMES_IN_FLIGHT],
    /// index of the slot used by the last tick
    fp_current: usize,
    fp_acquire_timeout_ns: u64,
    fp_degraded: DegradedPolicy,
    fp_frame_count: u64,
}

impl<P: SurfaceProvider> FramePipeline<P> {
    pub fn new(provider: &mut P, acquire_timeout_ns: u64, degraded: DegradedPolicy) -> Result<Self> {
        let mut slots = Vec::with_capacity(FRAMES_IN_FLIGHT);
        for _ in 0..FRAMES_IN_FLIGHT {
            slots.push(FrameSlot::new(provider).context("Could not create frame slot")?);
        }

        log::debug!(
            "Created frame pipeline with {} slots for {} swapchain images at {:?}",
            FRAMES_IN_FLIGHT,
            provider.image_count(),
            provider.extent()
        );

        Ok(Self {
            fp_slots: slots
                .try_into()
                .map_err(|_| anyhow!("Wrong number of frame slots"))?,
            // the first tick advances to slot 0
            fp_current: FRAMES_IN_FLIGHT - 1,
            fp_acquire_timeout_ns: acquire_timeout_ns,
            fp_degraded: degraded,
            fp_frame_count: 0,
        })
    }

    /// The slot the most recent tick used
    pub fn current_slot(&self) -> usize {
        self.fp_current
    }

    /// Number of frames submitted so far
    pub fn frame_count(&self) -> u64 {
        self.fp_frame_count
    }

    /// Apply the degraded policy, returns true if we recreated
    ///
    /// The policy only covers suboptimal swapchains. An out of date
    /// swapchain can't be used at all, so it is always recreated.
    fn handle_degraded(&mut self, provider: &mut P, out_of_date: bool) -> Result<bool> {
        if !out_of_date && self.fp_degraded == DegradedPolicy::Ignore {
            log::debug!("Swapchain suboptimal, ignoring");
            return Ok(false);
        }

        log::info!(
            "Swapchain {}, recreating",
            if out_of_date { "out of date" } else { "suboptimal" }
        );
        // Rebuilding the swapchain frees images our in-flight
        // frames may still reference
        self.wait_all(provider)?;
        provider.recreate()?;
        Ok(true)
    }

    fn wait_all(&self, provider: &mut P) -> Result<()> {
        for slot in self.fp_slots.iter() {
            provider.wait_fence(slot.fs_fence)?;
        }
        Ok(())
    }

    /// Submit one frame of the active session
    ///
    /// Transient and degraded swapchain states are reported through the
    /// returned outcome. An error means the device can't be trusted
    /// anymore and the caller should exit.
    pub fn tick(&mut self, provider: &mut P, registry: &mut SessionRegistry) -> Result<TickOutcome> {
        self.fp_current = (self.fp_current + 1) % FRAMES_IN_FLIGHT;
        let slot = &self.fp_slots[self.fp_current];
        let (fence, image_ready, render_done, cbuf) = (
            slot.fs_fence,
            slot.fs_image_ready,
            slot.fs_render_done,
            slot.fs_cbuf,
        );

        // Wait for the last frame that used this slot. This is what
        // keeps us at most FRAMES_IN_FLIGHT frames ahead of the GPU.
        provider
            .wait_fence(fence)
            .context("Failed waiting for an in-flight frame")?;

        let (image, acquire_suboptimal) =
            match provider.acquire(self.fp_acquire_timeout_ns, image_ready)? {
                Acquire::Image(index) => (index, false),
                Acquire::Suboptimal(index) => (index, true),
                Acquire::NotReady => {
                    log::profiling!("No swapchain image ready, skipping frame");
                    return Ok(TickOutcome::Skipped);
                }
                Acquire::OutOfDate => {
                    let recreated = self.handle_degraded(provider, true)?;
                    return Ok(TickOutcome::Degraded {
                        submitted: false,
                        recreated: recreated,
                    });
                }
            };

        // We are committed to submitting now. The fence must stay
        // signaled on every path above, otherwise the next wait on this
        // slot would never return.
        provider
            .reset_fence(fence)
            .context("Could not reset frame fence")?;

        let mut content = FrameContent::default();
        registry.draw_active(&mut content);

        provider
            .record(cbuf, image, &content)
            .context("Could not record the frame")?;
        provider
            .submit(cbuf, image_ready, render_done, fence)
            .context("Could not submit the frame")?;
        let presented = provider
            .present(image, render_done)
            .context("Could not present the frame")?;
        self.fp_frame_count += 1;

        let out_of_date = presented == Presented::OutOfDate;
        if acquire_suboptimal || out_of_date || presented == Presented::Suboptimal {
            let recreated = self.handle_degraded(provider, out_of_date)?;
            return Ok(TickOutcome::Degraded {
                submitted: true,
                recreated: recreated,
            });
        }

        Ok(TickOutcome::Presented { image: image })
    }

    /// Wait for every in-flight frame to finish
    pub fn drain(&mut self, provider: &mut P) -> Result<Drained> {
        self.wait_all(provider)
            .context("Failed waiting for in-flight frames to drain")?;
        for (i, slot) in self.fp_slots.iter().enumerate() {
            if !provider.fence_signaled(slot.fs_fence)? {
                bail!("Frame slot {} is still in flight after draining", i);
            }
        }
        log::debug!("Frame pipeline drained after {} frames", self.fp_frame_count);

        Ok(Drained { _priv: () })
    }

    /// Wait for the device to go idle
    ///
    /// Unlike `drain` this doesn't go through the slot fences. A tick
    /// that failed between resetting its fence and submitting leaves a
    /// fence behind that will never signal, so this is what the error
    /// path uses.
    pub fn drain_idle(&mut self, provider: &mut P) -> Result<Drained> {
        provider.wait_idle()?;
        log::debug!("Device idle after {} frames", self.fp_frame_count);

        Ok(Drained { _priv: () })
    }

    /// Free the slots' resources
    pub fn destroy(self, provider: &mut P, _drained: Drained) {
        let Self { fp_slots, .. } = self;
        for slot in fp_slots {
            slot.destroy(provider);
        }
    }
}
