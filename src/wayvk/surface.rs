// The presentation primitives the frame pipeline runs on
//
// The pipeline only knows about fences, semaphores, command buffers
// and a swapchain that hands out image indices. SurfaceProvider is
// that contract, and vkdisp::Display is the real implementation of it.
use utils::{Context, Result};
use vkdisp::{vk, Display, NextImage, PresentStatus};

/// What a session wants drawn this frame
///
/// Text and other content is drawn by a separate renderer, what the
/// pipeline records itself is the background.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameContent {
    pub clear_color: [f32; 4],
}

impl Default for FrameContent {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// The result of acquiring a swapchain image
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Acquire {
    /// Render to this image
    Image(u32),
    /// Usable image, but the swapchain is suboptimal
    Suboptimal(u32),
    /// Nothing was available in time. Try again next tick.
    NotReady,
    /// The swapchain must be recreated before it can be used again
    OutOfDate,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Presented {
    Optimal,
    /// Queued, but the swapchain is suboptimal
    Suboptimal,
    /// The swapchain must be recreated before presenting again
    OutOfDate,
}

/// The device and swapchain operations a frame needs
///
/// Every method returning an error is reporting a fatal condition. The
/// recoverable swapchain states are part of the `Acquire` and
/// `Presented` results instead.
pub trait SurfaceProvider {
    type Fence: Copy;
    type Semaphore: Copy;
    type CommandBuffer: Copy;

    /// Create a fence in the signaled state
    fn create_fence(&mut self) -> Result<Self::Fence>;
    fn destroy_fence(&mut self, fence: Self::Fence);
    fn create_semaphore(&mut self) -> Result<Self::Semaphore>;
    fn destroy_semaphore(&mut self, sema: Self::Semaphore);
    fn create_command_buffer(&mut self) -> Result<Self::CommandBuffer>;
    fn destroy_command_buffer(&mut self, cbuf: Self::CommandBuffer);

    /// Block until the fence signals. There is no timeout.
    fn wait_fence(&mut self, fence: Self::Fence) -> Result<()>;
    fn reset_fence(&mut self, fence: Self::Fence) -> Result<()>;
    fn fence_signaled(&self, fence: Self::Fence) -> Result<bool>;

    /// Get the next image, signaling `sema` once it is ready
    fn acquire(&mut self, timeout_ns: u64, sema: Self::Semaphore) -> Result<Acquire>;
    /// Record `content` for `image` into `cbuf`
    fn record(
        &mut self,
        cbuf: Self::CommandBuffer,
        image: u32,
        content: &FrameContent,
    ) -> Result<()>;
    fn submit(
        &mut self,
        cbuf: Self::CommandBuffer,
        wait: Self::Semaphore,
        signal: Self::Semaphore,
        fence: Self::Fence,
    ) -> Result<()>;
    fn present(&mut self, image: u32, wait: Self::Semaphore) -> Result<Presented>;
    /// Rebuild the swapchain after it degraded
    fn recreate(&mut self) -> Result<()>;
    /// Block until the device has finished all submitted work
    fn wait_idle(&mut self) -> Result<()>;

    fn image_count(&self) -> u32;
    fn extent(&self) -> (u32, u32);
}

impl SurfaceProvider for Display {
    type Fence = vk::Fence;
    type Semaphore = vk::Semaphore;
    type CommandBuffer = vk::CommandBuffer;

    fn create_fence(&mut self) -> Result<vk::Fence> {
        Ok(self.device().create_fence(true)?)
    }

    fn destroy_fence(&mut self, fence: vk::Fence) {
        self.device().destroy_fence(fence)
    }

    fn create_semaphore(&mut self) -> Result<vk::Semaphore> {
        Ok(self.device().create_semaphore()?)
    }

    fn destroy_semaphore(&mut self, sema: vk::Semaphore) {
        self.device().destroy_semaphore(sema)
    }

    fn create_command_buffer(&mut self) -> Result<vk::CommandBuffer> {
        Ok(self.device().create_command_buffer()?)
    }

    fn destroy_command_buffer(&mut self, cbuf: vk::CommandBuffer) {
        self.device().destroy_command_buffer(cbuf)
    }

    fn wait_fence(&mut self, fence: vk::Fence) -> Result<()> {
        self.device()
            .wait_for_fence(fence)
            .context("Could not wait for frame fence")
    }

    fn reset_fence(&mut self, fence: vk::Fence) -> Result<()> {
        self.device()
            .reset_fence(fence)
            .context("Could not reset frame fence")
    }

    fn fence_signaled(&self, fence: vk::Fence) -> Result<bool> {
        Ok(self.device().fence_signaled(fence)?)
    }

    fn acquire(&mut self, timeout_ns: u64, sema: vk::Semaphore) -> Result<Acquire> {
        let next = self
            .acquire_next_image(timeout_ns, sema)
            .context("Could not acquire the next swapchain image")?;

        Ok(match next {
            NextImage::Acquired(index) => Acquire::Image(index),
            NextImage::Suboptimal(index) => Acquire::Suboptimal(index),
            NextImage::NotReady => Acquire::NotReady,
            NextImage::OutOfDate => Acquire::OutOfDate,
        })
    }

    fn record(
        &mut self,
        cbuf: vk::CommandBuffer,
        image: u32,
        content: &FrameContent,
    ) -> Result<()> {
        self.record_clear(cbuf, image, content.clear_color)
            .context("Could not record frame")
    }

    fn submit(
        &mut self,
        cbuf: vk::CommandBuffer,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        self.device()
            .submit(cbuf, wait, signal, fence)
            .context("Could not submit frame")
    }

    fn present(&mut self, image: u32, wait: vk::Semaphore) -> Result<Presented> {
        match Display::present(self, image, wait).context("Could not present frame")? {
            PresentStatus::Optimal => Ok(Presented::Optimal),
            PresentStatus::Suboptimal => Ok(Presented::Suboptimal),
            PresentStatus::OutOfDate => Ok(Presented::OutOfDate),
        }
    }

    fn recreate(&mut self) -> Result<()> {
        self.recreate_swapchain()
            .context("Could not recreate the swapchain")
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.device()
            .wait_idle()
            .context("Could not wait for the device to go idle")
    }

    fn image_count(&self) -> u32 {
        Display::image_count(self)
    }

    fn extent(&self) -> (u32, u32) {
        self.get_resolution()
    }
}
