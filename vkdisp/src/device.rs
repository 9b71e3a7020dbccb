// Vulkan device representation
//
// This stores per-GPU state: the logical device, the one queue we
// submit to, and the command pool frame command buffers come from.
// It also wraps the fence/semaphore/command buffer calls the frame
// loop needs so callers never touch ash directly.

use ash::extensions::khr;
use ash::vk;

use crate::instance::Instance;
use crate::{DisplayError, Result};
use utils::log;

use std::sync::Arc;

/// Device
///
/// This holds all of the Vulkan logic for one GPU.
pub struct Device {
    /// The instance has to outlive the device
    #[allow(dead_code)]
    d_inst: Arc<Instance>,
    /// the logical device we are using
    pub(crate) dev: ash::Device,
    /// the physical device selected to display to
    pub(crate) pdev: vk::PhysicalDevice,
    /// graphics queue family, which can also present to our surface
    pub(crate) d_queue_family: u32,
    /// queue used for both rendering and presentation
    pub(crate) d_queue: vk::Queue,
    /// Per-frame command buffers are allocated from here
    pub(crate) d_cmd_pool: vk::CommandPool,
}

impl Device {
    /// Choose a physical device and a graphics queue family on it
    ///
    /// The first device exposing a graphics capable queue family wins.
    /// Presentation support is checked later once the display surface
    /// exists.
    pub(crate) fn select_pdev(inst: &ash::Instance) -> Result<(vk::PhysicalDevice, u32)> {
        let pdevices = unsafe {
            inst.enumerate_physical_devices()
                .or(Err(DisplayError::NO_SUITABLE_DEVICE))?
        };
        if pdevices.is_empty() {
            log::error!("No Vulkan-compatible physical devices could be found");
            return Err(DisplayError::NO_SUITABLE_DEVICE);
        }

        pdevices
            .iter()
            .find_map(|pdev| {
                // get the properties per queue family
                unsafe { inst.get_physical_device_queue_family_properties(*pdev) }
                    .iter()
                    .position(|info| info.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                    .map(|index| (*pdev, index as u32))
            })
            .ok_or(DisplayError::NO_SUITABLE_DEVICE)
    }

    /// Create a vkDevice from a vkPhysicalDevice
    ///
    /// Create a logical device for interfacing with the physical device.
    /// The swapchain is the only device extension we need. One queue is
    /// created in `queue_family`.
    fn create_device(
        inst: &ash::Instance,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<ash::Device> {
        let dev_extension_names = [khr::Swapchain::name().as_ptr()];
        let priorities = [1.0];

        let queue_info = [vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family)
            .queue_priorities(&priorities)
            .build()];

        let features = vk::PhysicalDeviceFeatures::default();
        let dev_create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_info)
            .enabled_extension_names(&dev_extension_names)
            .enabled_features(&features);

        unsafe {
            inst.create_device(pdev, &dev_create_info, None).map_err(|e| {
                log::error!("vkCreateDevice failed: {:?}", e);
                DisplayError::COULD_NOT_CREATE_DEVICE
            })
        }
    }

    /// returns a new vkCommandPool
    ///
    /// Frame command buffers are re-recorded every time their frame slot
    /// comes around, so they need to be individually resettable.
    fn create_command_pool(dev: &ash::Device, queue_family: u32) -> Result<vk::CommandPool> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER
                    | vk::CommandPoolCreateFlags::TRANSIENT,
            )
            .queue_family_index(queue_family);

        unsafe {
            dev.create_command_pool(&pool_create_info, None)
                .or(Err(DisplayError::COULD_NOT_CREATE_COMMAND_POOL))
        }
    }

    pub(crate) fn new(
        inst: Arc<Instance>,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<Self> {
        let dev = Self::create_device(&inst.inst, pdev, queue_family)?;
        let queue = unsafe { dev.get_device_queue(queue_family, 0) };
        let pool = match Self::create_command_pool(&dev, queue_family) {
            Ok(p) => p,
            Err(e) => {
                unsafe { dev.destroy_device(None) };
                return Err(e);
            }
        };

        log::debug!("Created device using queue family {}", queue_family);

        Ok(Self {
            d_inst: inst,
            dev: dev,
            pdev: pdev,
            d_queue_family: queue_family,
            d_queue: queue,
            d_cmd_pool: pool,
        })
    }

    pub fn queue_family(&self) -> u32 {
        self.d_queue_family
    }

    /// Allocate one primary command buffer from our pool
    pub fn create_command_buffer(&self) -> Result<vk::CommandBuffer> {
        let cbuf_allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_buffer_count(1)
            .command_pool(self.d_cmd_pool)
            .level(vk::CommandBufferLevel::PRIMARY);

        let cbufs = unsafe {
            self.dev
                .allocate_command_buffers(&cbuf_allocate_info)
                .or(Err(DisplayError::COULD_NOT_ALLOCATE_COMMAND_BUFFER))?
        };
        cbufs
            .into_iter()
            .next()
            .ok_or(DisplayError::COULD_NOT_ALLOCATE_COMMAND_BUFFER)
    }

    pub fn destroy_command_buffer(&self, cbuf: vk::CommandBuffer) {
        unsafe { self.dev.free_command_buffers(self.d_cmd_pool, &[cbuf]) };
    }

    /// Create a fence
    ///
    /// Frame fences are created signaled so that the very first wait on
    /// them returns immediately.
    pub fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let flags = match signaled {
            true => vk::FenceCreateFlags::SIGNALED,
            false => vk::FenceCreateFlags::empty(),
        };
        let info = vk::FenceCreateInfo::builder().flags(flags);

        unsafe {
            self.dev
                .create_fence(&info, None)
                .or(Err(DisplayError::COULD_NOT_CREATE_SYNC))
        }
    }

    pub fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.dev.destroy_fence(fence, None) };
    }

    /// Create a binary semaphore
    pub fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let info = vk::SemaphoreCreateInfo::default();

        unsafe {
            self.dev
                .create_semaphore(&info, None)
                .or(Err(DisplayError::COULD_NOT_CREATE_SYNC))
        }
    }

    pub fn destroy_semaphore(&self, sema: vk::Semaphore) {
        unsafe { self.dev.destroy_semaphore(sema, None) };
    }

    /// Block until `fence` is signaled
    ///
    /// There is no timeout. A hung GPU hangs the caller.
    pub fn wait_for_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe {
            self.dev
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| {
                    log::error!("vkWaitForFences failed: {:?}", e);
                    DisplayError::WAIT_FAILED
                })
        }
    }

    pub fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        unsafe {
            self.dev
                .reset_fences(&[fence])
                .or(Err(DisplayError::WAIT_FAILED))
        }
    }

    /// Poll a fence without blocking
    pub fn fence_signaled(&self, fence: vk::Fence) -> Result<bool> {
        unsafe {
            self.dev
                .get_fence_status(fence)
                .or(Err(DisplayError::WAIT_FAILED))
        }
    }

    /// Submit one command buffer
    ///
    /// cbuf - the recorded command buffer
    /// wait_sema - consumed before color output starts
    /// signal_sema - signaled when the cbuf completes
    /// fence - signaled when the cbuf completes, for the CPU to observe
    pub fn submit(
        &self,
        cbuf: vk::CommandBuffer,
        wait_sema: vk::Semaphore,
        signal_sema: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        let wait_semas = [wait_sema];
        // Only color output has to wait for the image to be released
        // by the presentation engine
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let cbufs = [cbuf];
        let signal_semas = [signal_sema];

        let submit_info = [vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semas)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&cbufs)
            .signal_semaphores(&signal_semas)
            .build()];

        unsafe {
            self.dev
                .queue_submit(self.d_queue, &submit_info, fence)
                .map_err(|e| {
                    log::error!("vkQueueSubmit failed: {:?}", e);
                    DisplayError::SUBMIT_FAILED
                })
        }
    }

    /// Wait for all submitted work to finish
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.dev
                .device_wait_idle()
                .or(Err(DisplayError::WAIT_FAILED))
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        log::debug!("Destroying device");
        unsafe {
            // Nothing useful can be done about a failure here
            let _ = self.dev.device_wait_idle();
            self.dev.destroy_command_pool(self.d_cmd_pool, None);
            self.dev.destroy_device(None);
        }
    }
}
