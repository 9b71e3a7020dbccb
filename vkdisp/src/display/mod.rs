// The Display object
//
// This owns the presentation side of the Vulkan context: the display
// surface, the swapchain and everything that has to be regenerated
// with it.

mod vkd2d;

use ash::extensions::khr;
use ash::vk;

use crate::device::Device;
use crate::instance::Instance;
use crate::{CreateInfo, DisplayError, Result};
use utils::log;
use vkd2d::PhysicalDisplay;

use std::sync::Arc;

/// The result of asking the swapchain for the next image
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NextImage {
    /// The image at this index can be rendered to
    Acquired(u32),
    /// The image is usable, but the swapchain no longer matches the
    /// surface exactly and should be recreated soon
    Suboptimal(u32),
    /// No image was available within the timeout. Nothing was signaled.
    NotReady,
    /// The swapchain can't be used until it is recreated. Nothing was
    /// signaled.
    OutOfDate,
}

/// How presentation went
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PresentStatus {
    Optimal,
    /// The image was queued but the swapchain no longer matches the
    /// surface exactly
    Suboptimal,
    /// The swapchain can't be presented to until it is recreated
    OutOfDate,
}

/// A display represents a physical screen
///
/// This name is overloaded as vulkan, ash, and us have something called
/// a display. Essentially this holds the PFN loaders, the display KHR
/// extension object, and the surface generated for the physical display.
///
/// The swapchain is generated (and regenerated) from this stuff.
pub struct Display {
    d_dev: Arc<Device>,
    d_back: PhysicalDisplay,
    // the actual surface (KHR extension)
    pub d_surface: vk::SurfaceKHR,
    // function pointer loaders
    pub d_surface_loader: khr::Surface,
    // Vulkan surface capabilities
    pub d_surface_caps: vk::SurfaceCapabilitiesKHR,
    pub d_surface_format: vk::SurfaceFormatKHR,
    /// Cache the present mode here so we don't re-request it
    pub d_present_mode: vk::PresentModeKHR,
    /// Current resolution of this output
    pub d_resolution: vk::Extent2D,

    /// loads swapchain extension
    d_swapchain_loader: khr::Swapchain,
    /// the actual swapchain
    d_swapchain: vk::SwapchainKHR,
    /// a set of images belonging to swapchain
    d_images: Vec<vk::Image>,
    /// views describing how to access the images
    d_views: Vec<vk::ImageView>,
    /// Clears the image and hands it to the presentation engine
    d_render_pass: vk::RenderPass,
    /// One per swapchain image
    d_framebuffers: Vec<vk::Framebuffer>,
}

impl Display {
    /// Bring up Vulkan on the first physical display
    ///
    /// This creates the instance, picks a device, creates the display
    /// surface and the first swapchain. Any failure here is fatal to
    /// the caller.
    pub fn new(info: &CreateInfo) -> Result<Display> {
        let inst = Arc::new(Instance::new(info)?);
        let (pdev, queue_family) = Device::select_pdev(&inst.inst)?;

        let back = PhysicalDisplay::new(&inst.loader, &inst.inst, pdev)?;
        let s_loader = khr::Surface::new(&inst.loader, &inst.inst);
        let surf = back.create_surface()?;

        // Ensure that the queue can present, validation layer checks for this
        let supported = unsafe {
            s_loader
                .get_physical_device_surface_support(pdev, queue_family, surf)
                .unwrap_or(false)
        };
        if !supported {
            unsafe { s_loader.destroy_surface(surf, None) };
            return Err(DisplayError::VK_SURF_NOT_SUPPORTED);
        }

        let dev = match Device::new(inst.clone(), pdev, queue_family) {
            Ok(d) => Arc::new(d),
            Err(e) => {
                unsafe { s_loader.destroy_surface(surf, None) };
                return Err(e);
            }
        };
        let swapchain_loader = khr::Swapchain::new(&inst.inst, &dev.dev);
        let res = back.visible_region();

        // From here on Drop cleans up after us, destroying null handles
        // is allowed by Vulkan
        let mut ret = Self {
            d_dev: dev,
            d_back: back,
            d_surface: surf,
            d_surface_loader: s_loader,
            d_surface_caps: vk::SurfaceCapabilitiesKHR::default(),
            d_surface_format: vk::SurfaceFormatKHR::default(),
            d_present_mode: vk::PresentModeKHR::FIFO,
            d_resolution: res,
            d_swapchain_loader: swapchain_loader,
            d_swapchain: vk::SwapchainKHR::null(),
            d_images: Vec::with_capacity(0),
            d_views: Vec::with_capacity(0),
            d_render_pass: vk::RenderPass::null(),
            d_framebuffers: Vec::with_capacity(0),
        };

        ret.d_surface_caps = ret.get_surface_caps()?;
        ret.d_surface_format = ret.select_surface_format()?;
        ret.d_present_mode = ret.select_present_mode();
        ret.d_render_pass = ret.create_render_pass()?;
        ret.recreate_swapchain()?;

        Ok(ret)
    }

    fn get_surface_caps(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.d_surface_loader
                .get_physical_device_surface_capabilities(self.d_dev.pdev, self.d_surface)
                .or(Err(DisplayError::VK_SURF_NOT_SUPPORTED))
        }
    }

    /// choose a vkSurfaceFormatKHR for the vkSurfaceKHR
    ///
    /// This selects the color space and layout for a surface. We want
    /// 8-bit sRGB BGRA, and otherwise take whatever the surface lists
    /// first.
    fn select_surface_format(&self) -> Result<vk::SurfaceFormatKHR> {
        let formats = unsafe {
            self.d_surface_loader
                .get_physical_device_surface_formats(self.d_dev.pdev, self.d_surface)
                .or(Err(DisplayError::INVALID_FORMAT))?
        };

        if let Some(fmt) = formats.iter().find(|fmt| {
            fmt.format == vk::Format::B8G8R8A8_SRGB
                && fmt.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        }) {
            return Ok(*fmt);
        }

        formats
            .iter()
            .map(|fmt| match fmt.format {
                // if the surface does not specify a desired format
                // then we can choose our own
                vk::Format::UNDEFINED => vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: fmt.color_space,
                },
                // if the surface has a desired format we will just
                // use that
                _ => *fmt,
            })
            .nth(0)
            .ok_or(DisplayError::INVALID_FORMAT)
    }

    /// FIFO is the only mode Vulkan guarantees.
    ///
    /// MAILBOX would be preferable for latency but tears on some
    /// direct display drivers, so it is only logged.
    fn select_present_mode(&self) -> vk::PresentModeKHR {
        let modes = unsafe {
            self.d_surface_loader
                .get_physical_device_surface_present_modes(self.d_dev.pdev, self.d_surface)
                .unwrap_or_default()
        };
        log::debug!("Available present modes: {:?}", modes);

        vk::PresentModeKHR::FIFO
    }

    /// Selects a resolution for the swapchain
    ///
    /// If the surface capabilities do not specify a requested extent,
    /// then we use the display mode's visible region.
    fn select_resolution(&self) -> vk::Extent2D {
        match self.d_surface_caps.current_extent.width {
            std::u32::MAX => self.d_back.visible_region(),
            _ => self.d_surface_caps.current_extent,
        }
    }

    /// Create the one render pass every frame uses
    ///
    /// It has a single color attachment which is cleared on load, stored,
    /// and left in the layout the presentation engine wants.
    fn create_render_pass(&self) -> Result<vk::RenderPass> {
        let attachments = [vk::AttachmentDescription::builder()
            .format(self.d_surface_format.format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build()];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];

        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .build()];

        // Don't write to the image before the acquire semaphore has let
        // us into the color output stage
        let dependencies = [vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .build()];

        let info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        unsafe {
            self.d_dev
                .dev
                .create_render_pass(&info, None)
                .or(Err(DisplayError::COULD_NOT_CREATE_RENDERPASS))
        }
    }

    /// Populates this display with a new vkSwapchain
    ///
    /// Any existing swapchain is passed as the old swapchain and then
    /// destroyed.
    fn create_swapchain(&mut self) -> Result<()> {
        // how many images we want the swapchain to contain
        let mut desired_image_count = self.d_surface_caps.min_image_count + 1;
        if self.d_surface_caps.max_image_count > 0
            && desired_image_count > self.d_surface_caps.max_image_count
        {
            desired_image_count = self.d_surface_caps.max_image_count;
        }

        let transform = if self
            .d_surface_caps
            .supported_transforms
            .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
        {
            vk::SurfaceTransformFlagsKHR::IDENTITY
        } else {
            self.d_surface_caps.current_transform
        };

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.d_surface)
            .min_image_count(desired_image_count)
            .image_color_space(self.d_surface_format.color_space)
            .image_format(self.d_surface_format.format)
            .image_extent(self.d_resolution)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.d_present_mode)
            .clipped(true)
            .image_array_layers(1)
            .old_swapchain(self.d_swapchain);

        let new_swapchain = unsafe {
            self.d_swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    log::error!("vkCreateSwapchainKHR failed: {:?}", e);
                    DisplayError::COULD_NOT_CREATE_SWAPCHAIN
                })?
        };

        // Now that we recreated the swapchain destroy the old one
        self.destroy_swapchain();
        self.d_swapchain = new_swapchain;

        Ok(())
    }

    /// Get the vkImage's for the swapchain, and create vkImageViews for them
    fn select_images_and_views(&mut self) -> Result<()> {
        let images = unsafe {
            self.d_swapchain_loader
                .get_swapchain_images(self.d_swapchain)
                .or(Err(DisplayError::COULD_NOT_CREATE_IMAGE))?
        };

        for image in images.iter() {
            // we want to interact with this image as a 2D
            // array of RGBA pixels (i.e. the "normal" way)
            let create_info = vk::ImageViewCreateInfo::builder()
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.d_surface_format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                // this view pertains to the entire image
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image(*image);

            // push as we go so a failure part way through still gets
            // the earlier views destroyed
            let view = unsafe {
                self.d_dev
                    .dev
                    .create_image_view(&create_info, None)
                    .or(Err(DisplayError::COULD_NOT_CREATE_IMAGE))?
            };
            self.d_views.push(view);
        }

        self.d_images = images;
        Ok(())
    }

    fn create_framebuffers(&mut self) -> Result<()> {
        for view in self.d_views.iter() {
            let attachments = [*view];
            let info = vk::FramebufferCreateInfo::builder()
                .render_pass(self.d_render_pass)
                .attachments(&attachments)
                .width(self.d_resolution.width)
                .height(self.d_resolution.height)
                .layers(1);

            let fb = unsafe {
                self.d_dev
                    .dev
                    .create_framebuffer(&info, None)
                    .or(Err(DisplayError::COULD_NOT_CREATE_FRAMEBUFFER))?
            };
            self.d_framebuffers.push(fb);
        }

        Ok(())
    }

    /// Tear down the per-image objects
    ///
    /// Don't destroy the images here, destroying the swapchain
    /// takes care of them
    fn destroy_image_resources(&mut self) {
        unsafe {
            for fb in self.d_framebuffers.drain(..) {
                self.d_dev.dev.destroy_framebuffer(fb, None);
            }
            for view in self.d_views.drain(..) {
                self.d_dev.dev.destroy_image_view(view, None);
            }
        }
        self.d_images.clear();
    }

    fn destroy_swapchain(&mut self) {
        unsafe {
            self.d_swapchain_loader
                .destroy_swapchain(self.d_swapchain, None);
        }
        self.d_swapchain = vk::SwapchainKHR::null();
    }

    /// Recreate our swapchain.
    ///
    /// This is done at startup, and whenever acquire or present reports
    /// that the swapchain is suboptimal or out of date. The caller must
    /// not have any frames referencing the old images outstanding; we
    /// wait for the device to go idle anyway.
    pub fn recreate_swapchain(&mut self) -> Result<()> {
        // first wait for the device to finish working
        self.d_dev.wait_idle()?;

        self.d_surface_caps = self.get_surface_caps()?;
        self.d_resolution = self.select_resolution();

        self.destroy_image_resources();
        self.create_swapchain()?;
        self.select_images_and_views()?;
        self.create_framebuffers()?;

        log::debug!(
            "Created swapchain with {} images at {}x{}",
            self.d_images.len(),
            self.d_resolution.width,
            self.d_resolution.height
        );

        Ok(())
    }

    /// Ask for the next image to render to
    ///
    /// `sema` is signaled once the presentation engine is done with the
    /// image. It is only signaled for `Acquired` and `Suboptimal`.
    pub fn acquire_next_image(&mut self, timeout_ns: u64, sema: vk::Semaphore) -> Result<NextImage> {
        match unsafe {
            self.d_swapchain_loader.acquire_next_image(
                self.d_swapchain,
                timeout_ns,
                sema,
                vk::Fence::null(),
            )
        } {
            Ok((index, false)) => Ok(NextImage::Acquired(index)),
            Ok((index, true)) => Ok(NextImage::Suboptimal(index)),
            Err(vk::Result::NOT_READY) | Err(vk::Result::TIMEOUT) => Ok(NextImage::NotReady),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(NextImage::OutOfDate),
            // the call did not succeed
            Err(e) => {
                log::error!("vkAcquireNextImageKHR failed: {:?}", e);
                Err(DisplayError::COULD_NOT_ACQUIRE_NEXT_IMAGE)
            }
        }
    }

    /// Record a frame that clears the image to `color`
    ///
    /// The command buffer is reset and recorded from scratch, so it must
    /// not be in use by the GPU.
    pub fn record_clear(
        &self,
        cbuf: vk::CommandBuffer,
        image_index: u32,
        color: [f32; 4],
    ) -> Result<()> {
        let framebuffer = *self
            .d_framebuffers
            .get(image_index as usize)
            .ok_or(DisplayError::INVALID)?;
        let dev = &self.d_dev.dev;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        }];
        let pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.d_render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.d_resolution,
            })
            .clear_values(&clear_values);

        // this cbuf will only be used once, so tell vulkan that
        // so it can optimize accordingly
        let record_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            dev.reset_command_buffer(cbuf, vk::CommandBufferResetFlags::empty())
                .or(Err(DisplayError::COULD_NOT_RECORD))?;
            dev.begin_command_buffer(cbuf, &record_info)
                .or(Err(DisplayError::COULD_NOT_RECORD))?;
            dev.cmd_begin_render_pass(cbuf, &pass_info, vk::SubpassContents::INLINE);
            dev.cmd_end_render_pass(cbuf);
            dev.end_command_buffer(cbuf)
                .or(Err(DisplayError::COULD_NOT_RECORD))?;
        }

        Ok(())
    }

    /// Present a swapchain image to the screen.
    ///
    /// Presentation waits on `wait_sema`, which the frame's submission
    /// signals.
    pub fn present(&mut self, image_index: u32, wait_sema: vk::Semaphore) -> Result<PresentStatus> {
        let wait_semas = [wait_sema];
        let swapchains = [self.d_swapchain];
        let indices = [image_index];
        let info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semas)
            .swapchains(&swapchains)
            .image_indices(&indices);

        unsafe {
            match self
                .d_swapchain_loader
                .queue_present(self.d_dev.d_queue, &info)
            {
                Ok(false) => Ok(PresentStatus::Optimal),
                Ok(true) => Ok(PresentStatus::Suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
                Err(e) => {
                    log::error!("vkQueuePresentKHR failed: {:?}", e);
                    Err(DisplayError::PRESENT_FAILED)
                }
            }
        }
    }

    pub fn device(&self) -> &Device {
        &self.d_dev
    }

    pub fn get_resolution(&self) -> (u32, u32) {
        (self.d_resolution.width, self.d_resolution.height)
    }

    pub fn image_count(&self) -> u32 {
        self.d_images.len() as u32
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        log::debug!("Destroying display");
        // Nothing useful can be done about a failure here
        let _ = self.d_dev.wait_idle();
        self.destroy_image_resources();
        unsafe {
            self.d_dev
                .dev
                .destroy_render_pass(self.d_render_pass, None);
        }
        self.destroy_swapchain();
        unsafe {
            self.d_surface_loader.destroy_surface(self.d_surface, None);
        }
    }
}
