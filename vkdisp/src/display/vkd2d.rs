/// The Vulkan Direct 2 Display (VK_KHR_display) backend
///
/// This presents to physical outputs using the Vulkan extensions.
/// This has the very nice property of not requiring the DRM subsystem
/// or any window server.
use ash::extensions::khr;
use ash::vk;
use ash::Entry;

use crate::{DisplayError, Result};
use utils::log;

use std::ffi::CStr;

/// This represents a physical monitor sitting on the user's desk.
/// It corresponds to the VK_KHR_display extension.
pub(crate) struct PhysicalDisplay {
    // the display itself
    #[allow(dead_code)]
    display: vk::DisplayKHR,
    display_loader: khr::Display,
    /// The plane we scan out of, and its stack index
    pd_plane: u32,
    pd_plane_stack: u32,
    /// The mode the display will be driven with
    pd_mode: vk::DisplayModeKHR,
    pd_mode_params: vk::DisplayModeParametersKHR,
}

impl PhysicalDisplay {
    /// Pick the display, plane and mode to drive
    ///
    /// We take the first display reported by the device, then the first
    /// plane that is either unused or already showing that display, then
    /// the display's first mode.
    pub(crate) fn new(
        entry: &Entry,
        inst: &ash::Instance,
        pdev: vk::PhysicalDevice,
    ) -> Result<Self> {
        let d_loader = khr::Display::new(entry, inst);

        unsafe {
            // This is essentially a list of the available displays.
            // Despite having a display_name member, the names are very
            // unhelpful. (e.x. "monitor").
            let disp_props = d_loader
                .get_physical_device_display_properties(pdev)
                .or(Err(DisplayError::NO_DISPLAY))?;
            let disp = disp_props.first().ok_or(DisplayError::NO_DISPLAY)?;
            if !disp.display_name.is_null() {
                log::debug!(
                    "Using display {:?} ({}x{} mm)",
                    CStr::from_ptr(disp.display_name),
                    disp.physical_dimensions.width,
                    disp.physical_dimensions.height
                );
            }
            let display = disp.display;

            let plane_props = d_loader
                .get_physical_device_display_plane_properties(pdev)
                .or(Err(DisplayError::NO_DISPLAY_PLANE))?;
            let (plane, plane_props) = plane_props
                .iter()
                .enumerate()
                .find(|(_, p)| {
                    p.current_display == vk::DisplayKHR::null() || p.current_display == display
                })
                .ok_or(DisplayError::NO_DISPLAY_PLANE)?;
            log::debug!(
                "Using display plane {} at stack index {}",
                plane,
                plane_props.current_stack_index
            );

            // The available modes for the display. This holds
            // the resolution.
            let mode_props = d_loader
                .get_display_mode_properties(pdev, display)
                .or(Err(DisplayError::NO_DISPLAY_MODE))?;
            let mode = mode_props.first().ok_or(DisplayError::NO_DISPLAY_MODE)?;
            log::debug!(
                "Using display mode {}x{} @ {} mHz",
                mode.parameters.visible_region.width,
                mode.parameters.visible_region.height,
                mode.parameters.refresh_rate
            );

            Ok(Self {
                display: display,
                display_loader: d_loader,
                pd_plane: plane as u32,
                pd_plane_stack: plane_props.current_stack_index,
                pd_mode: mode.display_mode,
                pd_mode_params: mode.parameters,
            })
        }
    }

    /// The native resolution of the selected mode
    pub(crate) fn visible_region(&self) -> vk::Extent2D {
        self.pd_mode_params.visible_region
    }

    /// Get a physical display surface.
    ///
    /// From this point on everything is a normal VkSurfaceKHR.
    pub(crate) fn create_surface(&self) -> Result<vk::SurfaceKHR> {
        let surf_info = vk::DisplaySurfaceCreateInfoKHR::builder()
            .display_mode(self.pd_mode)
            .plane_index(self.pd_plane)
            .plane_stack_index(self.pd_plane_stack)
            .transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .alpha_mode(vk::DisplayPlaneAlphaFlagsKHR::OPAQUE)
            .image_extent(self.pd_mode_params.visible_region);

        unsafe {
            self.display_loader
                .create_display_plane_surface(&surf_info, None)
                .map_err(|e| {
                    log::error!("vkCreateDisplayPlaneSurfaceKHR failed: {:?}", e);
                    DisplayError::COULD_NOT_CREATE_SURFACE
                })
        }
    }
}
