//! # vkdisp
//!
//! The Vulkan half of wayvk. This crate owns everything needed to put
//! pixels on a physical monitor without a window system: the instance,
//! a logical device, a `VK_KHR_display` surface, and the swapchain with
//! its render pass and framebuffers.
//!
//! It deliberately knows nothing about sessions or frame pacing. The
//! caller creates its own fences, semaphores and command buffers through
//! the `Device` helpers and drives acquire/submit/present itself.
//!
//! ## Requirements
//!
//! The following instance extensions are used:
//! * VK_KHR_surface
//! * VK_KHR_display
//! * VK_EXT_debug_utils (only with validation enabled)
//!
//! And the VK_KHR_swapchain device extension.
#![allow(non_camel_case_types)]

mod device;
mod display;
mod instance;

pub use ash::vk;
pub use device::Device;
pub use display::{Display, NextImage, PresentStatus};

extern crate utils;

use thiserror::Error;

/// Errors reported by the display stack
///
/// None of these are recoverable. A swapchain that is suboptimal or out
/// of date is reported through `NextImage` and `PresentStatus` instead.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("Could not load the Vulkan loader library")]
    VULKAN_NOT_FOUND,
    #[error("Error creating instance")]
    COULD_NOT_CREATE_INSTANCE,
    #[error("No suitable physical devices could be found")]
    NO_SUITABLE_DEVICE,
    #[error("Unable to create device")]
    COULD_NOT_CREATE_DEVICE,
    #[error("Unable to get a direct display. Is it already in use by Xorg or a Wayland compositor?")]
    NO_DISPLAY,
    #[error("Unable to find a free display plane. Is the display already in use by Xorg or a Wayland compositor?")]
    NO_DISPLAY_PLANE,
    #[error("No valid raw Vulkan display mode found")]
    NO_DISPLAY_MODE,
    #[error("Unable to create surface")]
    COULD_NOT_CREATE_SURFACE,
    #[error("Visible surface is unsupported by the physical device")]
    VK_SURF_NOT_SUPPORTED,
    #[error("Could not find an acceptable surface format")]
    INVALID_FORMAT,
    #[error("Unable to create swapchain. Is the display already in use by Xorg or a Wayland compositor?")]
    COULD_NOT_CREATE_SWAPCHAIN,
    #[error("Unable to create swapchain image view")]
    COULD_NOT_CREATE_IMAGE,
    #[error("Unable to create renderpass")]
    COULD_NOT_CREATE_RENDERPASS,
    #[error("Unable to create framebuffer")]
    COULD_NOT_CREATE_FRAMEBUFFER,
    #[error("Unable to create command pool")]
    COULD_NOT_CREATE_COMMAND_POOL,
    #[error("Unable to allocate command buffers")]
    COULD_NOT_ALLOCATE_COMMAND_BUFFER,
    #[error("Unable to create fence or semaphore")]
    COULD_NOT_CREATE_SYNC,
    #[error("Waiting on the device failed")]
    WAIT_FAILED,
    #[error("Unexpected error when acquiring next swapchain image")]
    COULD_NOT_ACQUIRE_NEXT_IMAGE,
    #[error("Unable to record command buffer")]
    COULD_NOT_RECORD,
    #[error("Unable to submit render queue")]
    SUBMIT_FAILED,
    #[error("Unable to present the swapchain")]
    PRESENT_FAILED,
    #[error("Invalid value")]
    INVALID,
}

pub type Result<T> = std::result::Result<T, DisplayError>;

/// Parameters for Display creation.
pub struct CreateInfo {
    /// Enable VK_LAYER_KHRONOS_validation and the debug messenger
    pub enable_validation: bool,
}

impl CreateInfo {
    pub fn builder() -> CreateInfoBuilder {
        CreateInfoBuilder {
            ci: CreateInfo {
                enable_validation: cfg!(debug_assertions),
            },
        }
    }
}

/// Implements the builder pattern for easier display creation
pub struct CreateInfoBuilder {
    ci: CreateInfo,
}

impl CreateInfoBuilder {
    pub fn enable_validation<'a>(&'a mut self, enable: bool) -> &'a mut Self {
        self.ci.enable_validation = enable;
        self
    }

    pub fn build(self) -> CreateInfo {
        self.ci
    }
}
