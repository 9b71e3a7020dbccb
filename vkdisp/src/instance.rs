// Vulkan rendering instance
//
// This holds all of the common instance code for the Vulkan context

use ash::extensions::{ext, khr};
use ash::{vk, Entry};

use crate::{CreateInfo, DisplayError, Result};
use utils::log;

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

// this happy little debug callback is from the ash examples
// all it does is print any errors/warnings thrown.
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if let Some(data) = p_callback_data.as_ref() {
        if !data.p_message.is_null() {
            log::error!(
                "[VK][{:?}][{:?}] {:?}",
                message_severity,
                message_types,
                CStr::from_ptr(data.p_message)
            );
        }
    }
    vk::FALSE
}

/// A Vulkan Instance
///
/// This holds our basic vulkan session data. The device and display
/// surface are created from this.
pub struct Instance {
    /// debug callback sugar mentioned earlier. Only present when
    /// validation was requested.
    debug: Option<(ext::DebugUtils, vk::DebugUtilsMessengerEXT)>,

    /// the entry just loads function pointers from the dynamic library
    /// I am calling it a loader, because that's what it does
    pub(crate) loader: Entry,
    /// the big vulkan instance.
    pub(crate) inst: ash::Instance,
}

impl Instance {
    /// Creates a new debug reporter and registers our function
    /// for debug callbacks so we get nice error messages
    fn setup_debug(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(ext::DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let dr_loader = ext::DebugUtils::new(entry, instance);
        let callback = unsafe {
            dr_loader
                .create_debug_utils_messenger(&debug_info, None)
                .or(Err(DisplayError::COULD_NOT_CREATE_INSTANCE))?
        };
        Ok((dr_loader, callback))
    }

    /// Get the instance extensions needed for direct to display output
    fn extension_names(info: &CreateInfo) -> Vec<*const c_char> {
        let mut names = vec![khr::Surface::name().as_ptr(), khr::Display::name().as_ptr()];
        if info.enable_validation {
            names.push(ext::DebugUtils::name().as_ptr());
        }
        names
    }

    /// Create a vkInstance
    ///
    /// The loader library is opened here, so a machine without Vulkan
    /// installed fails at this point.
    pub fn new(info: &CreateInfo) -> Result<Self> {
        let entry = unsafe { Entry::load() }.or(Err(DisplayError::VULKAN_NOT_FOUND))?;
        let app_name = CString::new("Wayvk").or(Err(DisplayError::INVALID))?;

        let layer_names = match info.enable_validation {
            true => vec![CString::new(VALIDATION_LAYER).or(Err(DisplayError::INVALID))?],
            false => Vec::new(),
        };
        let layer_names_raw: Vec<*const c_char> = layer_names
            .iter()
            .map(|raw_name: &CString| raw_name.as_ptr())
            .collect();

        let extension_names_raw = Self::extension_names(info);

        let appinfo = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 0, 1))
            .engine_name(&app_name)
            .engine_version(vk::make_api_version(0, 0, 0, 1))
            .api_version(vk::API_VERSION_1_0);

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&appinfo)
            .enabled_layer_names(&layer_names_raw)
            .enabled_extension_names(&extension_names_raw);

        let instance: ash::Instance = unsafe {
            entry.create_instance(&create_info, None).map_err(|e| {
                log::error!("vkCreateInstance failed: {:?}", e);
                DisplayError::COULD_NOT_CREATE_INSTANCE
            })?
        };

        let debug = match info.enable_validation {
            true => match Self::setup_debug(&entry, &instance) {
                Ok(d) => Some(d),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            },
            false => None,
        };

        log::debug!(
            "Created Vulkan instance (validation {})",
            info.enable_validation
        );

        Ok(Self {
            loader: entry,
            inst: instance,
            debug: debug,
        })
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        log::debug!("Destroying instance");
        unsafe {
            if let Some((loader, callback)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(callback, None);
            }
            self.inst.destroy_instance(None);
        }
    }
}
