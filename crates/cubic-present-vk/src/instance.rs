// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_char, c_void, CStr, CString};

use anyhow::{anyhow, Context, Result};
use ash::ext::debug_utils;
use ash::khr::surface;
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use tracing::{debug, error, info, trace, warn};

use crate::config::NegotiationConfig;
use crate::probe::DeviceIdentity;
use crate::runtime::InstanceQueries;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";
const ENGINE_NAME: &CStr = c"CubicEngine";

type DebugState = Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>;

/// Vulkan instance, the window surface created from it and, when validation
/// is on, the debug messenger.
pub struct InstanceContext {
    entry: Entry,
    instance: ash::Instance,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
    debug: DebugState,
}

impl InstanceContext {
    pub fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        config: &NegotiationConfig,
    ) -> Result<Self> {
        // STRICT ORDER:
        // 1) Create VkInstance (platform WSI + optional debug ext)
        // 2) Create VkSurfaceKHR FROM THIS INSTANCE
        // 3) (Later) Probe physical devices AGAINST THIS SURFACE

        // --- Platform handles (can fail on some backends) ---
        let dh = display
            .display_handle()
            .map_err(|e| anyhow!("{e}"))?
            .as_raw();
        let wh = window.window_handle().map_err(|e| anyhow!("{e}"))?.as_raw();

        let entry = Entry::linked();
        let validation = config.validation && validation_layer_available(&entry);
        let instance = create_instance(&entry, dh, &config.app_name, validation)
            .context("create_instance (with WSI + optional debug ext)")?;
        let surface_loader = surface::Instance::new(&entry, &instance);

        // From here on `Drop` owns cleanup; a null surface is ignored by the driver.
        let mut ctx = Self {
            entry,
            instance,
            surface_loader,
            surface: vk::SurfaceKHR::null(),
            debug: None,
        };

        if validation {
            ctx.debug = Some(
                create_debug_messenger(&ctx.entry, &ctx.instance)
                    .context("create_debug_utils_messenger")?,
            );
        }

        // SAFETY: the handles come from a live window, and the instance was
        // created with the extensions `ash_window` asked for.
        ctx.surface = unsafe { ash_window::create_surface(&ctx.entry, &ctx.instance, dh, wh, None) }
            .context("create_surface")?;

        info!(
            "Vulkan instance + surface ready (validation: {})",
            if validation { "on" } else { "off" }
        );
        Ok(ctx)
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn validation_enabled(&self) -> bool {
        self.debug.is_some()
    }
}

impl InstanceQueries for InstanceContext {
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        // SAFETY: the instance is alive for as long as `self`.
        unsafe { self.instance.enumerate_physical_devices() }
    }

    fn device_identity(&self, phys: vk::PhysicalDevice) -> DeviceIdentity {
        // SAFETY: `phys` was enumerated from this instance.
        let props = unsafe { self.instance.get_physical_device_properties(phys) };
        let name = props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| String::from("<unnamed>"));
        DeviceIdentity {
            name,
            device_type: props.device_type,
        }
    }

    fn queue_families(&self, phys: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        // SAFETY: `phys` was enumerated from this instance.
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(phys)
        }
    }

    fn surface_support(
        &self,
        phys: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        // SAFETY: `family` is below the count reported for `phys`.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(phys, family, surface)
        }
    }

    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        // SAFETY: `phys` was enumerated from this instance.
        let props = unsafe { self.instance.enumerate_device_extension_properties(phys) }?;
        Ok(props
            .iter()
            .filter_map(|e| e.extension_name_as_c_str().ok().map(CStr::to_owned))
            .collect())
    }

    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        // SAFETY: surface and device both belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(phys, surface)
        }
    }

    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        // SAFETY: surface and device both belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(phys, surface)
        }
    }

    fn surface_present_modes(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        // SAFETY: surface and device both belong to this instance.
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(phys, surface)
        }
    }
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        // SAFETY: the logical device and every swapchain are gone by now.
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn validation_layer_available(entry: &Entry) -> bool {
    // SAFETY: plain global query.
    let layers = match unsafe { entry.enumerate_instance_layer_properties() } {
        Ok(layers) => layers,
        Err(e) => {
            warn!("could not enumerate instance layers ({e:?}); validation disabled");
            return false;
        }
    };
    let found = layers
        .iter()
        .any(|l| l.layer_name_as_c_str().is_ok_and(|n| n == VALIDATION_LAYER));
    if !found {
        warn!("{VALIDATION_LAYER:?} not installed; validation disabled");
    }
    found
}

fn create_instance(
    entry: &Entry,
    display_raw: RawDisplayHandle,
    app_name: &str,
    validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name).context("application name contains NUL")?;
    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .engine_name(ENGINE_NAME)
        .api_version(vk::API_VERSION_1_0);

    let mut extensions = ash_window::enumerate_required_extensions(display_raw)
        .context("enumerate_required_extensions")?
        .to_vec();
    let mut layers: Vec<*const c_char> = Vec::new();
    if validation {
        extensions.push(debug_utils::NAME.as_ptr());
        layers.push(VALIDATION_LAYER.as_ptr());
    }
    debug!(
        "instance: {} extension(s), {} layer(s)",
        extensions.len(),
        layers.len()
    );

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layers);

    // SAFETY: every pointer in `create_info` outlives this call.
    Ok(unsafe { entry.create_instance(&create_info, None) }?)
}

fn create_debug_messenger(
    entry: &Entry,
    instance: &ash::Instance,
) -> Result<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = debug_utils::Instance::new(entry, instance);
    let ci = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));
    // SAFETY: the instance was created with VK_EXT_debug_utils enabled.
    let messenger = unsafe { loader.create_debug_utils_messenger(&ci, None) }?;
    Ok((loader, messenger))
}

/// Forwards driver messages to `tracing`. Never asks the driver to abort the call.
unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    // SAFETY: the driver hands us a valid callback struct for the duration of the call.
    let p_message = unsafe { (*data).p_message };
    if p_message.is_null() {
        return vk::FALSE;
    }
    // SAFETY: non-null, NUL-terminated by contract.
    let msg = unsafe { CStr::from_ptr(p_message) }.to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!(target: "vulkan", "[{types:?}] {msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!(target: "vulkan", "[{types:?}] {msg}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        debug!(target: "vulkan", "[{types:?}] {msg}");
    } else {
        trace!(target: "vulkan", "[{types:?}] {msg}");
    }
    vk::FALSE
}
