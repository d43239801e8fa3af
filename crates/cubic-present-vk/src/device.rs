// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_char, CStr};

use ash::khr::swapchain;
use ash::prelude::VkResult;
use ash::vk;
use tracing::info;

use crate::config::NegotiationConfig;
use crate::error::{NegotiationError, Result};
use crate::queues::queue_create_infos;
use crate::runtime::DeviceCalls;
use crate::select::SelectedDevice;

/// Logical device plus the queues the presentation pipeline needs.
///
/// Destroys the device on drop; every swapchain and view created through it
/// must be gone by then.
pub struct DeviceContext {
    device: ash::Device,
    swapchain_loader: swapchain::Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
}

impl DeviceContext {
    pub fn new(
        instance: &ash::Instance,
        selected: &SelectedDevice,
        config: &NegotiationConfig,
    ) -> Result<Self> {
        // --- One queue per distinct family; a shared family gets a single queue ---
        let priorities = [1.0_f32];
        let queue_infos = queue_create_infos(&selected.queues, &priorities);

        let device_exts: Vec<*const c_char> = config
            .required_extension_names()
            .map(CStr::as_ptr)
            .collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let dinfo = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&device_exts)
            .enabled_features(&features);

        // SAFETY: the physical device was enumerated from `instance`, and every
        // array referenced by `dinfo` lives until the call returns.
        let device = unsafe { instance.create_device(selected.handle(), &dinfo, None) }
            .map_err(NegotiationError::LogicalDeviceCreation)?;

        // SAFETY: both families were requested with one queue each above.
        let (graphics_queue, present_queue) = unsafe {
            (
                device.get_device_queue(selected.queues.graphics(), 0),
                device.get_device_queue(selected.queues.present(), 0),
            )
        };
        let swapchain_loader = swapchain::Device::new(instance, &device);

        info!(
            "logical device ready ({} queue famil{})",
            queue_infos.len(),
            if queue_infos.len() == 1 { "y" } else { "ies" }
        );

        Ok(Self {
            device,
            swapchain_loader,
            graphics_queue,
            present_queue,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn wait_idle(&self) -> VkResult<()> {
        // SAFETY: the device is alive for as long as `self`.
        unsafe { self.device.device_wait_idle() }
    }
}

impl DeviceCalls for DeviceContext {
    fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        // SAFETY: `info` is fully built from a negotiated config and a live surface.
        unsafe { self.swapchain_loader.create_swapchain(info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        // SAFETY: `swapchain` was created by this device.
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        // SAFETY: callers destroy every view of the chain's images first.
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView> {
        // SAFETY: `info.image` belongs to a live swapchain of this device.
        unsafe { self.device.create_image_view(info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        // SAFETY: views are destroyed once, while their swapchain is still alive.
        unsafe { self.device.destroy_image_view(view, None) }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        // SAFETY: owners destroy swapchains and views before dropping the device.
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
        }
    }
}
