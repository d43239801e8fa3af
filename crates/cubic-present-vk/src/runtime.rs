// SPDX-License-Identifier: CEPL-1.0
//! Seams between the negotiation logic and the Vulkan runtime.
//!
//! The pipeline only ever talks to these traits. The ash-backed
//! implementations live next to the objects that own the raw handles
//! ([`crate::instance::InstanceContext`], [`crate::device::DeviceContext`]);
//! tests substitute a scripted runtime.

use std::ffi::CString;

use ash::prelude::VkResult;
use ash::vk;

use crate::probe::DeviceIdentity;

/// Instance-level, read-only queries.
///
/// Implementations must treat every call as a pure read: no call may change
/// what a later call returns for the same device/surface pair.
pub trait InstanceQueries {
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;

    fn device_identity(&self, phys: vk::PhysicalDevice) -> DeviceIdentity;

    fn queue_families(&self, phys: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;

    fn surface_support(
        &self,
        phys: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>>;

    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;

    fn surface_present_modes(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;
}

/// Logical-device entry points for the presentable chain and its views.
pub trait DeviceCalls {
    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR<'_>)
        -> VkResult<vk::SwapchainKHR>;

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;

    /// Images owned by `swapchain` are released with it.
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);
}
