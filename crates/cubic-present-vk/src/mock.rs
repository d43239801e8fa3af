// SPDX-License-Identifier: CEPL-1.0
//! Scripted runtime for tests: fake devices, counted create/destroy calls.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};

use ash::khr::swapchain;
use ash::prelude::VkResult;
use ash::vk::{self, Handle};

use crate::probe::{Candidate, DeviceIdentity};
use crate::runtime::{DeviceCalls, InstanceQueries};

const DEVICE_BASE: u64 = 0x100;

pub struct MockDevice {
    name: String,
    device_type: vk::PhysicalDeviceType,
    families: Vec<(vk::QueueFlags, bool)>,
    extensions: Vec<CString>,
    caps: vk::SurfaceCapabilitiesKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
    surface_error: Option<vk::Result>,
}

impl MockDevice {
    /// Free-size surface, one BGRA8 sRGB format, FIFO only, swapchain
    /// extension present, no queue families.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            device_type: vk::PhysicalDeviceType::INTEGRATED_GPU,
            families: Vec::new(),
            extensions: vec![swapchain::NAME.to_owned()],
            caps: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            surface_error: None,
        }
    }

    pub fn family(mut self, flags: vk::QueueFlags, present: bool) -> Self {
        self.families.push((flags, present));
        self
    }

    pub fn graphics_present(self) -> Self {
        self.family(vk::QueueFlags::GRAPHICS, true)
    }

    pub fn device_type(mut self, device_type: vk::PhysicalDeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn extensions(mut self, names: &[&CStr]) -> Self {
        self.extensions = names.iter().map(|n| (*n).to_owned()).collect();
        self
    }

    pub fn capabilities(mut self, caps: vk::SurfaceCapabilitiesKHR) -> Self {
        self.caps = caps;
        self
    }

    pub fn formats(mut self, formats: Vec<vk::SurfaceFormatKHR>) -> Self {
        self.formats = formats;
        self
    }

    pub fn present_modes(mut self, modes: Vec<vk::PresentModeKHR>) -> Self {
        self.present_modes = modes;
        self
    }

    pub fn fail_surface_queries(mut self, result: vk::Result) -> Self {
        self.surface_error = Some(result);
        self
    }
}

#[derive(Default)]
pub struct Counters {
    pub support_queries: Cell<usize>,
    pub surface_queries: Cell<usize>,
    pub swapchains_created: Cell<usize>,
    pub swapchains_destroyed: Cell<usize>,
    pub views_created: Cell<usize>,
    pub views_destroyed: Cell<usize>,
}

fn bump(c: &Cell<usize>) {
    c.set(c.get() + 1);
}

#[derive(Clone, Debug)]
pub struct RecordedSwapchain {
    pub handle: vk::SwapchainKHR,
    pub old_swapchain: vk::SwapchainKHR,
    pub min_image_count: u32,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub sharing_mode: vk::SharingMode,
    pub families: Vec<u32>,
}

#[derive(Clone, Copy, Debug)]
pub struct RecordedView {
    pub image: vk::Image,
    pub format: vk::Format,
    pub view_type: vk::ImageViewType,
    pub aspect: vk::ImageAspectFlags,
    pub level_count: u32,
    pub layer_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Event {
    DestroyView,
    DestroySwapchain,
}

pub struct MockRuntime {
    devices: Vec<MockDevice>,
    images_per_chain: usize,
    fail_swapchain: Option<(usize, vk::Result)>,
    swapchain_calls: Cell<usize>,
    images_error: Option<vk::Result>,
    enumeration_error: Option<vk::Result>,
    fail_view_at: Option<usize>,
    next_handle: Cell<u64>,
    view_calls: Cell<usize>,
    counters: Counters,
    swapchains: RefCell<Vec<RecordedSwapchain>>,
    views: RefCell<Vec<RecordedView>>,
    events: RefCell<Vec<Event>>,
    live: RefCell<BTreeSet<u64>>,
}

impl MockRuntime {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            images_per_chain: 3,
            fail_swapchain: None,
            swapchain_calls: Cell::new(0),
            images_error: None,
            enumeration_error: None,
            fail_view_at: None,
            next_handle: Cell::new(0x1000),
            view_calls: Cell::new(0),
            counters: Counters::default(),
            swapchains: RefCell::new(Vec::new()),
            views: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            live: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn images_per_chain(mut self, n: usize) -> Self {
        self.images_per_chain = n;
        self
    }

    pub fn fail_swapchain(self, result: vk::Result) -> Self {
        self.fail_swapchain_at(0, result)
    }

    /// Only the `n`th swapchain creation (0-based) fails.
    pub fn fail_swapchain_at(mut self, n: usize, result: vk::Result) -> Self {
        self.fail_swapchain = Some((n, result));
        self
    }

    pub fn fail_enumeration(mut self, result: vk::Result) -> Self {
        self.enumeration_error = Some(result);
        self
    }

    /// Reading a created swapchain's images fails.
    pub fn fail_images(mut self, result: vk::Result) -> Self {
        self.images_error = Some(result);
        self
    }

    /// The `n`th image-view creation (0-based, counted across the runtime) fails.
    pub fn fail_view_at(mut self, n: usize) -> Self {
        self.fail_view_at = Some(n);
        self
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        (0..self.devices.len())
            .map(|index| Candidate {
                index,
                handle: vk::PhysicalDevice::from_raw(DEVICE_BASE + index as u64),
            })
            .collect()
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(0x5)
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn last_swapchain(&self) -> Option<RecordedSwapchain> {
        self.swapchains.borrow().last().cloned()
    }

    pub fn recorded_views(&self) -> Vec<RecordedView> {
        self.views.borrow().clone()
    }

    /// No view was destroyed after the most recent swapchain destruction.
    pub fn views_destroyed_before_swapchain(&self) -> bool {
        let events = self.events.borrow();
        match events.iter().rposition(|e| *e == Event::DestroySwapchain) {
            Some(last) => !events[last..].contains(&Event::DestroyView),
            None => true,
        }
    }

    /// Swapchains and views created and not yet destroyed.
    pub fn live_handles(&self) -> Vec<u64> {
        self.live.borrow().iter().copied().collect()
    }

    fn release(&self, raw: u64, what: &str) {
        assert!(
            self.live.borrow_mut().remove(&raw),
            "{what} {raw:#x} destroyed twice or never created"
        );
    }

    fn device(&self, phys: vk::PhysicalDevice) -> &MockDevice {
        &self.devices[(phys.as_raw() - DEVICE_BASE) as usize]
    }

    fn handle(&self) -> u64 {
        let h = self.next_handle.get();
        self.next_handle.set(h + 1);
        h
    }

    fn surface_result<T>(
        &self,
        phys: vk::PhysicalDevice,
        ok: impl FnOnce(&MockDevice) -> T,
    ) -> VkResult<T> {
        bump(&self.counters.surface_queries);
        let dev = self.device(phys);
        match dev.surface_error {
            Some(e) => Err(e),
            None => Ok(ok(dev)),
        }
    }
}

impl InstanceQueries for MockRuntime {
    fn physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        if let Some(e) = self.enumeration_error {
            return Err(e);
        }
        Ok(self.candidates().into_iter().map(|c| c.handle).collect())
    }

    fn device_identity(&self, phys: vk::PhysicalDevice) -> DeviceIdentity {
        let dev = self.device(phys);
        DeviceIdentity {
            name: dev.name.clone(),
            device_type: dev.device_type,
        }
    }

    fn queue_families(&self, phys: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.device(phys)
            .families
            .iter()
            .map(|&(queue_flags, _)| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    fn surface_support(
        &self,
        phys: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        bump(&self.counters.support_queries);
        Ok(self.device(phys).families[family as usize].1)
    }

    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        Ok(self.device(phys).extensions.clone())
    }

    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.surface_result(phys, |d| d.caps)
    }

    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        self.surface_result(phys, |d| d.formats.clone())
    }

    fn surface_present_modes(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        self.surface_result(phys, |d| d.present_modes.clone())
    }
}

impl DeviceCalls for MockRuntime {
    fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        let call = self.swapchain_calls.get();
        self.swapchain_calls.set(call + 1);
        match self.fail_swapchain {
            Some((at, e)) if call == at => return Err(e),
            _ => {}
        }
        let families = if info.queue_family_index_count == 0 {
            Vec::new()
        } else {
            // SAFETY: the builder set the pointer and count from one live slice.
            unsafe {
                std::slice::from_raw_parts(
                    info.p_queue_family_indices,
                    info.queue_family_index_count as usize,
                )
            }
            .to_vec()
        };
        let handle = vk::SwapchainKHR::from_raw(self.handle());
        self.live.borrow_mut().insert(handle.as_raw());
        self.swapchains.borrow_mut().push(RecordedSwapchain {
            handle,
            old_swapchain: info.old_swapchain,
            min_image_count: info.min_image_count,
            format: info.image_format,
            extent: info.image_extent,
            present_mode: info.present_mode,
            sharing_mode: info.image_sharing_mode,
            families,
        });
        bump(&self.counters.swapchains_created);
        Ok(handle)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        if let Some(e) = self.images_error {
            return Err(e);
        }
        let base = swapchain.as_raw() << 8;
        Ok((0..self.images_per_chain as u64)
            .map(|i| vk::Image::from_raw(base + i))
            .collect())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.release(swapchain.as_raw(), "swapchain");
        self.events.borrow_mut().push(Event::DestroySwapchain);
        bump(&self.counters.swapchains_destroyed);
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> VkResult<vk::ImageView> {
        let call = self.view_calls.get();
        self.view_calls.set(call + 1);
        if self.fail_view_at == Some(call) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        self.views.borrow_mut().push(RecordedView {
            image: info.image,
            format: info.format,
            view_type: info.view_type,
            aspect: info.subresource_range.aspect_mask,
            level_count: info.subresource_range.level_count,
            layer_count: info.subresource_range.layer_count,
        });
        bump(&self.counters.views_created);
        let view = self.handle();
        self.live.borrow_mut().insert(view);
        Ok(vk::ImageView::from_raw(view))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.release(view.as_raw(), "image view");
        self.events.borrow_mut().push(Event::DestroyView);
        bump(&self.counters.views_destroyed);
    }
}
