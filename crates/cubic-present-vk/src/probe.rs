// SPDX-License-Identifier: CEPL-1.0
//! Read-only capability queries against one candidate device.
//!
//! Empty answers (no formats, no present modes, no extensions) are normal
//! here and come back as empty collections; deciding whether emptiness
//! disqualifies a device is the selector's job.

use std::collections::BTreeSet;
use std::ffi::CString;

use ash::vk;
use tracing::debug;

use crate::error::{NegotiationError, Result};
use crate::runtime::InstanceQueries;

/// A physical device together with its position in enumeration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub index: usize,
    pub handle: vk::PhysicalDevice,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
}

impl DeviceIdentity {
    /// Used only by [`crate::DevicePolicy::PreferDiscrete`].
    pub fn type_score(&self) -> u32 {
        match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 10,
            vk::PhysicalDeviceType::CPU => 5,
            _ => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub supports_graphics: bool,
    pub supports_present: bool,
}

/// Snapshot of what a surface offers one device.
///
/// Only valid for the device/surface pair it was queried against.
#[derive(Clone, Debug)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// At least one format and one present mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

pub fn probe_identity(rt: &impl InstanceQueries, device: Candidate) -> DeviceIdentity {
    rt.device_identity(device.handle)
}

/// Every queue family of `device`, with present support tested against
/// `surface` when there is one.
pub fn probe_queue_families(
    rt: &impl InstanceQueries,
    device: Candidate,
    surface: Option<vk::SurfaceKHR>,
) -> Result<Vec<QueueFamilyInfo>> {
    rt.queue_families(device.handle)
        .iter()
        .zip(0u32..)
        .map(|(props, index)| {
            let supports_present = match surface {
                Some(surface) => rt
                    .surface_support(device.handle, index, surface)
                    .map_err(NegotiationError::query(device.index, "surface support"))?,
                None => false,
            };
            Ok(QueueFamilyInfo {
                index,
                supports_graphics: props.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                supports_present,
            })
        })
        .collect()
}

pub fn probe_extensions(
    rt: &impl InstanceQueries,
    device: Candidate,
) -> Result<BTreeSet<CString>> {
    let names = rt
        .device_extensions(device.handle)
        .map_err(NegotiationError::query(device.index, "device extensions"))?;
    Ok(names.into_iter().collect())
}

pub fn probe_surface(
    rt: &impl InstanceQueries,
    device: Candidate,
    surface: vk::SurfaceKHR,
) -> Result<SurfaceSupport> {
    // capabilities: image counts, transforms, current extent (or UINT_MAX for free-size)
    let capabilities = rt
        .surface_capabilities(device.handle, surface)
        .map_err(NegotiationError::query(device.index, "surface capabilities"))?;
    let formats = rt
        .surface_formats(device.handle, surface)
        .map_err(NegotiationError::query(device.index, "surface formats"))?;
    let present_modes = rt
        .surface_present_modes(device.handle, surface)
        .map_err(NegotiationError::query(device.index, "surface present modes"))?;

    debug!(
        "device #{}: {} format(s), {} present mode(s), images {}..{}",
        device.index,
        formats.len(),
        present_modes.len(),
        capabilities.min_image_count,
        if capabilities.max_image_count == 0 {
            "unbounded".to_string()
        } else {
            capabilities.max_image_count.to_string()
        }
    );

    Ok(SurfaceSupport {
        capabilities,
        formats,
        present_modes,
    })
}
