// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

use crate::error::{NegotiationError, Result};
use crate::probe::Candidate;
use crate::runtime::InstanceQueries;

/// Partially resolved queue roles, as found while scanning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    pub fn resolve(self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

/// Queue families covering both graphics submission and presentation.
///
/// Only obtainable from complete [`QueueFamilyIndices`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilies {
    graphics: u32,
    present: u32,
}

impl QueueFamilies {
    pub fn graphics(&self) -> u32 {
        self.graphics
    }

    pub fn present(&self) -> u32 {
        self.present
    }

    /// One family serves both roles.
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// `[graphics]` or `[graphics, present]`.
    pub fn distinct(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Scan families in index order for the first graphics family and the first
/// family able to present to `surface`, stopping once both are known.
pub fn resolve_queue_families(
    rt: &impl InstanceQueries,
    device: Candidate,
    surface: vk::SurfaceKHR,
) -> Result<QueueFamilies> {
    let mut found = QueueFamilyIndices::default();

    for (props, index) in rt.queue_families(device.handle).iter().zip(0u32..) {
        if found.graphics.is_none() && props.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            found.graphics = Some(index);
        }
        if found.present.is_none()
            && rt
                .surface_support(device.handle, index, surface)
                .map_err(NegotiationError::query(device.index, "surface support"))?
        {
            found.present = Some(index);
        }
        if found.is_complete() {
            break;
        }
    }

    found
        .resolve()
        .ok_or(NegotiationError::IncompleteQueueFamilies {
            device: device.index,
            graphics: found.graphics,
            present: found.present,
        })
}

/// One create-info per distinct family, each with a single queue.
pub fn queue_create_infos<'a>(
    families: &QueueFamilies,
    priorities: &'a [f32],
) -> Vec<vk::DeviceQueueCreateInfo<'a>> {
    families
        .distinct()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(priorities)
        })
        .collect()
}
