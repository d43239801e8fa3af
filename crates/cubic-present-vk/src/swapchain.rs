// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use cubic_present::PresentSize;
use tracing::{info, warn};

use crate::config::{NegotiationConfig, VkVsyncMode};
use crate::error::{NegotiationError, Result};
use crate::probe::{probe_surface, Candidate, SurfaceSupport};
use crate::queues::QueueFamilies;
use crate::runtime::{DeviceCalls, InstanceQueries};
use crate::select::SelectedDevice;
use crate::views::{build_views, destroy_views, PresentView};

// Info only
pub(crate) fn fmt_name(f: vk::Format) -> &'static str {
    match f {
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        vk::Format::A2B10G10R10_UNORM_PACK32 => "A2B10G10R10_UNORM",
        vk::Format::R16G16B16A16_SFLOAT => "R16G16B16A16_SFLOAT",
        _ => "OTHER",
    }
}
pub(crate) fn cs_name(cs: vk::ColorSpaceKHR) -> &'static str {
    match cs {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => "SRGB_NONLINEAR",
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT => "EXTENDED_SRGB_LINEAR",
        vk::ColorSpaceKHR::HDR10_ST2084_EXT => "HDR10_ST2084",
        _ => "OTHER",
    }
}
pub(crate) fn pm_name(m: vk::PresentModeKHR) -> &'static str {
    match m {
        vk::PresentModeKHR::FIFO => "FIFO",
        vk::PresentModeKHR::MAILBOX => "MAILBOX",
        vk::PresentModeKHR::IMMEDIATE => "IMMEDIATE",
        vk::PresentModeKHR::FIFO_RELAXED => "FIFO_RELAXED",
        _ => "OTHER",
    }
}

/// BGRA8 sRGB with the non-linear sRGB colour space, else whatever the
/// surface lists first. `None` only for an empty list.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first().copied())
}

/// FIFO is the fallback in every branch; the platform guarantees it.
pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    vsync: bool,
    mode: VkVsyncMode,
) -> vk::PresentModeKHR {
    if !modes.contains(&vk::PresentModeKHR::FIFO) {
        warn!("surface does not list FIFO; assuming it anyway");
    }

    let preference: &[vk::PresentModeKHR] = match (vsync, mode) {
        (false, _) => &[
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::FIFO,
        ],
        (true, VkVsyncMode::Mailbox) => &[vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO],
        (true, VkVsyncMode::Fifo) => &[vk::PresentModeKHR::FIFO],
    };

    preference
        .iter()
        .copied()
        .find(|m| modes.contains(m))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// The surface's current extent, unless it reports the `u32::MAX` sentinel;
/// then the hint clamped into the allowed range on each axis.
pub fn extent_from_caps(caps: &vk::SurfaceCapabilitiesKHR, want: PresentSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: want
                .width
                .max(caps.min_image_extent.width)
                .min(caps.max_image_extent.width),
            height: want
                .height
                .max(caps.min_image_extent.height)
                .min(caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, before any maximum is applied.
pub fn requested_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    caps.min_image_count.saturating_add(1)
}

/// [`requested_image_count`] capped by the maximum (0 == "no max").
pub fn image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let want = requested_image_count(caps);
    if caps.max_image_count == 0 {
        want
    } else {
        want.min(caps.max_image_count)
    }
}

// Prefer IDENTITY if supported (common), otherwise use current to avoid extra blits.
pub fn choose_pre_transform(caps: &vk::SurfaceCapabilitiesKHR) -> vk::SurfaceTransformFlagsKHR {
    if caps
        .supported_transforms
        .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
    {
        vk::SurfaceTransformFlagsKHR::IDENTITY
    } else {
        caps.current_transform
    }
}

pub fn choose_composite_alpha(caps: &vk::SurfaceCapabilitiesKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ]
    .into_iter()
    .find(|&a| caps.supported_composite_alpha.contains(a))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// Who may touch the presentable images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSharing {
    Exclusive,
    /// Mandatory when graphics and present live in different families.
    Concurrent([u32; 2]),
}

impl ImageSharing {
    pub fn for_queues(queues: &QueueFamilies) -> Self {
        if queues.is_shared() {
            Self::Exclusive
        } else {
            Self::Concurrent([queues.graphics(), queues.present()])
        }
    }

    pub fn mode(&self) -> vk::SharingMode {
        match self {
            Self::Exclusive => vk::SharingMode::EXCLUSIVE,
            Self::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    pub fn family_indices(&self) -> &[u32] {
        match self {
            Self::Exclusive => &[],
            Self::Concurrent(families) => families,
        }
    }
}

/// The negotiated parameters of one presentable chain.
///
/// Never mutated: a resize or device loss produces a new one.
#[derive(Clone, Copy, Debug)]
pub struct SwapchainConfig {
    pub format: vk::Format,
    pub color_space: vk::ColorSpaceKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing: ImageSharing,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
}

impl SwapchainConfig {
    pub fn sharing_mode(&self) -> vk::SharingMode {
        self.sharing.mode()
    }

    pub fn queue_family_indices(&self) -> &[u32] {
        self.sharing.family_indices()
    }

    /// The creation request for this configuration. `old_swapchain` may be null.
    pub fn create_info(
        &self,
        surface: vk::SurfaceKHR,
        old_swapchain: vk::SwapchainKHR,
    ) -> vk::SwapchainCreateInfoKHR<'_> {
        vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(self.image_count)
            .image_format(self.format)
            .image_color_space(self.color_space)
            .image_extent(self.extent)
            .image_array_layers(1) // non-stereo
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(self.sharing_mode())
            .queue_family_indices(self.queue_family_indices())
            .pre_transform(self.pre_transform)
            .composite_alpha(self.composite_alpha)
            .present_mode(self.present_mode)
            .clipped(true) // don't care about obscured pixels
            .old_swapchain(old_swapchain)
    }
}

/// Apply every selection policy to an already probed surface.
pub fn negotiate_support(
    device: Candidate,
    support: &SurfaceSupport,
    queues: &QueueFamilies,
    hint: PresentSize,
    config: &NegotiationConfig,
) -> Result<SwapchainConfig> {
    let caps = &support.capabilities;
    let format = match choose_surface_format(&support.formats) {
        Some(f) if !support.present_modes.is_empty() => f,
        _ => {
            return Err(NegotiationError::EmptySurfaceCapabilities {
                device: device.index,
                formats: support.formats.len(),
                present_modes: support.present_modes.len(),
            })
        }
    };

    let negotiated = SwapchainConfig {
        format: format.format,
        color_space: format.color_space,
        present_mode: choose_present_mode(&support.present_modes, config.vsync, config.vsync_mode),
        extent: extent_from_caps(caps, hint),
        image_count: image_count(caps),
        sharing: ImageSharing::for_queues(queues),
        pre_transform: choose_pre_transform(caps),
        composite_alpha: choose_composite_alpha(caps),
    };

    info!(
        "format: {} / {}, present_mode: {}, vsync={}, mode={:?}, extent: {}x{}, images(min={} → picked={}), sharing: {:?}",
        fmt_name(negotiated.format),
        cs_name(negotiated.color_space),
        pm_name(negotiated.present_mode),
        config.vsync,
        config.vsync_mode,
        negotiated.extent.width,
        negotiated.extent.height,
        caps.min_image_count,
        negotiated.image_count,
        negotiated.sharing,
    );

    Ok(negotiated)
}

/// Query the surface afresh for `device` and negotiate against it.
pub fn negotiate(
    rt: &impl InstanceQueries,
    device: Candidate,
    surface: vk::SurfaceKHR,
    queues: &QueueFamilies,
    hint: PresentSize,
    config: &NegotiationConfig,
) -> Result<SwapchainConfig> {
    let support = probe_surface(rt, device, surface)?;
    negotiate_support(device, &support, queues, hint, config)
}

/// A created swapchain with one view per image.
///
/// Must be released with [`PresentChain::destroy`] before the logical device.
#[derive(Debug)]
pub struct PresentChain {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<PresentView>,
    config: SwapchainConfig,
    // Set once the runtime has retired `swapchain` through a failed handover.
    retired: bool,
}

impl PresentChain {
    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn views(&self) -> &[PresentView] {
        &self.views
    }

    pub fn config(&self) -> &SwapchainConfig {
        &self.config
    }

    /// A retired chain can no longer present or be passed as `old_swapchain`;
    /// it only waits to be destroyed.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// What the runtime actually handed back; may exceed the request.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Views first, then the chain (which owns the images).
    pub fn destroy(self, dev: &impl DeviceCalls) {
        destroy_views(dev, self.views);
        dev.destroy_swapchain(self.swapchain);
    }
}

/// Create the chain described by `config`, read its images back and build
/// their views. On failure nothing created here survives.
pub fn create_chain(
    dev: &impl DeviceCalls,
    surface: vk::SurfaceKHR,
    config: SwapchainConfig,
    old_swapchain: vk::SwapchainKHR,
) -> Result<PresentChain> {
    let swapchain = dev
        .create_swapchain(&config.create_info(surface, old_swapchain))
        .map_err(NegotiationError::SwapchainCreation)?;

    let images = match dev.swapchain_images(swapchain) {
        Ok(images) => images,
        Err(e) => {
            dev.destroy_swapchain(swapchain);
            return Err(NegotiationError::SwapchainCreation(e));
        }
    };
    if images.len() != config.image_count as usize {
        info!(
            "requested {} swapchain images, runtime provided {}",
            config.image_count,
            images.len()
        );
    }

    let views = match build_views(dev, &images, config.format) {
        Ok(views) => views,
        Err(e) => {
            dev.destroy_swapchain(swapchain);
            return Err(e);
        }
    };

    info!("Created swapchain with {} images", images.len());
    Ok(PresentChain {
        swapchain,
        images,
        views,
        config,
        retired: false,
    })
}

/// Supersede `chain` with one negotiated for `hint`.
///
/// The previous chain is handed to the runtime as `old_swapchain` and is
/// destroyed (views first) only once its replacement exists. If creation
/// fails, `chain` stays in place but is marked retired: the runtime retires
/// `old_swapchain` either way, so later attempts pass a null handle instead.
pub fn recreate_chain(
    rt: &impl InstanceQueries,
    dev: &impl DeviceCalls,
    device: &SelectedDevice,
    surface: vk::SurfaceKHR,
    hint: PresentSize,
    config: &NegotiationConfig,
    chain: &mut PresentChain,
) -> Result<()> {
    let negotiated = negotiate(rt, device.candidate, surface, &device.queues, hint, config)?;
    let old = if chain.retired {
        vk::SwapchainKHR::null()
    } else {
        chain.swapchain
    };
    let fresh = match create_chain(dev, surface, negotiated, old) {
        Ok(fresh) => fresh,
        Err(e) => {
            if old != vk::SwapchainKHR::null() {
                chain.retired = true;
            }
            return Err(e);
        }
    };
    std::mem::replace(chain, fresh).destroy(dev);
    Ok(())
}
