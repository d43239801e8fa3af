// SPDX-License-Identifier: CEPL-1.0
//! Vulkan device and presentation negotiation.
//!
//! The decision logic (probing, device selection, swapchain parameters,
//! chain lifetime) is written against the [`runtime`] traits so it can run
//! without a driver. [`VkPresenter`] wires it to ash.
#![deny(unsafe_op_in_unsafe_fn)]

use anyhow::{anyhow, Context, Result};
use ash::vk;
use cubic_present::{PresentSize, Presenter};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};

pub mod config;
pub mod device;
pub mod error;
pub mod instance;
pub mod probe;
pub mod queues;
pub mod runtime;
pub mod select;
pub mod swapchain;
pub mod views;

#[cfg(test)]
mod mock;

pub use config::{DevicePolicy, NegotiationConfig, VkVsyncMode};
pub use device::DeviceContext;
pub use error::NegotiationError;
pub use instance::InstanceContext;
pub use queues::{QueueFamilies, QueueFamilyIndices};
pub use select::{DeviceReport, SelectedDevice};
pub use swapchain::{PresentChain, SwapchainConfig};

use select::{enumerate_candidates, select_device, survey_devices};
use swapchain::{create_chain, fmt_name, negotiate, pm_name, recreate_chain};

pub struct VkPresenter {
    // Destroyed by hand in `Drop`; the rest drop in field order.
    chain: Option<PresentChain>,
    config: NegotiationConfig,
    selected: SelectedDevice,
    device: DeviceContext,
    instance: InstanceContext,
}

impl VkPresenter {
    pub fn selected(&self) -> &SelectedDevice {
        &self.selected
    }

    pub fn chain(&self) -> Option<&PresentChain> {
        self.chain.as_ref()
    }

    pub fn set_vsync_mode(&mut self, mode: VkVsyncMode) {
        if self.config.vsync_mode != mode {
            self.config.vsync_mode = mode;
            self.renegotiate_in_place();
        }
    }

    fn renegotiate(&mut self, hint: PresentSize) -> Result<()> {
        let chain = self
            .chain
            .as_mut()
            .ok_or_else(|| anyhow!("no presentable chain to supersede"))?;

        self.device
            .wait_idle()
            .context("device_wait_idle before swapchain recreation")?;
        recreate_chain(
            &self.instance,
            &self.device,
            &self.selected,
            self.instance.surface(),
            hint,
            &self.config,
            chain,
        )?;

        let sc = chain.config();
        info!(
            "swapchain recreated ({}x{}, {}, {}, {} images)",
            sc.extent.width,
            sc.extent.height,
            fmt_name(sc.format),
            pm_name(sc.present_mode),
            chain.image_count()
        );
        Ok(())
    }

    // Present-mode changes keep the current extent.
    fn renegotiate_in_place(&mut self) {
        let Some(extent) = self.chain.as_ref().map(|c| c.config().extent) else {
            return;
        };
        if let Err(e) = self.renegotiate(PresentSize::new(extent.width, extent.height)) {
            warn!("present mode change not applied: {e:#}");
        }
    }
}

impl Presenter for VkPresenter {
    type Config = NegotiationConfig;

    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: PresentSize,
        config: &NegotiationConfig,
    ) -> Result<Self> {
        let instance = InstanceContext::new(window, display, config)?;
        let surface = instance.surface();

        let candidates = enumerate_candidates(&instance)?;
        let selected = select_device(&instance, &candidates, config, surface)?;
        let device = DeviceContext::new(instance.instance(), &selected, config)?;

        let negotiated = negotiate(
            &instance,
            selected.candidate,
            surface,
            &selected.queues,
            size,
            config,
        )?;
        let chain = create_chain(&device, surface, negotiated, vk::SwapchainKHR::null())?;

        let sc = chain.config();
        info!(
            "Vulkan swapchain ready ({}x{}, fmt {}, {} images)",
            sc.extent.width,
            sc.extent.height,
            fmt_name(sc.format),
            chain.image_count()
        );

        Ok(Self {
            chain: Some(chain),
            config: config.clone(),
            selected,
            device,
            instance,
        })
    }

    fn resize(&mut self, size: PresentSize) -> Result<()> {
        if size.is_empty() {
            debug!("resize to {}x{} skipped (zero area)", size.width, size.height);
            return Ok(());
        }
        self.renegotiate(size)
    }

    fn set_vsync(&mut self, on: bool) {
        if self.config.vsync != on {
            self.config.vsync = on;
            self.renegotiate_in_place();
        }
    }
}

impl Drop for VkPresenter {
    fn drop(&mut self) {
        if let Some(chain) = self.chain.take() {
            self.device.wait_idle().ok();
            chain.destroy(&self.device);
        }
    }
}

/// Builds an instance and surface for `window` and reports on every device
/// without committing to one.
pub fn survey(
    window: &dyn HasWindowHandle,
    display: &dyn HasDisplayHandle,
    config: &NegotiationConfig,
) -> Result<Vec<DeviceReport>> {
    let instance = InstanceContext::new(window, display, config)?;
    Ok(survey_devices(&instance, config, instance.surface())?)
}
