// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{CStr, CString};

use ash::khr::swapchain;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VkVsyncMode {
    Fifo, // Target monitor refresh rate
    #[default]
    Mailbox, // Smart Vsync, fps uncapped
}

/// How the selector breaks ties between suitable devices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DevicePolicy {
    /// First suitable device in enumeration order.
    #[default]
    FirstSuitable,
    /// Highest device-type score; ties keep enumeration order.
    PreferDiscrete,
}

/// Everything the negotiation pipeline needs to know up front.
///
/// Built by the caller once per negotiation; nothing here is process-wide.
#[derive(Clone, Debug)]
pub struct NegotiationConfig {
    pub app_name: String,
    pub validation: bool,
    pub device_policy: DevicePolicy,
    pub required_extensions: Vec<CString>,
    pub vsync: bool,
    pub vsync_mode: VkVsyncMode,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            app_name: "CubicEngine".to_owned(),
            validation: cfg!(debug_assertions),
            device_policy: DevicePolicy::default(),
            required_extensions: vec![swapchain::NAME.to_owned()],
            vsync: true,
            vsync_mode: VkVsyncMode::default(),
        }
    }
}

impl NegotiationConfig {
    /// Add a device extension by name; duplicates and malformed names are ignored.
    pub fn require_extension(&mut self, name: &str) -> &mut Self {
        match CString::new(name) {
            Ok(name) if !self.required_extensions.contains(&name) => {
                self.required_extensions.push(name)
            }
            Ok(_) => {}
            Err(_) => tracing::warn!("ignoring extension name with interior NUL: {name:?}"),
        }
        self
    }

    pub fn required_extension_names(&self) -> impl Iterator<Item = &CStr> {
        self.required_extensions.iter().map(CString::as_c_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requires_swapchain_only() {
        let cfg = NegotiationConfig::default();
        let names: Vec<_> = cfg.required_extension_names().collect();
        assert_eq!(names, vec![swapchain::NAME]);
        assert_eq!(cfg.device_policy, DevicePolicy::FirstSuitable);
        assert!(cfg.vsync);
        assert_eq!(cfg.vsync_mode, VkVsyncMode::Mailbox);
    }

    #[test]
    fn require_extension_dedups() {
        let mut cfg = NegotiationConfig::default();
        cfg.require_extension("VK_KHR_swapchain")
            .require_extension("VK_EXT_hdr_metadata")
            .require_extension("VK_EXT_hdr_metadata")
            .require_extension("bad\0name");
        assert_eq!(cfg.required_extensions.len(), 2);
        assert_eq!(
            cfg.required_extensions[1].as_c_str(),
            c"VK_EXT_hdr_metadata"
        );
    }
}
