// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

/// Failure of the device/presentation negotiation pipeline.
///
/// Every variant is terminal: the pipeline never retries, and all runtime
/// objects created during the failed attempt are released before one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("the Vulkan runtime reported no physical devices")]
    NoDevicesEnumerated,

    #[error("physical device enumeration failed: {0}")]
    Enumeration(vk::Result),

    #[error("none of the {examined} physical device(s) can present to this surface")]
    NoSuitableDevice { examined: usize },

    #[error(
        "device #{device}: incomplete queue families (graphics={graphics:?}, present={present:?})"
    )]
    IncompleteQueueFamilies {
        device: usize,
        graphics: Option<u32>,
        present: Option<u32>,
    },

    #[error("device #{device}: missing required extension(s) {missing:?}")]
    MissingRequiredExtension { device: usize, missing: Vec<String> },

    #[error(
        "device #{device}: surface offers {formats} format(s) and {present_modes} present mode(s)"
    )]
    EmptySurfaceCapabilities {
        device: usize,
        formats: usize,
        present_modes: usize,
    },

    #[error("swapchain creation rejected: {0}")]
    SwapchainCreation(vk::Result),

    #[error("image view #{index} creation failed: {result}")]
    ImageViewCreation { index: usize, result: vk::Result },

    #[error("logical device creation failed: {0}")]
    LogicalDeviceCreation(vk::Result),

    #[error("device #{device}: {step} failed: {result}")]
    Query {
        device: usize,
        step: &'static str,
        result: vk::Result,
    },
}

impl NegotiationError {
    /// True for the per-device suitability failures the selector skips over.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::IncompleteQueueFamilies { .. }
                | Self::MissingRequiredExtension { .. }
                | Self::EmptySurfaceCapabilities { .. }
        )
    }

    pub(crate) fn query(device: usize, step: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Query {
            device,
            step,
            result,
        }
    }
}

pub type Result<T, E = NegotiationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_device_and_step() {
        let err = NegotiationError::Query {
            device: 1,
            step: "surface formats",
            result: vk::Result::ERROR_SURFACE_LOST_KHR,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("device #1: surface formats failed"));

        let err = NegotiationError::NoSuitableDevice { examined: 3 };
        assert_eq!(
            err.to_string(),
            "none of the 3 physical device(s) can present to this surface"
        );
    }

    #[test]
    fn only_suitability_failures_are_rejections() {
        assert!(NegotiationError::IncompleteQueueFamilies {
            device: 0,
            graphics: Some(0),
            present: None,
        }
        .is_rejection());
        assert!(NegotiationError::EmptySurfaceCapabilities {
            device: 0,
            formats: 0,
            present_modes: 1,
        }
        .is_rejection());
        assert!(!NegotiationError::NoDevicesEnumerated.is_rejection());
        assert!(!NegotiationError::Enumeration(vk::Result::ERROR_INITIALIZATION_FAILED)
            .is_rejection());
        assert!(!NegotiationError::SwapchainCreation(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
            .is_rejection());
    }
}
