// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::debug;

use crate::error::{NegotiationError, Result};
use crate::runtime::DeviceCalls;

/// A colour view over one presentable image.
///
/// The image belongs to the swapchain; only the view is ours to destroy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentView {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

/// 2D, single mip, single layer, colour aspect, identity swizzle.
pub fn view_create_info(image: vk::Image, format: vk::Format) -> vk::ImageViewCreateInfo<'static> {
    vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
}

/// One view per image, in image order. If any view fails, the views already
/// made for this batch are destroyed before the error is returned.
pub fn build_views(
    dev: &impl DeviceCalls,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<PresentView>> {
    let mut views = Vec::with_capacity(images.len());
    for (index, &image) in images.iter().enumerate() {
        match dev.create_image_view(&view_create_info(image, format)) {
            Ok(view) => views.push(PresentView {
                image,
                view,
                format,
            }),
            Err(result) => {
                destroy_views(dev, views);
                return Err(NegotiationError::ImageViewCreation { index, result });
            }
        }
    }
    debug!("Created {} image views", views.len());
    Ok(views)
}

pub fn destroy_views(dev: &impl DeviceCalls, views: Vec<PresentView>) {
    for v in views {
        dev.destroy_image_view(v.view);
    }
}
