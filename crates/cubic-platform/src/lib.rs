// SPDX-License-Identifier: CEPL-1.0
pub use winit;

use cubic_present::PresentSize;
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// Framebuffer size of `window` in physical pixels.
pub fn present_size(window: &Window) -> PresentSize {
    to_present_size(window.inner_size())
}

pub fn to_present_size(size: PhysicalSize<u32>) -> PresentSize {
    PresentSize::new(size.width, size.height)
}
