// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// Framebuffer size in pixels, as reported by the window system.
///
/// Backends treat this as a hint: the surface may dictate its own extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentSize {
    pub width: u32,
    pub height: u32,
}

impl PresentSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area window (minimised) cannot back a presentable chain.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

pub trait Presenter {
    type Config;

    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: PresentSize,
        config: &Self::Config,
    ) -> Result<Self>
    where
        Self: Sized;

    /// Supersede the current presentable chain with one negotiated for `size`.
    fn resize(&mut self, size: PresentSize) -> Result<()>;

    fn set_vsync(&mut self, _on: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_area_is_empty() {
        assert!(PresentSize::new(0, 600).is_empty());
        assert!(PresentSize::new(800, 0).is_empty());
        assert!(!PresentSize::new(1, 1).is_empty());
    }
}
