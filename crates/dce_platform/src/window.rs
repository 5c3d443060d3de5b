use std::sync::Arc;

use serde::Deserialize;
use winit::dpi::LogicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

/// Window and presentation settings, read from the `window` section of the
/// game config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub title: String,
    /// Logical pixels.
    pub width: u32,
    pub height: u32,
    /// Smallest size the window may be dragged to.
    pub min_width: u32,
    pub min_height: u32,
    /// Present with FIFO when set, otherwise the lowest-latency mode offered.
    pub vsync: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Dungeon Crawler".to_string(),
            width: 960,
            height: 640,
            min_width: 320,
            min_height: 240,
            vsync: true,
        }
    }
}

impl PlatformConfig {
    fn attributes(&self) -> WindowAttributes {
        let min = LogicalSize::new(
            self.min_width.min(self.width).max(1),
            self.min_height.min(self.height).max(1),
        );
        WindowAttributes::default()
            .with_title(&self.title)
            .with_inner_size(LogicalSize::new(self.width.max(1), self.height.max(1)))
            .with_min_inner_size(min)
    }
}

/// Open the game window. There is no headless fallback for the frame loop,
/// so callers treat an error here as fatal.
pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, String> {
    let window = event_loop
        .create_window(config.attributes())
        .map_err(|e| format!("Failed to create window: {e}"))?;
    let physical = window.inner_size();
    log::info!(
        "Window '{}' opened at {}x{} ({}x{} physical)",
        config.title,
        config.width,
        config.height,
        physical.width,
        physical.height
    );
    Ok(Arc::new(window))
}
