use std::sync::Arc;
use winit::error::{ExternalError, OsError};
use winit::event_loop::ActiveEventLoop;
use winit::window::{CursorGrabMode, Window, WindowAttributes};

pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Fogwalk".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, OsError> {
    let attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

    let window = event_loop.create_window(attrs)?;
    Ok(Arc::new(window))
}

/// Grabs or releases the pointer. While captured the cursor is hidden and
/// raw mouse motion drives the view.
///
/// `Locked` is not available on every platform (X11 and Windows only
/// confine), so a failed lock falls back to `Confined`. On success the
/// returned flag is the new engaged state.
pub fn set_pointer_capture(window: &Window, captured: bool) -> Result<bool, ExternalError> {
    if !captured {
        window.set_cursor_grab(CursorGrabMode::None)?;
        window.set_cursor_visible(true);
        return Ok(false);
    }

    if let Err(err) = window.set_cursor_grab(CursorGrabMode::Locked) {
        log::debug!("Cursor lock unavailable ({err}), confining instead");
        window.set_cursor_grab(CursorGrabMode::Confined)?;
    }
    window.set_cursor_visible(false);
    Ok(true)
}
