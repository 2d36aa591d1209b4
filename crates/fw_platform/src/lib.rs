pub mod window;

pub use window::{create_window, set_pointer_capture, PlatformConfig};
