//! CLI command implementations

pub mod demo;
pub mod formats;
pub mod plan;

use sgfx_core::GpuPixelFormat;

/// Optional value or a dash.
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

/// Whether a shared buffer can be built from `format`.
pub fn is_shareable(format: GpuPixelFormat) -> bool {
    format.compatible_video_format().is_some()
        && format.bitmap_info().is_some()
        && format.default_color_space().is_some()
}
