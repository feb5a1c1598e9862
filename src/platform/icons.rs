//! Tray icon rendering.
//!
//! The icon is generated at runtime: a black square with an inner square
//! that is white while stopped and green while enforcement runs.

use image::{Rgba, RgbaImage};

/// Icon size in pixels.
pub const ICON_SIZE: u32 = 64;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const IDLE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const ACTIVE: Rgba<u8> = Rgba([60, 180, 60, 255]);

/// Render the tray icon for the given enforcement state.
pub fn render_icon(running: bool) -> RgbaImage {
    let inner = if running { ACTIVE } else { IDLE };
    let lo = ICON_SIZE / 4;
    let hi = ICON_SIZE * 3 / 4;

    RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
            inner
        } else {
            BACKGROUND
        }
    })
}

/// Build a `tray_icon::Icon` for the given enforcement state.
#[cfg(windows)]
pub fn tray_icon(running: bool) -> Result<tray_icon::Icon, String> {
    let image = render_icon(running);
    let (width, height) = image.dimensions();
    tray_icon::Icon::from_rgba(image.into_raw(), width, height).map_err(|e| e.to_string())
}
