use crate::error::{RadioError, Result};
use crate::render::canvas::{create_canvas, set_on};
use crate::render::{HEIGHT, WIDTH};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tiny_skia::Pixmap;

/// Luma at or above this is a lit pixel.
const LUMA_THRESHOLD: u8 = 128;

/// Scale `img` down to fit the panel (never up) and threshold it to 1-bit.
///
/// # Errors
/// Returns `RadioError::Render` if the image is empty or the pixmap cannot
/// be created.
pub fn to_mono(img: &DynamicImage) -> Result<Pixmap> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RadioError::Render("empty bitmap".into()));
    }

    let scale = (WIDTH as f32 / width as f32)
        .min(HEIGHT as f32 / height as f32)
        .min(1.0);
    let new_w = ((width as f32 * scale) as u32).max(1);
    let new_h = ((height as f32 * scale) as u32).max(1);

    let fitted = if (new_w, new_h) == (width, height) {
        img.clone()
    } else {
        img.resize(new_w, new_h, FilterType::Triangle)
    };
    // Transparent pixels count as unlit.
    let rgba = fitted.to_rgba8();

    let mut pixmap = create_canvas(rgba.width(), rgba.height())?;
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
        let luma = luma * u32::from(a) / 255;
        if luma >= u32::from(LUMA_THRESHOLD) {
            set_on(&mut pixmap, x as i32, y as i32);
        }
    }

    Ok(pixmap)
}

/// Offset that centers `inner` within `outer`.
#[must_use]
pub const fn center(outer: u32, inner: u32) -> i32 {
    (outer as i32 - inner as i32) / 2
}
