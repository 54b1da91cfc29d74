use crate::error::{RadioError, Result};
use tiny_skia::{Color, Pixmap, Transform};

/// Lit pixel.
pub const ON: [u8; 4] = [255, 255, 255, 255];

/// Create a new pixmap with every pixel off.
///
/// # Errors
/// Returns `RadioError::Render` if pixmap creation fails.
pub fn create_canvas(width: u32, height: u32) -> Result<Pixmap> {
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| RadioError::Render("failed to create pixmap".into()))?;
    pixmap.fill(Color::BLACK);
    Ok(pixmap)
}

/// Composite a source pixmap onto the canvas at the given position.
pub fn composite(canvas: &mut Pixmap, src: &Pixmap, x: i32, y: i32) {
    canvas.draw_pixmap(
        x,
        y,
        src.as_ref(),
        &tiny_skia::PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

/// Light one pixel; out-of-bounds coordinates are ignored.
pub fn set_on(canvas: &mut Pixmap, x: i32, y: i32) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    if x < 0 || y < 0 || x >= w || y >= h {
        return;
    }
    let idx = (y * w + x) as usize * 4;
    canvas.data_mut()[idx..idx + 4].copy_from_slice(&ON);
}
