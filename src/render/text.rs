use crate::render::canvas::set_on;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use tiny_skia::Pixmap;

/// Pixel size of the station-name line.
pub const TITLE_SIZE: f32 = 15.0;

/// Pixel size of every other line.
pub const LINE_SIZE: f32 = 11.0;

/// Vertical pitch between line baselines.
const LINE_PITCH: f32 = 10.0;

/// Glyph coverage at or above this lights the pixel; the panel is 1-bit.
const COVERAGE_THRESHOLD: f32 = 0.5;

/// Baseline of text line `idx`.
#[must_use]
pub fn baseline(idx: usize) -> f32 {
    LINE_PITCH * (idx as f32 + 1.0)
}

/// Rasterize one left-aligned line with its baseline at `y_baseline`.
pub fn draw_line(canvas: &mut Pixmap, font: &FontVec, text: &str, font_size: f32, y_baseline: f32) {
    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let mut cursor_x = 0.0f32;
    let mut prev_glyph_id = None;

    for ch in text.chars() {
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = prev_glyph_id {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        if let Some(outlined) = scaled_font.outline_glyph(
            glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, y_baseline)),
        ) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                if coverage >= COVERAGE_THRESHOLD {
                    set_on(
                        canvas,
                        px as i32 + bounds.min.x as i32,
                        py as i32 + bounds.min.y as i32,
                    );
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph_id = Some(glyph_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baselines_step_by_pitch() {
        assert_eq!(baseline(0), 10.0);
        assert_eq!(baseline(5), 60.0);
    }
}
