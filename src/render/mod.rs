pub mod bitmap;
pub mod canvas;
pub mod text;

use crate::display::Frame;
use crate::error::{RadioError, Result};
use ab_glyph::FontVec;
use image::RgbaImage;
use std::path::Path;

/// SH1106 panel width in pixels.
pub const WIDTH: u32 = 128;

/// SH1106 panel height in pixels.
pub const HEIGHT: u32 = 64;

/// Fonts used for text frames. Without a regular font text is not drawn.
#[derive(Default, Debug)]
pub struct Fonts {
    pub regular: Option<FontVec>,
    /// Title line; falls back to `regular`.
    pub bold: Option<FontVec>,
}

impl Fonts {
    /// # Errors
    /// Returns `RadioError::Font` if a given font file can't be read or parsed.
    pub fn load(regular: Option<&Path>, bold: Option<&Path>) -> Result<Self> {
        Ok(Self {
            regular: regular.map(load_font).transpose()?,
            bold: bold.map(load_font).transpose()?,
        })
    }

    fn title(&self) -> Option<&FontVec> {
        self.bold.as_ref().or(self.regular.as_ref())
    }
}

fn load_font(path: &Path) -> Result<FontVec> {
    let font_err = |message: String| RadioError::Font {
        path: path.to_path_buf(),
        message,
    };
    let data = std::fs::read(path).map_err(|e| font_err(e.to_string()))?;
    FontVec::try_from_vec(data).map_err(|e| font_err(e.to_string()))
}

/// Rasterize a frame into a monochrome 128x64 image.
///
/// # Errors
/// Returns `RadioError::Render` if a pixmap can't be created.
pub fn rasterize(frame: &Frame, fonts: &Fonts) -> Result<RgbaImage> {
    let mut pm = canvas::create_canvas(WIDTH, HEIGHT)?;

    match frame {
        Frame::Blank => {}
        Frame::Text(lines) => {
            for (idx, line) in lines.iter().enumerate() {
                if line.is_empty() {
                    continue;
                }
                let (font, size) = if idx == 0 {
                    (fonts.title(), text::TITLE_SIZE)
                } else {
                    (fonts.regular.as_ref(), text::LINE_SIZE)
                };
                if let Some(font) = font {
                    text::draw_line(&mut pm, font, line, size, text::baseline(idx));
                }
            }
        }
        Frame::Bitmap(img) => {
            let mono = bitmap::to_mono(img)?;
            let x = bitmap::center(WIDTH, mono.width());
            let y = bitmap::center(HEIGHT, mono.height());
            canvas::composite(&mut pm, &mono, x, y);
        }
    }

    RgbaImage::from_raw(WIDTH, HEIGHT, pm.data().to_vec())
        .ok_or_else(|| RadioError::Render("pixmap size mismatch".into()))
}
