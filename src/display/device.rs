use crate::display::Frame;
use crate::error::{RadioError, Result};
use crate::render::{self, Fonts};
use std::path::PathBuf;
use tracing::info;

/// The physical (or simulated) screen behind a `Surface`.
pub trait DisplayDevice: Send {
    fn show(&mut self, frame: &Frame) -> Result<()>;
}

/// Discards every frame.
pub struct NullDevice;

impl DisplayDevice for NullDevice {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

/// Writes screen contents to the log; handy on a bench without a panel.
pub struct LogDevice;

impl DisplayDevice for LogDevice {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        match frame {
            Frame::Blank => info!(target: "radiod::screen", "[blank]"),
            Frame::Text(lines) => {
                let body = lines
                    .iter()
                    .map(|l| format!("|{l}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                info!(target: "radiod::screen", "\n{body}");
            }
            Frame::Bitmap(img) => {
                info!(target: "radiod::screen", "[bitmap {}x{}]", img.width(), img.height());
            }
        }
        Ok(())
    }
}

/// Rasterizes frames the way the 128x64 panel would show them and writes the
/// result to a PNG file.
pub struct PngDevice {
    path: PathBuf,
    fonts: Fonts,
}

impl PngDevice {
    pub fn new(path: PathBuf, fonts: Fonts) -> Self {
        Self { path, fonts }
    }
}

impl DisplayDevice for PngDevice {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let img = render::rasterize(frame, &self.fonts)?;

        // Write-then-rename so readers never see a half-written file.
        let tmp = self.path.with_extension("png.tmp");
        img.save_with_format(&tmp, image::ImageFormat::Png)
            .map_err(|source| RadioError::Image { path: tmp.clone(), source })?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
