pub mod device;

pub use device::{DisplayDevice, LogDevice, NullDevice, PngDevice};

use crate::error::{RadioError, Result};
use image::DynamicImage;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Number of text lines on the screen.
pub const LINES: usize = 6;

/// Something the physical screen can show.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Blank,
    Text([String; LINES]),
    Bitmap(Arc<DynamicImage>),
}

#[derive(Debug, Clone)]
enum Content {
    Text([String; LINES]),
    Bitmap(Arc<DynamicImage>),
}

#[derive(Debug)]
struct Queued {
    frame: Frame,
    /// Keep this frame up for at least this long once it is shown.
    hold: Option<Duration>,
}

/// The text/bitmap buffer in front of a display device.
///
/// `freeze(d)` keeps whatever is on the device for at least `d`. While frozen,
/// `render` does not touch the device; frames are queued and shown in order
/// once the window lapses. The window is a deadline, not a lock: nothing here
/// ever sleeps, the owner polls `next_deadline`/`flush_due`.
pub struct Surface {
    device: Box<dyn DisplayDevice>,
    content: Content,
    frozen_until: Option<Instant>,
    queue: VecDeque<Queued>,
}

impl Surface {
    pub fn new(device: Box<dyn DisplayDevice>) -> Self {
        Self {
            device,
            content: Content::Text(Default::default()),
            frozen_until: None,
            queue: VecDeque::new(),
        }
    }

    /// Replace all text lines.
    pub fn set_all(&mut self, lines: [String; LINES]) {
        self.content = Content::Text(lines);
    }

    /// Replace one text line, switching back to text mode if a bitmap was
    /// being shown.
    ///
    /// # Errors
    /// Returns `RadioError::InvalidLine` if `line` is outside `0..LINES`.
    pub fn set_line(&mut self, line: usize, text: impl Into<String>) -> Result<()> {
        if line >= LINES {
            return Err(RadioError::InvalidLine(line));
        }
        if let Content::Bitmap(_) = self.content {
            self.content = Content::Text(Default::default());
        }
        if let Content::Text(ref mut lines) = self.content {
            lines[line] = text.into();
        }
        Ok(())
    }

    pub fn clear_text(&mut self) {
        self.content = Content::Text(Default::default());
    }

    pub fn draw_bitmap(&mut self, image: Arc<DynamicImage>) {
        self.content = Content::Bitmap(image);
    }

    /// Current text lines; empty lines in bitmap mode.
    pub fn lines(&self) -> [String; LINES] {
        match &self.content {
            Content::Text(lines) => lines.clone(),
            Content::Bitmap(_) => Default::default(),
        }
    }

    /// Push the buffer to the device, or queue it behind an active freeze.
    ///
    /// # Errors
    /// Returns the device error if the frame could not be shown.
    pub fn render(&mut self) -> Result<()> {
        let frame = match &self.content {
            Content::Text(lines) => Frame::Text(lines.clone()),
            Content::Bitmap(img) => Frame::Bitmap(Arc::clone(img)),
        };
        self.submit(frame)
    }

    /// Hold the screen for `duration`. If frames are already waiting behind
    /// an earlier freeze, the hold applies to the most recent of them, from
    /// the moment it is shown.
    pub fn freeze(&mut self, duration: Duration) {
        let now = Instant::now();
        match self.frozen_until {
            Some(until) if until > now => {
                if let Some(last) = self.queue.back_mut() {
                    last.hold = Some(last.hold.map_or(duration, |h| h.max(duration)));
                } else {
                    self.frozen_until = Some(until.max(now + duration));
                }
            }
            _ => {
                debug!("display frozen for {duration:?}");
                self.frozen_until = Some(now + duration);
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_until.is_some_and(|until| until > Instant::now())
    }

    /// When the current freeze lapses, if one is active or frames are waiting.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.frozen_until
    }

    /// Show queued frames whose turn has come.
    ///
    /// # Errors
    /// Returns the device error if a frame could not be shown; later frames
    /// stay queued.
    pub fn flush_due(&mut self) -> Result<()> {
        let now = Instant::now();
        while let Some(until) = self.frozen_until {
            if until > now {
                break;
            }
            let Some(next) = self.queue.pop_front() else {
                self.frozen_until = None;
                break;
            };
            self.frozen_until = next.hold.map(|hold| now + hold).or(Some(now));
            self.device.show(&next.frame)?;
        }
        Ok(())
    }

    /// Blank the device immediately, dropping queued frames and any freeze.
    ///
    /// # Errors
    /// Returns the device error if the screen could not be blanked.
    pub fn clear(&mut self) -> Result<()> {
        self.queue.clear();
        self.frozen_until = None;
        self.content = Content::Text(Default::default());
        self.device.show(&Frame::Blank)
    }

    fn submit(&mut self, frame: Frame) -> Result<()> {
        self.flush_due()?;

        if self.is_frozen() {
            match self.queue.back_mut() {
                Some(last) if last.hold.is_none() => last.frame = frame,
                _ => self.queue.push_back(Queued { frame, hold: None }),
            }
            return Ok(());
        }

        self.frozen_until = None;
        self.device.show(&frame)
    }
}
