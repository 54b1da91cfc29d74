//! Fakes shared by unit tests.

use crate::display::{DisplayDevice, Frame};
use crate::error::{RadioError, Result};
use crate::mixer::Mixer;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Display device that records every frame it is asked to show.
#[derive(Clone, Default)]
pub struct MemoryDevice {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Frame> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    /// Text of the most recent frame, empty if it is not a text frame.
    pub fn last_text(&self) -> Vec<String> {
        match self.last() {
            Some(Frame::Text(lines)) => lines.to_vec(),
            _ => Vec::new(),
        }
    }
}

impl DisplayDevice for MemoryDevice {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }
}

/// In-memory mixer.
pub struct FakeMixer {
    level: AtomicU8,
    broken: AtomicBool,
}

impl FakeMixer {
    pub fn new(level: u8) -> Self {
        Self {
            level: AtomicU8::new(level),
            broken: AtomicBool::new(false),
        }
    }

    pub fn broken() -> Self {
        let m = Self::new(0);
        m.broken.store(true, Ordering::SeqCst);
        m
    }
}

#[async_trait]
impl Mixer for FakeMixer {
    async fn volume(&self) -> Result<u8> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RadioError::Mixer("no such control".into()));
        }
        Ok(self.level.load(Ordering::SeqCst))
    }

    async fn set_volume(&self, percent: u8) -> Result<()> {
        self.level.store(percent, Ordering::SeqCst);
        Ok(())
    }
}
