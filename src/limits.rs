//! Resource limits applied before the wrapped library allocates.

use crate::{AdapterError, ErrorKind};

/// Caps on image size for load, open and save.
///
/// Every cap is optional. Dimensions are checked as soon as a header is read;
/// `max_memory_bytes` is also handed to the wrapped library where it accepts
/// one. A decoded buffer is `width * height * components` bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Cap on `width * height`.
    pub max_pixels: Option<u64>,
    /// Cap on the size of the 8-bit sample buffer.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// No caps.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_max_dimensions(mut self, width: u64, height: u64) -> Self {
        self.max_width = Some(width);
        self.max_height = Some(height);
        self
    }

    pub fn with_max_pixels(mut self, pixels: u64) -> Self {
        self.max_pixels = Some(pixels);
        self
    }

    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    /// Check an image about to be decoded.
    pub(crate) fn check_decode(&self, width: u32, height: u32, components: usize) -> Result<(), AdapterError> {
        self.check(ErrorKind::Decode, width, height, components)
    }

    /// Check an image about to be encoded.
    pub(crate) fn check_encode(&self, width: u32, height: u32, components: usize) -> Result<(), AdapterError> {
        self.check(ErrorKind::Encode, width, height, components)
    }

    /// Check an image of `components` samples per pixel against every cap.
    fn check(&self, kind: ErrorKind, width: u32, height: u32, components: usize) -> Result<(), AdapterError> {
        let pixels = u64::from(width) * u64::from(height);
        let bytes = pixels.saturating_mul(components as u64);
        let checks = [
            ("width", u64::from(width), self.max_width),
            ("height", u64::from(height), self.max_height),
            ("pixel count", pixels, self.max_pixels),
            ("buffer size", bytes, self.max_memory_bytes),
        ];
        for (what, value, cap) in checks {
            if let Some(cap) = cap.filter(|&cap| value > cap) {
                return Err(AdapterError::LimitExceeded {
                    message: format!("{what} {value} exceeds {cap} ({width}x{height})"),
                    kind,
                });
            }
        }
        Ok(())
    }
}
