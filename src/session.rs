//! Streaming sessions backed by a fully decoded image.

use crate::adapter::{ScanlineSession, check_read_args};
use crate::pixel::Components;
use crate::{AdapterError, DecodedImage};

/// Serves rows of an image that was decoded in full when the session opened.
///
/// Used by libraries without incremental decode and by formats (interlaced
/// PNG) whose rows only settle after the last pass. Any row order works.
#[derive(Debug)]
pub struct BufferedSession {
    image: DecodedImage,
}

impl BufferedSession {
    pub fn new(image: DecodedImage) -> Self {
        log::debug!(
            "buffered session over {}x{} {:?}",
            image.width(),
            image.height(),
            image.components()
        );
        Self { image }
    }
}

impl ScanlineSession for BufferedSession {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn components(&self) -> Components {
        self.image.components()
    }

    fn read_line(&mut self, y: u32, buf: &mut [u8]) -> Result<(), AdapterError> {
        let row_bytes = self.image.row_bytes();
        check_read_args(y, self.image.height(), row_bytes, buf)?;
        let row = self
            .image
            .row(y)
            .ok_or(AdapterError::RowOutOfRange { row: y, height: self.image.height() })?;
        buf[..row_bytes].copy_from_slice(row);
        Ok(())
    }

    fn close(self: Box<Self>) {
        log::debug!("closing buffered session");
    }
}
