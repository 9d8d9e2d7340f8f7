//! Owned decode output and borrowed encode input.

use std::borrow::Cow;

use imgref::ImgRef;

use crate::pixel::{self, ChannelOrder, Components, RowOrder};
use crate::{AdapterConfig, AdapterError, ImageFormat};

/// A fully decoded image: interleaved 8-bit samples, one buffer per image.
///
/// Row `y` of [`pixels`](Self::pixels) is the `y`-th row in [`row_order`](Self::row_order).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    components: Components,
    format: Option<ImageFormat>,
    row_order: RowOrder,
    channel_order: ChannelOrder,
}

impl DecodedImage {
    /// Wrap library output that is top-down and RGB-ordered, then lay it out
    /// the way `config` asks for.
    pub(crate) fn from_library(
        mut pixels: Vec<u8>,
        width: u32,
        height: u32,
        components: Components,
        format: Option<ImageFormat>,
        config: &AdapterConfig,
    ) -> Result<Self, AdapterError> {
        let expected = pixel::image_bytes(width, height, components)?;
        if pixels.len() != expected {
            return Err(AdapterError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        if config.channel_order == ChannelOrder::Bgr {
            pixel::swap_red_blue(&mut pixels, components)?;
        }
        if config.row_order == RowOrder::BottomUp {
            pixel::flip_rows(&mut pixels, width as usize * components.count());
        }

        Ok(Self {
            pixels,
            width,
            height,
            components,
            format,
            row_order: config.row_order,
            channel_order: config.channel_order,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn components(&self) -> Components {
        self.components
    }

    /// Format the file was decoded from, when the wrapped library reports it.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    /// Bytes per row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.components.count()
    }

    /// The whole pixel buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Take ownership of the pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// One row, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.row_bytes();
        let start = y as usize * stride;
        Some(&self.pixels[start..start + stride])
    }

    /// Byte-granular 2D view (width is in bytes, not pixels).
    pub fn as_img(&self) -> ImgRef<'_, u8> {
        ImgRef::new(self.pixels.as_slice(), self.row_bytes(), self.height as usize)
    }

    /// Borrow as encoder input.
    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            pixels: &self.pixels,
            width: self.width,
            height: self.height,
            components: self.components,
        }
    }
}

/// Borrowed pixel buffer handed to `save`.
///
/// The buffer is laid out in the row and channel order of the adapter's
/// [`AdapterConfig`].
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
    components: Components,
}

impl<'a> ImageView<'a> {
    /// Validate that `pixels` holds exactly `width * height * components` bytes.
    pub fn new(
        pixels: &'a [u8],
        width: u32,
        height: u32,
        components: Components,
    ) -> Result<Self, AdapterError> {
        let expected = pixel::image_bytes(width, height, components)?;
        if pixels.len() != expected {
            return Err(AdapterError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
            components,
        })
    }

    /// Build from the signed integers of the legacy function surface.
    pub fn from_raw(
        pixels: &'a [u8],
        width: i32,
        height: i32,
        numcomponents: i32,
    ) -> Result<Self, AdapterError> {
        let invalid = || AdapterError::InvalidDimensions {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        };
        let width = u32::try_from(width).map_err(|_| invalid())?;
        let height = u32::try_from(height).map_err(|_| invalid())?;
        Self::new(pixels, width, height, Components::try_from(numcomponents)?)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn components(&self) -> Components {
        self.components
    }

    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    /// Samples in the layout an encoder expects: top-down, RGB-ordered, and
    /// converted to `target` components.
    pub(crate) fn to_library(
        &self,
        target: Components,
        config: &AdapterConfig,
    ) -> Result<Cow<'a, [u8]>, AdapterError> {
        let needs_swap = config.channel_order == ChannelOrder::Bgr && self.components.has_color();
        let needs_flip = config.row_order == RowOrder::BottomUp && self.height > 1;

        if !needs_swap && !needs_flip && target == self.components {
            return Ok(Cow::Borrowed(self.pixels));
        }

        let mut buf = self.pixels.to_vec();
        if needs_swap {
            pixel::swap_red_blue(&mut buf, self.components)?;
        }
        if needs_flip {
            pixel::flip_rows(&mut buf, self.width as usize * self.components.count());
        }
        if target != self.components {
            buf = pixel::convert_components(&buf, self.components, target);
        }
        Ok(Cow::Owned(buf))
    }
}
