//! Adapter configuration.
//!
//! [`AdapterConfig`] bundles the knobs every binding honours: resource limits,
//! the buffer layout callers expect, and encoder settings for lossy and
//! compressed formats. Bindings ignore settings for formats they cannot write.

use crate::Limits;
use crate::pixel::{ChannelOrder, RowOrder};

/// Deflate effort for PNG output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

/// Per-adapter configuration.
///
/// # Example
///
/// ```
/// use zenadapters::{AdapterConfig, Limits, RowOrder};
///
/// let config = AdapterConfig::default()
///     .with_row_order(RowOrder::BottomUp)
///     .with_jpeg_quality(80)
///     .with_limits(Limits { max_pixels: Some(64 << 20), ..Limits::none() });
/// assert_eq!(config.jpeg_quality, 80);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct AdapterConfig {
    /// Limits checked before decoding or encoding.
    pub limits: Limits,
    /// Row order of decoded buffers and of buffers passed to `save`.
    pub row_order: RowOrder,
    /// Red/blue order of decoded buffers and of buffers passed to `save`.
    pub channel_order: ChannelOrder,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// PNG deflate effort.
    pub png_compression: PngCompression,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            limits: Limits::none(),
            row_order: RowOrder::TopDown,
            channel_order: ChannelOrder::Rgb,
            jpeg_quality: 90,
            png_compression: PngCompression::Default,
        }
    }
}

impl AdapterConfig {
    /// Set resource limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the row order of pixel buffers.
    pub fn with_row_order(mut self, row_order: RowOrder) -> Self {
        self.row_order = row_order;
        self
    }

    /// Set the red/blue order of pixel buffers.
    pub fn with_channel_order(mut self, channel_order: ChannelOrder) -> Self {
        self.channel_order = channel_order;
        self
    }

    /// Set JPEG quality (clamped to 1-100).
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set PNG deflate effort.
    pub fn with_png_compression(mut self, compression: PngCompression) -> Self {
        self.png_compression = compression;
        self
    }
}
