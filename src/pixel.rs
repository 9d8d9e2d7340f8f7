//! Pixel layouts and marshaling between adapter and library representations.
//!
//! Everything here works on interleaved 8-bit samples. Typed views use the
//! `rgb` crate pixel types through `bytemuck`.

use rgb::{Rgb, Rgba};

use crate::AdapterError;

/// Number of interleaved 8-bit components per pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Components {
    Gray = 1,
    GrayAlpha = 2,
    Rgb = 3,
    Rgba = 4,
}

impl Components {
    /// Component count (1-4).
    pub const fn count(self) -> usize {
        self as usize
    }

    pub const fn has_alpha(self) -> bool {
        matches!(self, Components::GrayAlpha | Components::Rgba)
    }

    pub const fn has_color(self) -> bool {
        matches!(self, Components::Rgb | Components::Rgba)
    }

    /// Same colour model with alpha removed.
    pub const fn without_alpha(self) -> Self {
        match self {
            Components::GrayAlpha => Components::Gray,
            Components::Rgba => Components::Rgb,
            other => other,
        }
    }

    /// Same alpha status, expanded to colour.
    pub const fn with_color(self) -> Self {
        match self {
            Components::Gray => Components::Rgb,
            Components::GrayAlpha => Components::Rgba,
            other => other,
        }
    }

    /// Pick from flags describing a library's colour type.
    pub const fn from_flags(color: bool, alpha: bool) -> Self {
        match (color, alpha) {
            (false, false) => Components::Gray,
            (false, true) => Components::GrayAlpha,
            (true, false) => Components::Rgb,
            (true, true) => Components::Rgba,
        }
    }
}

impl TryFrom<usize> for Components {
    type Error = AdapterError;

    fn try_from(n: usize) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Components::Gray),
            2 => Ok(Components::GrayAlpha),
            3 => Ok(Components::Rgb),
            4 => Ok(Components::Rgba),
            other => Err(AdapterError::InvalidComponents(
                i64::try_from(other).unwrap_or(i64::MAX),
            )),
        }
    }
}

impl TryFrom<i32> for Components {
    type Error = AdapterError;

    fn try_from(n: i32) -> Result<Self, Self::Error> {
        usize::try_from(n)
            .map_err(|_| AdapterError::InvalidComponents(i64::from(n)))
            .and_then(Components::try_from)
    }
}

/// Order of the red and blue samples in colour pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelOrder {
    /// R, G, B(, A).
    #[default]
    Rgb,
    /// B, G, R(, A), as used by Windows DIB surfaces.
    Bgr,
}

/// Order of scanlines in a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowOrder {
    /// First row is the top of the image.
    #[default]
    TopDown,
    /// First row is the bottom of the image (OpenGL texture order).
    BottomUp,
}

impl RowOrder {
    /// Map an output row index to the source (top-down) row index.
    pub const fn source_row(self, row: u32, height: u32) -> u32 {
        match self {
            RowOrder::TopDown => row,
            RowOrder::BottomUp => height - 1 - row,
        }
    }
}

/// Byte length of one row, checking for overflow.
pub fn row_bytes(width: u32, components: Components) -> Result<usize, AdapterError> {
    (width as usize)
        .checked_mul(components.count())
        .ok_or(AdapterError::InvalidDimensions { width, height: 0 })
}

/// Byte length of a whole image, rejecting zero and overflowing dimensions.
pub fn image_bytes(width: u32, height: u32, components: Components) -> Result<usize, AdapterError> {
    if width == 0 || height == 0 {
        return Err(AdapterError::InvalidDimensions { width, height });
    }
    row_bytes(width, components)?
        .checked_mul(height as usize)
        .ok_or(AdapterError::InvalidDimensions { width, height })
}

/// Rec.601 luma in 8.8 fixed point.
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

/// Convert interleaved samples from one component layout to another.
///
/// Gray expands by replication, colour reduces through Rec.601 luma, missing
/// alpha becomes opaque and dropped alpha is discarded.
pub fn convert_components(src: &[u8], from: Components, to: Components) -> Vec<u8> {
    if from == to {
        return src.to_vec();
    }

    let pixels = src.len() / from.count();
    let mut out = Vec::with_capacity(pixels * to.count());

    for px in src.chunks_exact(from.count()) {
        let (r, g, b, a) = match from {
            Components::Gray => (px[0], px[0], px[0], 255),
            Components::GrayAlpha => (px[0], px[0], px[0], px[1]),
            Components::Rgb => (px[0], px[1], px[2], 255),
            Components::Rgba => (px[0], px[1], px[2], px[3]),
        };
        match to {
            Components::Gray if from.has_color() => out.push(luma(r, g, b)),
            Components::Gray => out.push(r),
            Components::GrayAlpha if from.has_color() => out.extend_from_slice(&[luma(r, g, b), a]),
            Components::GrayAlpha => out.extend_from_slice(&[r, a]),
            Components::Rgb => out.extend_from_slice(&[r, g, b]),
            Components::Rgba => out.extend_from_slice(&[r, g, b, a]),
        }
    }

    out
}

/// Swap red and blue samples in place. No-op for gray layouts.
pub fn swap_red_blue(buf: &mut [u8], components: Components) -> Result<(), AdapterError> {
    let len = buf.len();
    let ragged = |_| AdapterError::BufferSize {
        expected: len.next_multiple_of(components.count()),
        actual: len,
    };
    match components {
        Components::Rgb => {
            let pixels: &mut [Rgb<u8>] = bytemuck::try_cast_slice_mut(buf).map_err(ragged)?;
            for p in pixels {
                core::mem::swap(&mut p.r, &mut p.b);
            }
        }
        Components::Rgba => {
            let pixels: &mut [Rgba<u8>] = bytemuck::try_cast_slice_mut(buf).map_err(ragged)?;
            for p in pixels {
                core::mem::swap(&mut p.r, &mut p.b);
            }
        }
        Components::Gray | Components::GrayAlpha => {}
    }
    Ok(())
}

/// Reverse row order in place.
pub fn flip_rows(buf: &mut [u8], row_bytes: usize) {
    if row_bytes == 0 {
        return;
    }
    let rows = buf.len() / row_bytes;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (head, tail) = buf.split_at_mut(bottom * row_bytes);
        head[top * row_bytes..(top + 1) * row_bytes].swap_with_slice(&mut tail[..row_bytes]);
    }
}

/// Choose the layout to hand an encoder that only accepts `supported`.
///
/// Tries an exact match, then colour expansion, then alpha removal (followed
/// by expansion again). Returns `None` when nothing fits.
pub fn encodable_layout(requested: Components, supported: &[Components]) -> Option<Components> {
    let candidates = [
        requested,
        requested.with_color(),
        requested.without_alpha(),
        requested.without_alpha().with_color(),
    ];
    candidates.into_iter().find(|c| supported.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_round_trip_counts() {
        for n in 1usize..=4 {
            let c = Components::try_from(n).unwrap();
            assert_eq!(c.count(), n);
        }
        assert!(matches!(
            Components::try_from(5usize),
            Err(AdapterError::InvalidComponents(5))
        ));
        let err = Components::try_from(-1i32).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidComponents(-1)));
        assert!(err.to_string().starts_with("invalid component count -1"));
        assert!(Components::try_from(0usize).is_err());
    }

    #[test]
    fn gray_expands_by_replication() {
        let out = convert_components(&[10, 200], Components::Gray, Components::Rgba);
        assert_eq!(out, [10, 10, 10, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn color_reduces_to_luma() {
        let out = convert_components(&[255, 255, 255, 0, 0, 0], Components::Rgb, Components::Gray);
        assert_eq!(out, [255, 0]);

        let out = convert_components(&[255, 0, 0, 7], Components::Rgba, Components::GrayAlpha);
        assert_eq!(out, [77, 7]);
    }

    #[test]
    fn alpha_strip_and_pad() {
        let out = convert_components(&[1, 2, 3, 4], Components::Rgba, Components::Rgb);
        assert_eq!(out, [1, 2, 3]);
        let out = convert_components(&[1, 2, 3], Components::Rgb, Components::Rgba);
        assert_eq!(out, [1, 2, 3, 255]);
    }

    #[test]
    fn swap_red_blue_rgba() {
        let mut buf = [1, 2, 3, 4, 5, 6, 7, 8];
        swap_red_blue(&mut buf, Components::Rgba).unwrap();
        assert_eq!(buf, [3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn swap_red_blue_gray_untouched() {
        let mut buf = [1, 2, 3];
        swap_red_blue(&mut buf, Components::Gray).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn swap_red_blue_rejects_ragged_buffer() {
        let mut buf = [1, 2, 3, 4];
        assert!(matches!(
            swap_red_blue(&mut buf, Components::Rgb),
            Err(AdapterError::BufferSize { expected: 6, actual: 4 })
        ));
    }

    #[test]
    fn flip_rows_odd_count() {
        let mut buf = [1, 1, 2, 2, 3, 3];
        flip_rows(&mut buf, 2);
        assert_eq!(buf, [3, 3, 2, 2, 1, 1]);
    }

    #[test]
    fn layout_selection() {
        use Components::*;
        assert_eq!(encodable_layout(Rgba, &[Gray, Rgb, Rgba]), Some(Rgba));
        assert_eq!(encodable_layout(Rgba, &[Gray, Rgb]), Some(Rgb));
        assert_eq!(encodable_layout(GrayAlpha, &[Rgb, Rgba]), Some(Rgba));
        assert_eq!(encodable_layout(GrayAlpha, &[Gray, Rgb]), Some(Gray));
        assert_eq!(encodable_layout(Gray, &[Rgb]), Some(Rgb));
        assert_eq!(encodable_layout(Rgb, &[Gray]), None);
    }

    #[test]
    fn image_bytes_rejects_zero() {
        assert!(image_bytes(0, 4, Components::Rgb).is_err());
        assert_eq!(image_bytes(2, 3, Components::Rgb).unwrap(), 18);
    }

    #[test]
    fn bottom_up_row_mapping() {
        assert_eq!(RowOrder::BottomUp.source_row(0, 10), 9);
        assert_eq!(RowOrder::TopDown.source_row(3, 10), 3);
    }
}
