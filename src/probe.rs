//! Partial-data image probing.
//!
//! Extracts format, dimensions, alpha and bit depth from a leading slice of an
//! image file without handing it to a codec. Used for capability reports and
//! the `info` tooling; decoding always goes through the wrapped library.

use std::io::Read;
use std::path::Path;

use crate::{AdapterError, ImageFormat};

/// How many leading bytes [`read_header`] returns at most.
pub const HEADER_LEN: usize = 4096;

/// Result of probing partial image data.
///
/// All fields except `format` are `Option`, since partial data may not contain
/// enough bytes for dimensions or other metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProbeResult {
    /// Detected image format (always present if probe succeeds).
    pub format: ImageFormat,
    /// Image width in pixels.
    pub width: Option<u32>,
    /// Image height in pixels.
    pub height: Option<u32>,
    /// Whether the image has an alpha channel.
    pub has_alpha: Option<bool>,
    /// Bits per channel.
    pub bit_depth: Option<u8>,
    /// Number of bytes examined from the input.
    pub bytes_examined: usize,
}

impl ProbeResult {
    fn empty(format: ImageFormat) -> Self {
        Self {
            format,
            width: None,
            height: None,
            has_alpha: None,
            bit_depth: None,
            bytes_examined: 0,
        }
    }

    /// Both dimensions, when present.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// Read up to [`HEADER_LEN`] leading bytes of a file.
pub fn read_header(path: &Path) -> Result<Vec<u8>, AdapterError> {
    let file = std::fs::File::open(path).map_err(|e| AdapterError::read_io(path, e))?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| AdapterError::read_io(path, e))?;
    Ok(header)
}

/// Detect the format from magic bytes and parse what the header allows.
pub fn probe(data: &[u8]) -> Option<ProbeResult> {
    ImageFormat::detect(data).map(|format| probe_format(data, format))
}

/// Probe data for a known format (skips auto-detection).
///
/// Never fails; insufficient data results in `None` fields.
pub fn probe_format(data: &[u8], format: ImageFormat) -> ProbeResult {
    match format {
        ImageFormat::Png => probe_png(data),
        ImageFormat::Gif => probe_gif(data),
        ImageFormat::WebP => probe_webp(data),
        ImageFormat::Jpeg => probe_jpeg(data),
        ImageFormat::Bmp => probe_bmp(data),
        ImageFormat::Qoi => probe_qoi(data),
        other => ProbeResult::empty(other),
    }
}

// ---------------------------------------------------------------------------
// PNG: 8-byte signature + IHDR chunk (4 len + 4 type + 13 data)
// ---------------------------------------------------------------------------

fn probe_png(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Png);
    result.bytes_examined = data.len().min(29);

    if data.len() < 29 || &data[12..16] != b"IHDR" {
        return result;
    }

    result.width = Some(u32::from_be_bytes([data[16], data[17], data[18], data[19]]));
    result.height = Some(u32::from_be_bytes([data[20], data[21], data[22], data[23]]));
    result.bit_depth = Some(data[24]);
    // Color type 4 = grayscale+alpha, 6 = RGBA. tRNS can add alpha later.
    let color_type = data[25];
    if color_type == 4 || color_type == 6 {
        result.has_alpha = Some(true);
    }

    result
}

// ---------------------------------------------------------------------------
// GIF: 6-byte header + 7-byte Logical Screen Descriptor = 13 bytes
// ---------------------------------------------------------------------------

fn probe_gif(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Gif);
    result.bytes_examined = data.len().min(13);

    if data.len() < 13 {
        return result;
    }

    result.width = Some(u16::from_le_bytes([data[6], data[7]]) as u32);
    result.height = Some(u16::from_le_bytes([data[8], data[9]]) as u32);
    result.bit_depth = Some(8);

    result
}

// ---------------------------------------------------------------------------
// WebP: RIFF header (12) + first chunk. VP8X carries the canvas size, VP8 the
// keyframe size, VP8L a bit-packed size after the 0x2F signature.
// ---------------------------------------------------------------------------

fn probe_webp(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::WebP);
    result.bytes_examined = data.len().min(30);

    if data.len() < 16 {
        return result;
    }

    match &data[12..16] {
        b"VP8X" if data.len() >= 30 => {
            let canvas_w = u32::from_le_bytes([data[24], data[25], data[26], 0]);
            let canvas_h = u32::from_le_bytes([data[27], data[28], data[29], 0]);
            result.width = Some(canvas_w + 1);
            result.height = Some(canvas_h + 1);
            result.has_alpha = Some(data[20] & 0x10 != 0);
            result.bit_depth = Some(8);
        }
        b"VP8 " if data.len() >= 30 && data[23..26] == [0x9D, 0x01, 0x2A] => {
            result.width = Some((u16::from_le_bytes([data[26], data[27]]) & 0x3FFF) as u32);
            result.height = Some((u16::from_le_bytes([data[28], data[29]]) & 0x3FFF) as u32);
            result.has_alpha = Some(false);
            result.bit_depth = Some(8);
        }
        b"VP8L" if data.len() >= 25 && data[20] == 0x2F => {
            let bits = u32::from_le_bytes([data[21], data[22], data[23], data[24]]);
            result.width = Some((bits & 0x3FFF) + 1);
            result.height = Some(((bits >> 14) & 0x3FFF) + 1);
            result.has_alpha = Some(bits & (1 << 28) != 0);
            result.bit_depth = Some(8);
        }
        _ => {}
    }

    result
}

// ---------------------------------------------------------------------------
// JPEG: walk marker segments until a SOFn segment, stop at SOS/EOI.
// ---------------------------------------------------------------------------

fn probe_jpeg(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Jpeg);
    result.has_alpha = Some(false);

    if data.len() < 4 {
        result.bytes_examined = data.len();
        return result;
    }

    // Skip SOI marker (FF D8)
    let mut pos = 2;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            break;
        }

        // Fill bytes
        while pos + 1 < data.len() && data[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= data.len() {
            break;
        }

        let marker = data[pos + 1];
        pos += 2;

        // Standalone markers
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        // SOS, EOI
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        if pos + 2 > data.len() {
            break;
        }

        let seg_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;

        // SOF0-SOF15 except DHT (C4), JPG (C8) and DAC (CC)
        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // length (2) + precision (1) + height (2) + width (2) + components (1)
            if pos + 7 < data.len() {
                result.bit_depth = Some(data[pos + 2]);
                result.height = Some(u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32);
                result.width = Some(u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32);
                result.bytes_examined = pos + 8;
                return result;
            }
            break;
        }

        if seg_len < 2 {
            break;
        }
        pos += seg_len;
    }

    result.bytes_examined = pos.min(data.len());
    result
}

// ---------------------------------------------------------------------------
// BMP: 14-byte file header + DIB header. BITMAPCOREHEADER (12 bytes) stores
// u16 dimensions, later headers i32. Negative height means top-down rows.
// ---------------------------------------------------------------------------

fn probe_bmp(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Bmp);
    result.bytes_examined = data.len().min(30);

    if data.len() < 18 {
        return result;
    }

    let dib_len = u32::from_le_bytes([data[14], data[15], data[16], data[17]]);
    if dib_len == 12 {
        if data.len() < 26 {
            return result;
        }
        result.width = Some(u16::from_le_bytes([data[18], data[19]]) as u32);
        result.height = Some(u16::from_le_bytes([data[20], data[21]]) as u32);
        let bpp = u16::from_le_bytes([data[24], data[25]]);
        result.has_alpha = Some(false);
        result.bit_depth = Some(bpp.min(8) as u8);
    } else if dib_len >= 40 && data.len() >= 30 {
        let width = i32::from_le_bytes([data[18], data[19], data[20], data[21]]);
        let height = i32::from_le_bytes([data[22], data[23], data[24], data[25]]);
        let bpp = u16::from_le_bytes([data[28], data[29]]);
        result.width = Some(width.unsigned_abs());
        result.height = Some(height.unsigned_abs());
        result.has_alpha = Some(bpp == 32);
        result.bit_depth = Some(bpp.min(8) as u8);
    }

    result
}

// ---------------------------------------------------------------------------
// QOI: "qoif" + u32 BE width + u32 BE height + channels + colorspace
// ---------------------------------------------------------------------------

fn probe_qoi(data: &[u8]) -> ProbeResult {
    let mut result = ProbeResult::empty(ImageFormat::Qoi);
    result.bytes_examined = data.len().min(14);

    if data.len() < 14 {
        return result;
    }

    result.width = Some(u32::from_be_bytes([data[4], data[5], data[6], data[7]]));
    result.height = Some(u32::from_be_bytes([data[8], data[9], data[10], data[11]]));
    result.has_alpha = Some(data[12] == 4);
    result.bit_depth = Some(8);

    result
}
