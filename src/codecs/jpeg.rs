//! JPEG codec adapter using zenjpeg.
//!
//! zenjpeg decodes whole frames only, so streaming JPEG sessions are buffered.

use rgb::Rgb;
use rgb::ComponentBytes as _;

use crate::pixel::Components;
use crate::{AdapterConfig, AdapterError, DecodedImage, ImageFormat, Limits};

/// Build a zenjpeg Decoder from limits.
fn build_decoder(limits: &Limits) -> zenjpeg::decoder::Decoder {
    let mut decoder = zenjpeg::decoder::Decoder::new();
    if let Some(max_px) = limits.max_pixels {
        decoder = decoder.max_pixels(max_px);
    }
    if let Some(max_mem) = limits.max_memory_bytes {
        decoder = decoder.max_memory(max_mem);
    }
    decoder
}

/// Decode JPEG to RGB samples.
pub(crate) fn decode(data: &[u8], config: &AdapterConfig) -> Result<DecodedImage, AdapterError> {
    let decoder = build_decoder(&config.limits);

    let result = decoder
        .decode(data, enough::Unstoppable)
        .map_err(|e| AdapterError::decode(Some(ImageFormat::Jpeg), e))?;

    let width = result.width();
    let height = result.height();

    // zenjpeg checks pixel count and memory, not individual dimensions
    config.limits.check_decode(width, height, 3)?;

    let raw_pixels = result.pixels_u8().ok_or_else(|| {
        AdapterError::decode(Some(ImageFormat::Jpeg), "no pixel data in decoded image")
    })?;
    let rgb_pixels: &[Rgb<u8>] = bytemuck::try_cast_slice(raw_pixels).map_err(|_| {
        AdapterError::decode(Some(ImageFormat::Jpeg), "decoded samples are not RGB triples")
    })?;

    DecodedImage::from_library(
        rgb_pixels.as_bytes().to_vec(),
        width,
        height,
        Components::Rgb,
        Some(ImageFormat::Jpeg),
        config,
    )
}

/// Encode RGB samples to JPEG at `quality` (1-100).
pub(crate) fn encode_rgb8(
    samples: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, AdapterError> {
    let config = zenjpeg::encoder::EncoderConfig::ycbcr(
        quality.clamp(1, 100),
        zenjpeg::encoder::ChromaSubsampling::Quarter,
    );

    config
        .request()
        .encode_bytes(samples, width, height, zenjpeg::encoder::PixelLayout::Rgb8Srgb)
        .map_err(|e| AdapterError::encode(ImageFormat::Jpeg, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                out.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, 128]);
            }
        }
        out
    }

    #[test]
    fn encode_decode_stays_close() {
        let source = gradient(32, 24);
        let jpeg = encode_rgb8(&source, 32, 24, 95).unwrap();
        assert_eq!(ImageFormat::detect(&jpeg), Some(ImageFormat::Jpeg));

        let image = decode(&jpeg, &AdapterConfig::default()).unwrap();
        assert_eq!((image.width(), image.height()), (32, 24));
        assert_eq!(image.components(), Components::Rgb);

        let total: u64 = source
            .iter()
            .zip(image.pixels())
            .map(|(a, b)| u64::from(a.abs_diff(*b)))
            .sum();
        assert!(total / source.len() as u64 <= 8);
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = decode(&[0xFF, 0xD8, 0xFF, 0x00, 1, 2, 3], &AdapterConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Decode);
    }
}
