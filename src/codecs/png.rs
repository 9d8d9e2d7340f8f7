//! PNG codec adapter using the png crate.
//!
//! Decoding normalizes every PNG to 8-bit samples: palettes and low bit
//! depths are expanded, 16-bit samples are stripped, tRNS becomes an alpha
//! channel. Non-interlaced files stream row by row straight from the file.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::adapter::{ScanlineSession, check_read_args};
use crate::config::PngCompression;
use crate::pixel::{self, ChannelOrder, Components, RowOrder};
use crate::session::BufferedSession;
use crate::{AdapterConfig, AdapterError, DecodedImage, ImageFormat, Limits};

fn decode_err(e: png::DecodingError) -> AdapterError {
    match e {
        png::DecodingError::LimitsExceeded => {
            AdapterError::decode_limit("PNG decoder memory limit")
        }
        other => AdapterError::decode(Some(ImageFormat::Png), other),
    }
}

fn encode_err(e: png::EncodingError) -> AdapterError {
    AdapterError::encode(ImageFormat::Png, e)
}

/// Read the header and configure 8-bit normalized output.
fn read_info<R: Read>(source: R, limits: &Limits) -> Result<(png::Reader<R>, Components), AdapterError> {
    let mut decoder = match limits.max_memory_bytes {
        Some(bytes) => png::Decoder::new_with_limits(
            source,
            png::Limits {
                bytes: usize::try_from(bytes).unwrap_or(usize::MAX),
            },
        ),
        None => png::Decoder::new(source),
    };
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let reader = decoder.read_info().map_err(decode_err)?;
    let (color_type, _) = reader.output_color_type();
    let components = match color_type {
        png::ColorType::Grayscale => Components::Gray,
        png::ColorType::GrayscaleAlpha => Components::GrayAlpha,
        png::ColorType::Rgb => Components::Rgb,
        png::ColorType::Rgba => Components::Rgba,
        png::ColorType::Indexed => {
            return Err(AdapterError::decode(
                Some(ImageFormat::Png),
                "palette was not expanded",
            ));
        }
    };

    let info = reader.info();
    limits.check_decode(info.width, info.height, components.count())?;

    Ok((reader, components))
}

/// Decode every row of an already configured reader.
fn decode_frame<R: Read>(
    mut reader: png::Reader<R>,
    components: Components,
    config: &AdapterConfig,
) -> Result<DecodedImage, AdapterError> {
    let (width, height) = (reader.info().width, reader.info().height);

    let mut pixels = vec![0u8; reader.output_buffer_size()];
    let output_info = reader.next_frame(&mut pixels).map_err(decode_err)?;
    pixels.truncate(output_info.buffer_size());

    DecodedImage::from_library(pixels, width, height, components, Some(ImageFormat::Png), config)
}

/// Decode a whole PNG stream.
pub(crate) fn decode<R: Read>(source: R, config: &AdapterConfig) -> Result<DecodedImage, AdapterError> {
    let (reader, components) = read_info(source, &config.limits)?;
    decode_frame(reader, components, config)
}

/// How [`open`] serves a file.
enum Opened {
    Buffered(DecodedImage),
    Streaming(PngStream),
}

/// Begin a streaming decode of `path`.
///
/// Interlaced files only produce final rows after the last pass, and a
/// bottom-up session asks for the last source row first, so both are decoded
/// up front and served from memory.
pub(crate) fn open(path: &Path, config: &AdapterConfig) -> Result<Box<dyn ScanlineSession>, AdapterError> {
    Ok(match start(path, config)? {
        Opened::Buffered(image) => Box::new(BufferedSession::new(image)),
        Opened::Streaming(stream) => Box::new(stream),
    })
}

fn start(path: &Path, config: &AdapterConfig) -> Result<Opened, AdapterError> {
    let file = File::open(path).map_err(|e| AdapterError::read_io(path, e))?;
    let (reader, components) = read_info(BufReader::new(file), &config.limits)?;

    if reader.info().interlaced || config.row_order == RowOrder::BottomUp {
        log::debug!("{}: decoding up front", path.display());
        return decode_frame(reader, components, config).map(Opened::Buffered);
    }

    Ok(Opened::Streaming(PngStream {
        path: path.to_path_buf(),
        config: config.clone(),
        width: reader.info().width,
        height: reader.info().height,
        components,
        reader: Some(reader),
        next_row: 0,
        rewinds: 0,
        poisoned: false,
    }))
}

/// Row-at-a-time decode of a non-interlaced PNG file.
///
/// Rows at or past the cursor are reached by decoding forward; a row behind
/// the cursor reopens the file and starts over.
struct PngStream {
    path: PathBuf,
    config: AdapterConfig,
    width: u32,
    height: u32,
    components: Components,
    reader: Option<png::Reader<BufReader<File>>>,
    /// Source (top-down) index of the next row the decoder will produce.
    next_row: u32,
    /// Times the file was reopened to reach an earlier row.
    rewinds: u32,
    poisoned: bool,
}

impl PngStream {
    fn rewind(&mut self) -> Result<(), AdapterError> {
        log::debug!("rewinding {} to serve an earlier row", self.path.display());
        self.reader = None;
        let file = File::open(&self.path).map_err(|e| AdapterError::read_io(&self.path, e))?;
        let (reader, components) = read_info(BufReader::new(file), &self.config.limits)?;
        let info = reader.info();
        if (info.width, info.height, components) != (self.width, self.height, self.components) {
            return Err(AdapterError::decode(
                Some(ImageFormat::Png),
                "file changed while a streaming session was open",
            ));
        }
        self.reader = Some(reader);
        self.next_row = 0;
        self.rewinds += 1;
        Ok(())
    }

    fn decode_to(&mut self, target: u32, out: &mut [u8]) -> Result<(), AdapterError> {
        if target < self.next_row || self.reader.is_none() {
            self.rewind()?;
        }
        let reader = self
            .reader
            .as_mut()
            .ok_or(AdapterError::SessionPoisoned)?;

        while self.next_row <= target {
            let row = reader.next_row().map_err(decode_err)?.ok_or_else(|| {
                AdapterError::decode(Some(ImageFormat::Png), "image data ended early")
            })?;
            if self.next_row == target {
                let data = row.data();
                if data.len() < out.len() {
                    return Err(AdapterError::decode(
                        Some(ImageFormat::Png),
                        "decoded row shorter than expected",
                    ));
                }
                out.copy_from_slice(&data[..out.len()]);
            }
            self.next_row += 1;
        }
        Ok(())
    }
}

impl ScanlineSession for PngStream {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn components(&self) -> Components {
        self.components
    }

    fn read_line(&mut self, y: u32, buf: &mut [u8]) -> Result<(), AdapterError> {
        let row_bytes = self.row_bytes();
        check_read_args(y, self.height, row_bytes, buf)?;
        if self.poisoned {
            return Err(AdapterError::SessionPoisoned);
        }

        let source_row = self.config.row_order.source_row(y, self.height);
        let out = &mut buf[..row_bytes];
        if let Err(e) = self.decode_to(source_row, out) {
            self.poisoned = true;
            self.reader = None;
            return Err(e);
        }

        if self.config.channel_order == ChannelOrder::Bgr {
            pixel::swap_red_blue(out, self.components)?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) {
        log::debug!(
            "closing PNG stream {} after {} of {} rows, {} rewinds",
            self.path.display(),
            self.next_row,
            self.height,
            self.rewinds
        );
    }
}

/// Encode 8-bit samples as PNG.
pub(crate) fn encode<W: Write>(
    writer: W,
    samples: &[u8],
    width: u32,
    height: u32,
    components: Components,
    compression: PngCompression,
) -> Result<(), AdapterError> {
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(match components {
        Components::Gray => png::ColorType::Grayscale,
        Components::GrayAlpha => png::ColorType::GrayscaleAlpha,
        Components::Rgb => png::ColorType::Rgb,
        Components::Rgba => png::ColorType::Rgba,
    });
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(match compression {
        PngCompression::Fast => png::Compression::Fast,
        PngCompression::Default => png::Compression::Default,
        PngCompression::Best => png::Compression::Best,
    });

    let mut writer = encoder.write_header().map_err(encode_err)?;
    writer.write_image_data(samples).map_err(encode_err)?;
    writer.finish().map_err(encode_err)
}
