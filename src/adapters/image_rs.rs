//! Binding over the `image` crate.
//!
//! The toolkit decodes whole images, so sessions are buffered. Deep images
//! (16-bit, float) are reduced to 8-bit samples.

use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageError, ImageReader};

use crate::adapter::{ImageAdapter, ScanlineSession, save_format, write_atomically};
use crate::config::PngCompression;
use crate::pixel::{Components, encodable_layout};
use crate::session::BufferedSession;
use crate::{AdapterConfig, AdapterError, DecodedImage, ImageFormat, ImageView};

const SAVERS: &str = "png,jpg,jpeg,gif,bmp,tif,tiff,webp,tga,ico,qoi";

/// Map to the toolkit's format enum.
fn to_image_format(format: ImageFormat) -> Option<image::ImageFormat> {
    Some(match format {
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Bmp => image::ImageFormat::Bmp,
        ImageFormat::Tiff => image::ImageFormat::Tiff,
        ImageFormat::WebP => image::ImageFormat::WebP,
        ImageFormat::Tga => image::ImageFormat::Tga,
        ImageFormat::Ico => image::ImageFormat::Ico,
        ImageFormat::Qoi => image::ImageFormat::Qoi,
        ImageFormat::Pnm => image::ImageFormat::Pnm,
    })
}

fn from_image_format(format: image::ImageFormat) -> Option<ImageFormat> {
    match format {
        image::ImageFormat::Png => Some(ImageFormat::Png),
        image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
        image::ImageFormat::Gif => Some(ImageFormat::Gif),
        image::ImageFormat::Bmp => Some(ImageFormat::Bmp),
        image::ImageFormat::Tiff => Some(ImageFormat::Tiff),
        image::ImageFormat::WebP => Some(ImageFormat::WebP),
        image::ImageFormat::Tga => Some(ImageFormat::Tga),
        image::ImageFormat::Ico => Some(ImageFormat::Ico),
        image::ImageFormat::Qoi => Some(ImageFormat::Qoi),
        image::ImageFormat::Pnm => Some(ImageFormat::Pnm),
        _ => None,
    }
}

/// Layouts each encoder accepts without erroring.
fn encoder_layouts(format: ImageFormat) -> &'static [Components] {
    use Components::*;
    match format {
        ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tga => &[Gray, GrayAlpha, Rgb, Rgba],
        ImageFormat::Jpeg => &[Gray, Rgb],
        ImageFormat::Tiff => &[Gray, Rgb, Rgba],
        ImageFormat::Gif | ImageFormat::WebP | ImageFormat::Qoi => &[Rgb, Rgba],
        ImageFormat::Ico => &[Rgba],
        ImageFormat::Pnm => &[],
    }
}

fn color_type(components: Components) -> ExtendedColorType {
    match components {
        Components::Gray => ExtendedColorType::L8,
        Components::GrayAlpha => ExtendedColorType::La8,
        Components::Rgb => ExtendedColorType::Rgb8,
        Components::Rgba => ExtendedColorType::Rgba8,
    }
}

fn decode_error(format: Option<ImageFormat>, path: Option<&Path>, e: ImageError) -> AdapterError {
    match (e, path) {
        (ImageError::Limits(e), _) => AdapterError::decode_limit(e.to_string()),
        (ImageError::IoError(e), Some(path)) => AdapterError::read_io(path, e),
        (ImageError::Unsupported(e), _) if format.is_none() => {
            log::debug!("image-rs: {e}");
            AdapterError::UnrecognizedFormat
        }
        (e, _) => AdapterError::decode(format, e),
    }
}

/// Adapter over the `image` crate toolkit.
#[derive(Clone, Debug, Default)]
pub struct ImageRsAdapter {
    config: AdapterConfig,
}

impl ImageRsAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Decode an in-memory file.
    pub fn load_from_memory(&self, data: &[u8]) -> Result<DecodedImage, AdapterError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AdapterError::decode(None, e))?;
        self.decode(reader, None)
    }

    fn image_limits(&self) -> image::Limits {
        let limits = &self.config.limits;
        let mut out = image::Limits::no_limits();
        out.max_image_width = limits.max_width.map(|w| u32::try_from(w).unwrap_or(u32::MAX));
        out.max_image_height = limits.max_height.map(|h| u32::try_from(h).unwrap_or(u32::MAX));
        out.max_alloc = limits.max_memory_bytes;
        out
    }

    fn decode<R: BufRead + Seek>(
        &self,
        mut reader: ImageReader<R>,
        path: Option<&Path>,
    ) -> Result<DecodedImage, AdapterError> {
        let Some(format) = reader.format() else {
            return Err(AdapterError::UnrecognizedFormat);
        };
        let format = from_image_format(format);
        reader.limits(self.image_limits());

        let img = reader
            .decode()
            .map_err(|e| decode_error(format, path, e))?;
        self.finish(img, format)
    }

    fn finish(
        &self,
        img: DynamicImage,
        format: Option<ImageFormat>,
    ) -> Result<DecodedImage, AdapterError> {
        let (width, height) = img.dimensions();
        let color = img.color();
        let components = Components::from_flags(color.has_color(), color.has_alpha());
        self.config.limits.check_decode(width, height, components.count())?;

        if usize::from(color.bytes_per_pixel()) != components.count() {
            log::debug!("image-rs: reducing {color:?} to 8-bit {components:?}");
        }
        let pixels = match components {
            Components::Gray => img.into_luma8().into_raw(),
            Components::GrayAlpha => img.into_luma_alpha8().into_raw(),
            Components::Rgb => img.into_rgb8().into_raw(),
            Components::Rgba => img.into_rgba8().into_raw(),
        };

        DecodedImage::from_library(pixels, width, height, components, format, &self.config)
    }

    fn encode<W: std::io::Write + Seek>(
        &self,
        w: &mut W,
        samples: &[u8],
        view: &ImageView<'_>,
        layout: Components,
        format: ImageFormat,
    ) -> Result<(), AdapterError> {
        let target = to_image_format(format).ok_or(AdapterError::UnsupportedFormat(format))?;
        let (width, height) = (view.width(), view.height());
        let color = color_type(layout);

        let result = match format {
            ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut *w, self.config.jpeg_quality)
                .write_image(samples, width, height, color),
            ImageFormat::Png => {
                let compression = match self.config.png_compression {
                    PngCompression::Fast => CompressionType::Fast,
                    PngCompression::Default => CompressionType::Default,
                    PngCompression::Best => CompressionType::Best,
                };
                PngEncoder::new_with_quality(&mut *w, compression, FilterType::Adaptive)
                    .write_image(samples, width, height, color)
            }
            _ => image::write_buffer_with_format(w, samples, width, height, color, target),
        };
        result.map_err(|e| AdapterError::encode(format, e))
    }
}

impl ImageAdapter for ImageRsAdapter {
    fn name(&self) -> &'static str {
        "image-rs"
    }

    fn identify(&self, path: &Path, header: &[u8]) -> bool {
        super::sniff(path, header)
            .and_then(to_image_format)
            .is_some_and(|f| f.reading_enabled())
    }

    fn load(&self, path: &Path) -> Result<DecodedImage, AdapterError> {
        log::debug!("image-rs: loading {}", path.display());
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| AdapterError::read_io(path, e))?;
        self.decode(reader, Some(path))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ScanlineSession>, AdapterError> {
        Ok(Box::new(BufferedSession::new(self.load(path)?)))
    }

    fn save(&self, path: &Path, image: &ImageView<'_>, ext: &str) -> Result<(), AdapterError> {
        let format = save_format(self, ext)?;
        self.config
            .limits
            .check_encode(image.width(), image.height(), image.components().count())?;

        let layout = encodable_layout(image.components(), encoder_layouts(format)).ok_or(
            AdapterError::UnsupportedComponents {
                format,
                components: image.components(),
            },
        )?;
        if layout != image.components() {
            log::warn!(
                "image-rs: {format:?} cannot store {:?}, writing {layout:?}",
                image.components()
            );
        }
        let samples = image.to_library(layout, &self.config)?;

        log::debug!(
            "image-rs: saving {}x{} {layout:?} to {} as {format:?}",
            image.width(),
            image.height(),
            path.display()
        );
        write_atomically(path, |w| self.encode(w, &samples, image, layout, format))
    }

    fn savers(&self) -> &'static str {
        SAVERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_saver_has_a_layout() {
        let adapter = ImageRsAdapter::new();
        for info in adapter.saver_info() {
            assert!(!encoder_layouts(info.format).is_empty(), "{:?}", info.format);
            assert!(to_image_format(info.format).is_some_and(|f| f.writing_enabled()));
        }
    }

    #[test]
    fn format_maps_agree() {
        for format in ImageFormat::ALL {
            let mapped = to_image_format(format).and_then(from_image_format);
            assert_eq!(mapped, Some(format));
        }
    }

    #[test]
    fn memory_decode_reports_layout() {
        let mut png = Vec::new();
        let pixels = [10u8, 20, 30, 40, 50, 60];
        PngEncoder::new(&mut png)
            .write_image(&pixels, 2, 1, ExtendedColorType::Rgb8)
            .unwrap();

        let image = ImageRsAdapter::new().load_from_memory(&png).unwrap();
        assert_eq!(image.components(), Components::Rgb);
        assert_eq!(image.format(), Some(ImageFormat::Png));
        assert_eq!(image.pixels(), &pixels);
    }

    #[test]
    fn unknown_bytes_are_unrecognized() {
        assert!(matches!(
            ImageRsAdapter::new().load_from_memory(b"definitely not an image"),
            Err(AdapterError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn width_limit_applies() {
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&[0u8; 64], 64, 1, ExtendedColorType::L8)
            .unwrap();
        let adapter = ImageRsAdapter::with_config(AdapterConfig::default().with_limits(crate::Limits {
            max_width: Some(16),
            ..crate::Limits::none()
        }));
        assert!(matches!(
            adapter.load_from_memory(&png),
            Err(AdapterError::LimitExceeded { kind: crate::ErrorKind::Decode, .. })
        ));
    }
}
