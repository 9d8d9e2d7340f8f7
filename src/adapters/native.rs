//! Binding over format-specific codec crates.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::adapter::{ImageAdapter, ScanlineSession, save_format, write_atomically};
use crate::codecs;
use crate::pixel::{Components, encodable_layout};
use crate::session::BufferedSession;
use crate::{AdapterConfig, AdapterError, DecodedImage, ImageFormat, ImageView};

#[cfg(feature = "jpeg")]
const SAVERS: &str = "png,jpg,jpeg";
#[cfg(not(feature = "jpeg"))]
const SAVERS: &str = "png";

const ALL_LAYOUTS: [Components; 4] = [
    Components::Gray,
    Components::GrayAlpha,
    Components::Rgb,
    Components::Rgba,
];

/// Adapter over the png crate (and zenjpeg with the `jpeg` feature).
///
/// PNG sessions decode one row per [`read_line`](ScanlineSession::read_line)
/// call instead of holding the whole image.
#[derive(Clone, Debug, Default)]
pub struct NativeAdapter {
    config: AdapterConfig,
}

impl NativeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn reads(format: ImageFormat) -> bool {
        match format {
            ImageFormat::Png => true,
            ImageFormat::Jpeg => cfg!(feature = "jpeg"),
            _ => false,
        }
    }

    /// Decode an in-memory file.
    pub fn load_from_memory(&self, data: &[u8]) -> Result<DecodedImage, AdapterError> {
        let format = ImageFormat::detect(data).ok_or(AdapterError::UnrecognizedFormat)?;
        self.decode_bytes(data, format)
    }

    fn decode_bytes(&self, data: &[u8], format: ImageFormat) -> Result<DecodedImage, AdapterError> {
        match format {
            ImageFormat::Png => codecs::png::decode(data, &self.config),
            #[cfg(feature = "jpeg")]
            ImageFormat::Jpeg => codecs::jpeg::decode(data, &self.config),
            other => Err(AdapterError::UnsupportedFormat(other)),
        }
    }

    /// Format of `path` judged from its leading bytes, falling back to the
    /// extension.
    fn format_of(&self, path: &Path) -> Result<ImageFormat, AdapterError> {
        let header = crate::probe::read_header(path)?;
        let format = super::sniff(path, &header).ok_or(AdapterError::UnrecognizedFormat)?;
        if Self::reads(format) {
            Ok(format)
        } else {
            Err(AdapterError::UnsupportedFormat(format))
        }
    }
}

impl ImageAdapter for NativeAdapter {
    fn name(&self) -> &'static str {
        "native"
    }

    fn identify(&self, path: &Path, header: &[u8]) -> bool {
        super::sniff(path, header).is_some_and(Self::reads)
    }

    fn load(&self, path: &Path) -> Result<DecodedImage, AdapterError> {
        let format = self.format_of(path)?;
        log::debug!("native: loading {} as {format:?}", path.display());
        match format {
            ImageFormat::Png => {
                let file = File::open(path).map_err(|e| AdapterError::read_io(path, e))?;
                codecs::png::decode(BufReader::new(file), &self.config)
            }
            _ => {
                let data = std::fs::read(path).map_err(|e| AdapterError::read_io(path, e))?;
                self.decode_bytes(&data, format)
            }
        }
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ScanlineSession>, AdapterError> {
        match self.format_of(path)? {
            ImageFormat::Png => codecs::png::open(path, &self.config),
            _ => Ok(Box::new(BufferedSession::new(self.load(path)?))),
        }
    }

    fn save(&self, path: &Path, image: &ImageView<'_>, ext: &str) -> Result<(), AdapterError> {
        let format = save_format(self, ext)?;
        self.config
            .limits
            .check_encode(image.width(), image.height(), image.components().count())?;

        let supported: &[Components] = match format {
            ImageFormat::Jpeg => &[Components::Rgb],
            _ => &ALL_LAYOUTS,
        };
        let layout = encodable_layout(image.components(), supported).ok_or(
            AdapterError::UnsupportedComponents {
                format,
                components: image.components(),
            },
        )?;
        if layout != image.components() {
            log::warn!(
                "native: {format:?} cannot store {:?}, writing {layout:?}",
                image.components()
            );
        }
        let samples = image.to_library(layout, &self.config)?;

        log::debug!(
            "native: saving {}x{} {layout:?} to {} as {format:?}",
            image.width(),
            image.height(),
            path.display()
        );
        write_atomically(path, |w| match format {
            ImageFormat::Png => codecs::png::encode(
                w,
                &samples,
                image.width(),
                image.height(),
                layout,
                self.config.png_compression,
            ),
            #[cfg(feature = "jpeg")]
            ImageFormat::Jpeg => {
                let data = codecs::jpeg::encode_rgb8(
                    &samples,
                    image.width(),
                    image.height(),
                    self.config.jpeg_quality,
                )?;
                std::io::Write::write_all(w, &data).map_err(|e| AdapterError::write_io(path, e))
            }
            other => Err(AdapterError::NoSaver(other.extensions()[0].to_string())),
        })
    }

    fn savers(&self) -> &'static str {
        SAVERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("zenadapters-native-{}-{name}", std::process::id()))
    }

    #[test]
    fn identifies_png_only_by_default_set() {
        let adapter = NativeAdapter::new();
        assert!(adapter.identify(Path::new("x.bin"), b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
        assert!(!adapter.identify(Path::new("x.gif"), b"GIF89a\x01\0\x01\0\0\0\0\0"));
        assert!(!adapter.identify(Path::new("x.txt"), b""));
    }

    #[test]
    fn save_then_stream_rows() {
        let path = temp_path("stream.png");
        let pixels: Vec<u8> = (0..4 * 3 * 4).map(|i| (i * 5) as u8).collect();
        let view = ImageView::new(&pixels, 4, 3, Components::Rgba).unwrap();

        let adapter = NativeAdapter::new();
        adapter.save(&path, &view, "png").unwrap();

        let mut session = adapter.open(&path).unwrap();
        assert_eq!((session.width(), session.height()), (4, 3));
        let mut row = vec![0u8; session.row_bytes()];
        session.read_line(2, &mut row).unwrap();
        assert_eq!(row, &pixels[32..48]);
        // behind the cursor: the file is reopened
        session.read_line(0, &mut row).unwrap();
        assert_eq!(row, &pixels[..16]);
        session.close();

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unknown_extension_has_no_saver() {
        let pixels = [0u8; 3];
        let view = ImageView::new(&pixels, 1, 1, Components::Rgb).unwrap();
        let path = temp_path("nosaver.xyz");
        assert!(matches!(
            NativeAdapter::new().save(&path, &view, "xyz"),
            Err(AdapterError::NoSaver(_))
        ));
        assert!(!path.exists());
    }
}
