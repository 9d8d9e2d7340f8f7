//! The adapter contract shared by every binding.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pixel::Components;
use crate::{AdapterError, DecodedImage, ImageFormat, ImageView};

/// One entry of an adapter's saver registration metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaverInfo {
    /// Format written for these extensions.
    pub format: ImageFormat,
    /// Extensions accepted by `save`, preferred one first.
    pub extensions: &'static [&'static str],
    /// Long format name.
    pub full_name: &'static str,
    /// Short description naming the adapter that writes it.
    pub description: String,
}

/// A binding that loads, saves and streams images through a wrapped codec
/// library.
///
/// Implementations hold only configuration, so a single adapter can serve
/// concurrent callers. Every failure is returned as a value.
pub trait ImageAdapter: Send + Sync {
    /// Short binding name (`"native"`, `"image-rs"`).
    fn name(&self) -> &'static str;

    /// Whether this adapter can read the file, judged from the leading
    /// `header` bytes and, when those are inconclusive, the file extension.
    ///
    /// Never fails and never touches any error state.
    fn identify(&self, path: &Path, header: &[u8]) -> bool;

    /// Decode the whole file.
    fn load(&self, path: &Path) -> Result<DecodedImage, AdapterError>;

    /// Begin a streaming decode. Dimensions are available immediately.
    fn open(&self, path: &Path) -> Result<Box<dyn ScanlineSession>, AdapterError>;

    /// Encode `image` into `path` using the format implied by `ext`.
    ///
    /// A failed save leaves no file behind.
    fn save(&self, path: &Path, image: &ImageView<'_>, ext: &str) -> Result<(), AdapterError>;

    /// Comma-separated list of extensions usable with [`save`](Self::save).
    fn savers(&self) -> &'static str;

    /// Structured form of [`savers`](Self::savers).
    fn saver_info(&self) -> Vec<SaverInfo> {
        let mut infos: Vec<SaverInfo> = Vec::new();
        for ext in self.savers().split(',') {
            let Some(format) = ImageFormat::from_extension(ext) else {
                continue;
            };
            if infos.iter().any(|i| i.format == format) {
                continue;
            }
            infos.push(SaverInfo {
                format,
                extensions: format.extensions(),
                full_name: format.full_name(),
                description: format!("{} ({} adapter)", format.full_name(), self.name()),
            });
        }
        infos
    }

    /// Whether `ext` appears in [`savers`](Self::savers).
    fn can_save(&self, ext: &str) -> bool {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        self.savers()
            .split(',')
            .any(|s| s.eq_ignore_ascii_case(ext))
    }
}

/// An in-flight streaming decode bound to one file.
///
/// Sessions own the file handle and decoder state. [`close`](Self::close)
/// consumes the session; dropping it releases the same resources.
pub trait ScanlineSession: Send {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn components(&self) -> Components;

    /// Bytes in one row.
    fn row_bytes(&self) -> usize {
        self.width() as usize * self.components().count()
    }

    /// Decode row `y` into the first [`row_bytes`](Self::row_bytes) bytes of `buf`.
    ///
    /// Out-of-range rows and short buffers fail without disturbing the
    /// session. A decode failure poisons it.
    fn read_line(&mut self, y: u32, buf: &mut [u8]) -> Result<(), AdapterError>;

    /// End the session and release its resources.
    fn close(self: Box<Self>);
}

/// Shared argument checks for [`ScanlineSession::read_line`].
pub(crate) fn check_read_args(
    y: u32,
    height: u32,
    row_bytes: usize,
    buf: &[u8],
) -> Result<(), AdapterError> {
    if y >= height {
        return Err(AdapterError::RowOutOfRange { row: y, height });
    }
    if buf.len() < row_bytes {
        return Err(AdapterError::BufferTooSmall {
            needed: row_bytes,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Normalize a requested save extension and resolve its format.
pub(crate) fn save_format(adapter: &dyn ImageAdapter, ext: &str) -> Result<ImageFormat, AdapterError> {
    let trimmed = ext.strip_prefix('.').unwrap_or(ext);
    if !adapter.can_save(trimmed) {
        return Err(AdapterError::NoSaver(trimmed.to_ascii_lowercase()));
    }
    ImageFormat::from_extension(trimmed).ok_or_else(|| AdapterError::NoSaver(trimmed.to_ascii_lowercase()))
}

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `path` that encoders write into before the rename.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{}-{n}.tmp", std::process::id()))
}

/// Encode into a temporary sibling of `path` and rename it over `path` once
/// everything is flushed.
///
/// On failure the temporary file is removed and whatever was at `path`
/// before is left untouched.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<(), AdapterError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), AdapterError>,
{
    let temp = temp_sibling(path);
    let file = File::create(&temp).map_err(|e| AdapterError::write_io(path, e))?;
    let mut writer = BufWriter::new(file);

    let result = write(&mut writer)
        .and_then(|()| {
            let file = writer
                .into_inner()
                .map_err(|e| AdapterError::write_io(path, e.into_error()))?;
            file.sync_all().map_err(|e| AdapterError::write_io(path, e))
        })
        .and_then(|()| std::fs::rename(&temp, path).map_err(|e| AdapterError::write_io(path, e)));

    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&temp) {
            log::warn!("could not remove partial output {}: {e}", temp.display());
        }
    }
    result
}
