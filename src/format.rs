//! Image format detection and metadata.

/// Image formats the adapters know how to name.
///
/// Knowing a format does not mean an adapter can read or write it; see
/// [`ImageAdapter::identify`](crate::ImageAdapter::identify) and
/// [`ImageAdapter::savers`](crate::ImageAdapter::savers).
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
    Tga,
    Ico,
    Qoi,
    Pnm,
}

impl ImageFormat {
    /// Every known format, in detection order.
    pub const ALL: [ImageFormat; 10] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::WebP,
        ImageFormat::Tga,
        ImageFormat::Ico,
        ImageFormat::Qoi,
        ImageFormat::Pnm,
    ];

    /// Detect format from magic bytes. Returns None if unrecognized.
    ///
    /// TGA has no signature and is never detected here.
    pub fn detect(data: &[u8]) -> Option<Self> {
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }

        // GIF: "GIF87a" or "GIF89a"
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }

        // WebP: "RIFF....WEBP"
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        // TIFF: "II*\0" or "MM\0*"
        if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
            return Some(ImageFormat::Tiff);
        }

        // QOI: "qoif"
        if data.starts_with(b"qoif") {
            return Some(ImageFormat::Qoi);
        }

        // BMP: "BM" followed by a 14-byte file header
        if data.len() >= 14 && data.starts_with(b"BM") {
            return Some(ImageFormat::Bmp);
        }

        // ICO: reserved 0, type 1, non-zero image count
        if data.len() >= 6
            && data[0..4] == [0, 0, 1, 0]
            && u16::from_le_bytes([data[4], data[5]]) > 0
        {
            return Some(ImageFormat::Ico);
        }

        // PNM: P1..P7 followed by whitespace
        if data.len() >= 3
            && data[0] == b'P'
            && (b'1'..=b'7').contains(&data[1])
            && data[2].is_ascii_whitespace()
        {
            return Some(ImageFormat::Pnm);
        }

        None
    }

    /// Longest signature [`detect`](Self::detect) inspects.
    pub const fn max_signature_len() -> usize {
        14
    }

    /// Detect format from file extension (case-insensitive, leading dot allowed).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "bmp" | "dib" => Some(ImageFormat::Bmp),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            "tga" | "icb" | "vda" | "vst" => Some(ImageFormat::Tga),
            "ico" => Some(ImageFormat::Ico),
            "qoi" => Some(ImageFormat::Qoi),
            "pbm" | "pgm" | "ppm" | "pam" | "pnm" => Some(ImageFormat::Pnm),
            _ => None,
        }
    }

    /// Detect format from the extension of a path.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Tga => "image/x-tga",
            ImageFormat::Ico => "image/x-icon",
            ImageFormat::Qoi => "image/qoi",
            ImageFormat::Pnm => "image/x-portable-anymap",
        }
    }

    /// Common file extensions, preferred one first.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ImageFormat::Png => &["png"],
            ImageFormat::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            ImageFormat::Gif => &["gif"],
            ImageFormat::Bmp => &["bmp", "dib"],
            ImageFormat::Tiff => &["tif", "tiff"],
            ImageFormat::WebP => &["webp"],
            ImageFormat::Tga => &["tga", "icb", "vda", "vst"],
            ImageFormat::Ico => &["ico"],
            ImageFormat::Qoi => &["qoi"],
            ImageFormat::Pnm => &["pnm", "pbm", "pgm", "ppm", "pam"],
        }
    }

    /// Human-readable name used in saver descriptions.
    pub fn full_name(self) -> &'static str {
        match self {
            ImageFormat::Png => "Portable Network Graphics",
            ImageFormat::Jpeg => "JPEG File Interchange Format",
            ImageFormat::Gif => "Graphics Interchange Format",
            ImageFormat::Bmp => "Windows Bitmap",
            ImageFormat::Tiff => "Tagged Image File Format",
            ImageFormat::WebP => "WebP",
            ImageFormat::Tga => "Truevision Targa",
            ImageFormat::Ico => "Windows Icon",
            ImageFormat::Qoi => "Quite OK Image",
            ImageFormat::Pnm => "Portable Anymap",
        }
    }

    /// Whether saving to this format discards information.
    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }

    /// Whether this format supports an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_jpeg() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert_eq!(ImageFormat::detect(&data), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn detect_png() {
        let data = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
        ];
        assert_eq!(ImageFormat::detect(&data), Some(ImageFormat::Png));
    }

    #[test]
    fn detect_gif() {
        let data = b"GIF89a\x00\x00\x00\x00\x00\x00";
        assert_eq!(ImageFormat::detect(data), Some(ImageFormat::Gif));
    }

    #[test]
    fn detect_webp() {
        let data = b"RIFF\x00\x00\x00\x00WEBP";
        assert_eq!(ImageFormat::detect(data), Some(ImageFormat::WebP));
    }

    #[test]
    fn detect_bmp_needs_full_file_header() {
        assert_eq!(ImageFormat::detect(b"BM\x00\x00"), None);
        let data = b"BM\x46\x00\x00\x00\x00\x00\x00\x00\x36\x00\x00\x00";
        assert_eq!(ImageFormat::detect(data), Some(ImageFormat::Bmp));
    }

    #[test]
    fn detect_pnm_and_tiff() {
        assert_eq!(ImageFormat::detect(b"P6\n4 4\n255\n"), Some(ImageFormat::Pnm));
        assert_eq!(ImageFormat::detect(b"II*\0\x08\0\0\0"), Some(ImageFormat::Tiff));
        assert_eq!(ImageFormat::detect(b"MM\0*\0\0\0\x08"), Some(ImageFormat::Tiff));
    }

    #[test]
    fn detect_too_short() {
        let data = [0xFF, 0xD8];
        assert_eq!(ImageFormat::detect(&data), None);
        assert_eq!(ImageFormat::detect(&[]), None);
    }

    #[test]
    fn text_is_not_an_image() {
        assert_eq!(ImageFormat::detect(b"hello, world"), None);
        assert_eq!(ImageFormat::detect(b"Plain text"), None);
    }

    #[test]
    fn from_extension_case_insensitive() {
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension(".png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("TiFf"), Some(ImageFormat::Tiff));
        assert_eq!(ImageFormat::from_extension("unknown"), None);
    }

    #[test]
    fn every_extension_maps_back() {
        for format in ImageFormat::ALL {
            for ext in format.extensions() {
                assert_eq!(ImageFormat::from_extension(ext), Some(format), "{ext}");
            }
        }
    }
}
