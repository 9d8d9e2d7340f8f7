//! Ordered adapter registry with runtime format enablement.

use std::path::Path;

use crate::adapter::{ImageAdapter, SaverInfo, ScanlineSession};
use crate::{AdapterConfig, AdapterError, DecodedImage, ErrorKind, ImageFormat, ImageView};

/// Set of image formats represented as bitflags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FormatSet(u16);

impl FormatSet {
    const EMPTY: Self = FormatSet(0);
    const ALL: Self = FormatSet((1u16 << ImageFormat::ALL.len()) - 1);

    fn bit(format: ImageFormat) -> u16 {
        let index = ImageFormat::ALL
            .iter()
            .position(|&f| f == format)
            .unwrap_or(0);
        1 << index
    }

    fn contains(self, format: ImageFormat) -> bool {
        self.0 & Self::bit(format) != 0
    }

    fn insert(&mut self, format: ImageFormat) {
        self.0 |= Self::bit(format);
    }

    fn remove(&mut self, format: ImageFormat) {
        self.0 &= !Self::bit(format);
    }
}

/// Dispatches identify/load/open/save to the first adapter that handles a
/// file, the way a host library consults its plugins.
///
/// Adapters are tried in registration order. Formats can additionally be
/// disabled per registry, e.g. to refuse decoding a format a deployment does
/// not trust.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn ImageAdapter>>,
    decode_enabled: FormatSet,
    encode_enabled: FormatSet,
}

impl AdapterRegistry {
    /// Every compiled-in binding with default configuration.
    pub fn all() -> Self {
        Self::with_config(AdapterConfig::default())
    }

    /// Every compiled-in binding sharing `config`.
    #[allow(unused_mut, unused_variables)]
    pub fn with_config(config: AdapterConfig) -> Self {
        let mut registry = Self::none();
        #[cfg(feature = "native")]
        registry.push(Box::new(crate::adapters::NativeAdapter::with_config(config.clone())));
        #[cfg(feature = "image-rs")]
        registry.push(Box::new(crate::adapters::ImageRsAdapter::with_config(config)));
        registry
    }

    /// No adapters; caller registers its own.
    pub fn none() -> Self {
        Self {
            adapters: Vec::new(),
            decode_enabled: FormatSet::ALL,
            encode_enabled: FormatSet::ALL,
        }
    }

    /// Append an adapter (builder form).
    pub fn register(mut self, adapter: impl ImageAdapter + 'static) -> Self {
        self.push(Box::new(adapter));
        self
    }

    /// Append an adapter.
    pub fn push(&mut self, adapter: Box<dyn ImageAdapter>) {
        log::debug!("registering adapter {}", adapter.name());
        self.adapters.push(adapter);
    }

    /// Enable or disable decoding for a format.
    pub fn with_decode(mut self, format: ImageFormat, enabled: bool) -> Self {
        if enabled {
            self.decode_enabled.insert(format);
        } else {
            self.decode_enabled.remove(format);
        }
        self
    }

    /// Enable or disable encoding for a format.
    pub fn with_encode(mut self, format: ImageFormat, enabled: bool) -> Self {
        if enabled {
            self.encode_enabled.insert(format);
        } else {
            self.encode_enabled.remove(format);
        }
        self
    }

    /// Registered adapters in priority order.
    pub fn adapters(&self) -> impl Iterator<Item = &dyn ImageAdapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    /// Adapter by [`name`](ImageAdapter::name).
    pub fn get(&self, name: &str) -> Option<&dyn ImageAdapter> {
        self.adapters().find(|a| a.name() == name)
    }

    fn decode_allowed(&self, path: &Path, header: &[u8]) -> bool {
        match crate::adapters::sniff(path, header) {
            Some(format) => self.decode_enabled.contains(format),
            None => true,
        }
    }

    /// Every adapter that claims the file, in priority order.
    pub fn candidates(&self, path: &Path, header: &[u8]) -> Vec<&dyn ImageAdapter> {
        if !self.decode_allowed(path, header) {
            return Vec::new();
        }
        self.adapters()
            .filter(|a| a.identify(path, header))
            .collect()
    }

    /// First adapter that claims the file.
    pub fn identify(&self, path: &Path, header: &[u8]) -> Option<&dyn ImageAdapter> {
        if !self.decode_allowed(path, header) {
            return None;
        }
        self.adapters().find(|a| a.identify(path, header))
    }

    /// Try each claiming adapter until one succeeds.
    ///
    /// A decode failure moves on to the next adapter; other failures, and the
    /// last adapter's failure, are returned. When every adapter fails the
    /// first error is reported.
    fn dispatch<T>(
        &self,
        path: &Path,
        op: impl Fn(&dyn ImageAdapter) -> Result<T, AdapterError>,
    ) -> Result<T, AdapterError> {
        let header = crate::probe::read_header(path)?;
        let mut first_err = None;
        for adapter in self.candidates(path, &header) {
            log::debug!("dispatching {} to {}", path.display(), adapter.name());
            match op(adapter) {
                Ok(value) => return Ok(value),
                Err(e) if e.kind() == ErrorKind::Decode => {
                    log::debug!("{} failed on {}: {e}", adapter.name(), path.display());
                    first_err.get_or_insert(e);
                }
                Err(e) => return Err(first_err.unwrap_or(e)),
            }
        }
        Err(first_err.unwrap_or(AdapterError::UnrecognizedFormat))
    }

    /// Decode `path` with the first adapter able to.
    pub fn load(&self, path: &Path) -> Result<DecodedImage, AdapterError> {
        self.dispatch(path, |a| a.load(path))
    }

    /// Begin streaming `path` with the first adapter able to.
    pub fn open(&self, path: &Path) -> Result<Box<dyn ScanlineSession>, AdapterError> {
        self.dispatch(path, |a| a.open(path))
    }

    /// Save with the first adapter listing `ext` among its savers.
    pub fn save(&self, path: &Path, image: &ImageView<'_>, ext: &str) -> Result<(), AdapterError> {
        let trimmed = ext.strip_prefix('.').unwrap_or(ext);
        let no_saver = || AdapterError::NoSaver(trimmed.to_ascii_lowercase());
        let format = ImageFormat::from_extension(trimmed).ok_or_else(no_saver)?;
        if !self.encode_enabled.contains(format) {
            return Err(no_saver());
        }
        let adapter = self
            .adapters()
            .find(|a| a.can_save(trimmed))
            .ok_or_else(no_saver)?;
        log::debug!("saving {} with {}", path.display(), adapter.name());
        adapter.save(path, image, trimmed)
    }

    /// Union of every adapter's saver list, first occurrence wins.
    pub fn savers(&self) -> String {
        let mut seen: Vec<&str> = Vec::new();
        for adapter in self.adapters() {
            for ext in adapter.savers().split(',') {
                let enabled = ImageFormat::from_extension(ext)
                    .is_some_and(|f| self.encode_enabled.contains(f));
                if enabled && !seen.contains(&ext) {
                    seen.push(ext);
                }
            }
        }
        seen.join(",")
    }

    /// One entry per writable format, from the highest-priority adapter.
    pub fn saver_info(&self) -> Vec<SaverInfo> {
        let mut infos: Vec<SaverInfo> = Vec::new();
        for info in self.adapters().flat_map(|a| a.saver_info()) {
            if self.encode_enabled.contains(info.format)
                && !infos.iter().any(|i| i.format == info.format)
            {
                infos.push(info);
            }
        }
        infos
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::all()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.adapters().map(|a| a.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Components;

    /// Claims `.png` files and fails on every operation.
    struct Broken;

    impl ImageAdapter for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn identify(&self, path: &Path, _: &[u8]) -> bool {
            path.extension().is_some_and(|e| e == "png")
        }
        fn load(&self, _: &Path) -> Result<DecodedImage, AdapterError> {
            Err(AdapterError::decode(None, "broken adapter"))
        }
        fn open(&self, _: &Path) -> Result<Box<dyn ScanlineSession>, AdapterError> {
            Err(AdapterError::decode(None, "broken adapter"))
        }
        fn save(&self, _: &Path, _: &ImageView<'_>, _: &str) -> Result<(), AdapterError> {
            Err(AdapterError::encode(ImageFormat::Png, "broken adapter"))
        }
        fn savers(&self) -> &'static str {
            "png,qoi"
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("zenadapters-registry-{}-{name}", std::process::id()))
    }

    #[test]
    fn format_set() {
        let mut set = FormatSet::EMPTY;
        set.insert(ImageFormat::Qoi);
        assert!(set.contains(ImageFormat::Qoi));
        assert!(!set.contains(ImageFormat::Png));
        set.remove(ImageFormat::Qoi);
        assert_eq!(set, FormatSet::EMPTY);
        assert!(ImageFormat::ALL.iter().all(|&f| FormatSet::ALL.contains(f)));
    }

    #[test]
    fn savers_union_keeps_first_occurrence() {
        let registry = AdapterRegistry::none().register(Broken);
        assert_eq!(registry.savers(), "png,qoi");

        let registry = registry.with_encode(ImageFormat::Qoi, false);
        assert_eq!(registry.savers(), "png");
        assert_eq!(registry.saver_info().len(), 1);
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let registry = AdapterRegistry::none();
        assert!(registry.identify(Path::new("a.png"), b"").is_none());
        let view = ImageView::new(&[0; 3], 1, 1, Components::Rgb).unwrap();
        assert!(matches!(
            registry.save(&temp_path("none.png"), &view, "png"),
            Err(AdapterError::NoSaver(_))
        ));
    }

    #[cfg(feature = "native")]
    #[test]
    fn load_falls_back_past_failing_adapter() {
        let path = temp_path("fallback.png");
        let pixels = [1u8, 2, 3, 4, 5, 6];
        let view = ImageView::new(&pixels, 2, 1, Components::Rgb).unwrap();
        crate::adapters::NativeAdapter::new()
            .save(&path, &view, "png")
            .unwrap();

        let registry = AdapterRegistry::none()
            .register(Broken)
            .register(crate::adapters::NativeAdapter::new());
        let image = registry.load(&path).unwrap();
        assert_eq!(image.pixels(), &pixels);

        let only_broken = AdapterRegistry::none().register(Broken);
        assert!(matches!(
            only_broken.load(&path),
            Err(AdapterError::Decode { .. })
        ));

        std::fs::remove_file(&path).unwrap();
    }

    #[cfg(feature = "native")]
    #[test]
    fn disabled_decode_format_is_unrecognized() {
        let path = temp_path("disabled.png");
        let view = ImageView::new(&[0; 4], 2, 2, Components::Gray).unwrap();
        crate::adapters::NativeAdapter::new()
            .save(&path, &view, "png")
            .unwrap();

        let registry = AdapterRegistry::all().with_decode(ImageFormat::Png, false);
        assert!(matches!(
            registry.load(&path),
            Err(AdapterError::UnrecognizedFormat)
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
