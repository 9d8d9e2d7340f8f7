#![no_main]

use libfuzzer_sys::fuzz_target;
use zenadapters::{AdapterConfig, ImageRsAdapter, Limits, NativeAdapter};

fuzz_target!(|data: &[u8]| {
    let config = AdapterConfig::default().with_limits(
        Limits::none()
            .with_max_dimensions(4096, 4096)
            .with_max_pixels(4_000_000),
    );

    if let Ok(image) = NativeAdapter::with_config(config.clone()).load_from_memory(data) {
        assert_eq!(
            image.pixels().len(),
            image.row_bytes() * image.height() as usize
        );
    }
    if let Ok(image) = ImageRsAdapter::with_config(config).load_from_memory(data) {
        assert_eq!(
            image.pixels().len(),
            image.row_bytes() * image.height() as usize
        );
    }
});
