#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;
use zenadapters::{AdapterRegistry, ImageFormat, probe};

fuzz_target!(|data: &[u8]| {
    let detected = ImageFormat::detect(data);
    if let Some(result) = probe::probe(data) {
        assert_eq!(Some(result.format), detected);
        assert!(result.bytes_examined <= data.len());
    }
    for format in ImageFormat::ALL {
        let _ = probe::probe_format(data, format);
    }

    let registry = AdapterRegistry::all();
    for name in ["input", "input.png", "input.tga", "input.jpg"] {
        let _ = registry.identify(Path::new(name), data);
    }
});
