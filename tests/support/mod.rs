//! Synthetic fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use zenadapters::Components;

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A fresh directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "zenadapters-{name}-{}-{n}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub fn join(&self, file: &str) -> PathBuf {
        self.path.join(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub const LAYOUTS: [Components; 4] = [
    Components::Gray,
    Components::GrayAlpha,
    Components::Rgb,
    Components::Rgba,
];

/// Smooth gradient, friendly to lossy codecs. Alpha is a separate ramp.
pub fn gradient(width: u32, height: u32, components: Components) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height) as usize * components.count());
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(2).saturating_sub(1).max(1)) as u8;
            let g = (y * 255 / height.max(2).saturating_sub(1).max(1)) as u8;
            let b = 96u8;
            let a = (255 - (x + y) % 64) as u8;
            match components {
                Components::Gray => out.push(r / 2 + g / 2),
                Components::GrayAlpha => out.extend_from_slice(&[r / 2 + g / 2, a]),
                Components::Rgb => out.extend_from_slice(&[r, g, b]),
                Components::Rgba => out.extend_from_slice(&[r, g, b, a]),
            }
        }
    }
    out
}

/// Deterministic pseudo-random samples.
pub fn noise(width: u32, height: u32, components: Components, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..(width * height) as usize * components.count())
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// Mean absolute difference per sample.
pub fn mean_abs_error(a: &[u8], b: &[u8]) -> f64 {
    assert_eq!(a.len(), b.len());
    let total: u64 = a.iter().zip(b).map(|(x, y)| u64::from(x.abs_diff(*y))).sum();
    total as f64 / a.len() as f64
}

/// Write a PNG with the png crate directly, bypassing the adapters.
#[cfg(feature = "native")]
pub fn write_png(path: &Path, pixels: &[u8], width: u32, height: u32, components: Components) {
    let file = std::fs::File::create(path).expect("create fixture");
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(match components {
        Components::Gray => png::ColorType::Grayscale,
        Components::GrayAlpha => png::ColorType::GrayscaleAlpha,
        Components::Rgb => png::ColorType::Rgb,
        Components::Rgba => png::ColorType::Rgba,
    });
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().expect("png header");
    writer.write_image_data(pixels).expect("png data");
    writer.finish().expect("png finish");
}

/// 16-bit RGB PNG that reduces to `expected` at 8 bits (each sample is `v * 257`).
#[cfg(feature = "native")]
pub fn write_png16(path: &Path, expected: &[u8], width: u32, height: u32) {
    let samples: Vec<u8> = expected.iter().flat_map(|&v| [v, v]).collect();
    let file = std::fs::File::create(path).expect("create fixture");
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Sixteen);
    let mut writer = encoder.write_header().expect("png header");
    writer.write_image_data(&samples).expect("png data");
    writer.finish().expect("png finish");
}

/// Palette PNG with a transparent first entry. Returns the expanded RGBA samples.
#[cfg(feature = "native")]
pub fn write_palette_png(path: &Path, width: u32, height: u32) -> Vec<u8> {
    let palette = [255u8, 0, 0, 0, 255, 0, 0, 0, 255];
    let indices: Vec<u8> = (0..width * height).map(|i| (i % 3) as u8).collect();

    let file = std::fs::File::create(path).expect("create fixture");
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(palette.to_vec());
    encoder.set_trns(vec![0u8]);
    let mut writer = encoder.write_header().expect("png header");
    writer.write_image_data(&indices).expect("png data");
    writer.finish().expect("png finish");

    indices
        .iter()
        .flat_map(|&i| {
            let p = &palette[i as usize * 3..i as usize * 3 + 3];
            [p[0], p[1], p[2], if i == 0 { 0 } else { 255 }]
        })
        .collect()
}

/// Concatenate every row of a streaming session read in order.
pub fn stream_all(session: &mut dyn zenadapters::ScanlineSession) -> Vec<u8> {
    let mut out = Vec::new();
    let mut row = vec![0u8; session.row_bytes()];
    for y in 0..session.height() {
        session.read_line(y, &mut row).expect("read_line");
        out.extend_from_slice(&row);
    }
    out
}
