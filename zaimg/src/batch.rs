//! File expansion, deduplication, and conversion reporting.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use zenadapters::ImageFormat;

/// Expand input patterns into a deduplicated list of image files.
///
/// Handles:
/// - Glob patterns (containing `*`, `?`, `[`)
/// - Plain file paths, whatever their extension
/// - Directories (recursive image discovery)
///
/// Results keep the order patterns were given in; files found inside a
/// directory are sorted by path.
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            for entry in glob::glob(pattern)? {
                let path = entry?;
                if path.is_file() && is_image(&path) {
                    push_unique(path, &mut seen, &mut files);
                }
            }
        } else {
            let path = PathBuf::from(pattern);
            if path.is_dir() {
                let mut found = Vec::new();
                for_each_image_in_dir(&path, &mut seen, &mut found);
                found.sort();
                files.extend(found);
            } else if path.is_file() {
                push_unique(path, &mut seen, &mut files);
            } else {
                anyhow::bail!("not a file or directory: {}", path.display());
            }
        }
    }

    Ok(files)
}

fn push_unique(path: PathBuf, seen: &mut HashSet<PathBuf>, files: &mut Vec<PathBuf>) {
    if let Ok(canonical) = path.canonicalize() {
        if seen.insert(canonical) {
            files.push(path);
        }
    }
}

/// Whether a discovered file looks like an image: a known extension, or
/// failing that, known magic bytes.
pub fn is_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_some()
        || zenadapters::probe::read_header(path)
            .is_ok_and(|header| ImageFormat::detect(&header).is_some())
}

/// Recursively find image files in a directory.
fn for_each_image_in_dir(dir: &Path, seen: &mut HashSet<PathBuf>, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("skipping {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            for_each_image_in_dir(&path, seen, files);
        } else if path.is_file() && is_image(&path) {
            push_unique(path, seen, files);
        }
    }
}

/// Result of converting a single file.
#[derive(Debug)]
pub struct FileResult {
    pub input_path: PathBuf,
    pub input_size: u64,
    pub output_size: Option<u64>,
    pub adapter: Option<&'static str>,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Accumulated conversion summary.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<FileResult>,
}

impl BatchSummary {
    pub fn push(&mut self, result: FileResult) {
        self.results.push(result);
    }

    /// Summed input and output bytes.
    pub fn totals(&self) -> (u64, u64) {
        self.results.iter().fold((0, 0), |(i, o), r| {
            (i + r.input_size, o + r.output_size.unwrap_or(0))
        })
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }

    /// Print a human-readable summary table.
    pub fn print_report(&self) {
        if self.results.is_empty() {
            println!("No files converted.");
            return;
        }

        println!(
            "{:<36} {:>9} {:>10} {:>10} {:>8}",
            "File", "Adapter", "Input", "Output", "Time"
        );
        println!("{}", "-".repeat(77));

        for r in &self.results {
            let name = r
                .input_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?");
            let name = if name.chars().count() > 34 {
                let tail: String = name.chars().rev().take(32).collect::<Vec<_>>().into_iter().rev().collect();
                format!("..{tail}")
            } else {
                name.to_string()
            };

            if let Some(err) = &r.error {
                println!("{:<36} {:>9} {:>10} {}", name, "-", format_size(r.input_size), err);
            } else if let Some(out_size) = r.output_size {
                println!(
                    "{:<36} {:>9} {:>10} {:>10} {:>8}",
                    name,
                    r.adapter.unwrap_or("-"),
                    format_size(r.input_size),
                    format_size(out_size),
                    format!("{}ms", r.duration.as_millis()),
                );
            }
        }

        let (input, output) = self.totals();
        println!("{}", "-".repeat(77));
        println!(
            "{} converted, {} errors | {} -> {}",
            self.results.len() - self.error_count(),
            self.error_count(),
            format_size(input),
            format_size(output),
        );
    }
}

/// Format a byte size into a human-readable string.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn image_extensions() {
        assert!(is_image(Path::new("a/b.PNG")));
        assert!(is_image(Path::new("c.tiff")));
        assert!(!is_image(Path::new("/nonexistent/notes.txt")));
        assert!(!is_image(Path::new("/nonexistent/Makefile")));
    }

    #[test]
    fn missing_input_is_an_error() {
        let missing = format!("/nonexistent-{}/x.png", std::process::id());
        assert!(expand_inputs(&[missing]).is_err());
    }
}
