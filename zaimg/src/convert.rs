//! Decode with one adapter, save with another, and resolve output paths.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use zenadapters::{AdapterConfig, AdapterRegistry};

use crate::batch::{self, BatchSummary, FileResult};
use crate::{ConvertArgs, registry};

/// Resolved output configuration.
pub struct OutputConfig {
    pub target_dir: Option<PathBuf>,
    pub target_file: Option<PathBuf>,
    pub suffix: String,
    pub force: bool,
    pub dry_run: bool,
    /// Extension written, without the dot.
    pub ext: String,
}

impl OutputConfig {
    /// Create from CLI args. The target extension comes from `--format`,
    /// falling back to the `-o` file's extension.
    pub fn new(
        output: Option<&str>,
        suffix: &str,
        force: bool,
        dry_run: bool,
        format: Option<&str>,
    ) -> anyhow::Result<Self> {
        let (target_dir, target_file) = match output {
            Some(o) => {
                let path = PathBuf::from(o);
                if o.ends_with('/') || o.ends_with('\\') || path.is_dir() {
                    (Some(path), None)
                } else {
                    (None, Some(path))
                }
            }
            None => (None, None),
        };

        let ext = match (format, &target_file) {
            (Some(f), _) => f.trim_start_matches('.').to_ascii_lowercase(),
            (None, Some(file)) => match file.extension().and_then(|e| e.to_str()) {
                Some(e) => e.to_ascii_lowercase(),
                None => bail!("cannot infer a format from {}; pass --format", file.display()),
            },
            (None, None) => bail!("pass --format or an -o file with an extension"),
        };

        Ok(Self {
            target_dir,
            target_file,
            suffix: suffix.to_string(),
            force,
            dry_run,
            ext,
        })
    }

    /// Resolve the output path for a given input file.
    pub fn resolve(&self, input: &Path, input_count: usize) -> anyhow::Result<PathBuf> {
        // -o file: only valid for single-file input
        if let Some(ref target) = self.target_file {
            if input_count > 1 {
                bail!("-o with a file path only works for a single input file (got {input_count})");
            }
            return Ok(target.clone());
        }

        // -o dir/: place output in target directory with same stem
        if let Some(ref dir) = self.target_dir {
            return Ok(dir.join(self.output_filename(input)));
        }

        let parent = input.parent().unwrap_or(Path::new("."));
        Ok(parent.join(self.output_filename(input)))
    }

    /// Compute the output filename (stem + suffix + extension).
    fn output_filename(&self, input: &Path) -> String {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        format!("{stem}{}.{}", self.suffix, self.ext)
    }

    /// Check if the output path is writable (won't clobber without --force).
    pub fn check_writable(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        if self.dry_run {
            return Ok(());
        }

        if let (Ok(ci), Ok(co)) = (input.canonicalize(), output.canonicalize()) {
            if ci == co {
                bail!("output would overwrite input: {}", input.display());
            }
        }

        if output.exists() && !self.force {
            bail!(
                "output already exists: {}\nUse --force to overwrite",
                output.display()
            );
        }

        Ok(())
    }

    /// Create parent directories for the output path.
    pub fn ensure_parent(output: &Path) -> anyhow::Result<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory: {}", parent.display()))?;
            }
        }
        Ok(())
    }
}

/// Run the `convert` subcommand.
pub fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let files = batch::expand_inputs(&args.files)?;
    if files.is_empty() {
        bail!("no image files found");
    }

    let output = OutputConfig::new(
        args.output.as_deref(),
        &args.suffix,
        args.force,
        args.dry_run,
        args.format.as_deref(),
    )?;

    let mut config = AdapterConfig::default();
    if let Some(q) = args.quality {
        if !(1..=100).contains(&q) {
            bail!("--quality must be between 1 and 100 (got {q})");
        }
        config = config.with_jpeg_quality(q);
    }
    if let Some(c) = args.compression {
        config = config.with_png_compression(c.to_png_compression());
    }
    let registry = registry(args.adapter, config);

    let mut summary = BatchSummary::default();
    for input in &files {
        let out_path = match output.resolve(input, files.len()) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{}: {e}", input.display());
                continue;
            }
        };

        if output.dry_run {
            println!("{} -> {}", input.display(), out_path.display());
            continue;
        }

        let start = Instant::now();
        let outcome = convert_one(&registry, &output, input, &out_path);
        let input_size = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);
        let result = match outcome {
            Ok(adapter) => {
                log::info!("{} -> {}", input.display(), out_path.display());
                FileResult {
                    input_path: input.clone(),
                    input_size,
                    output_size: std::fs::metadata(&out_path).ok().map(|m| m.len()),
                    adapter,
                    error: None,
                    duration: start.elapsed(),
                }
            }
            Err(e) => {
                eprintln!("{}: {e:#}", input.display());
                FileResult {
                    input_path: input.clone(),
                    input_size,
                    output_size: None,
                    adapter: None,
                    error: Some(e.to_string()),
                    duration: start.elapsed(),
                }
            }
        };
        summary.push(result);
    }

    if args.report {
        summary.print_report();
    }
    if summary.error_count() > 0 {
        bail!("{} of {} files failed", summary.error_count(), summary.results.len());
    }
    Ok(())
}

/// Convert one file and return the decoding adapter's name.
fn convert_one(
    registry: &AdapterRegistry,
    output: &OutputConfig,
    input: &Path,
    out_path: &Path,
) -> anyhow::Result<Option<&'static str>> {
    output.check_writable(input, out_path)?;
    OutputConfig::ensure_parent(out_path)?;

    let header = zenadapters::probe::read_header(input)?;
    let adapter = registry.identify(input, &header).map(|a| a.name());
    let image = registry
        .load(input)
        .with_context(|| format!("decoding {}", input.display()))?;
    registry
        .save(out_path, &image.view(), &output.ext)
        .with_context(|| format!("encoding {}", out_path.display()))?;
    Ok(adapter)
}
