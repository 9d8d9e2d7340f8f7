//! Image inspection: probe headers, ask adapters, list savers.

use std::path::Path;

use serde::Serialize;
use zenadapters::probe::{probe, read_header};
use zenadapters::{AdapterConfig, AdapterRegistry};

use crate::{IdentifyArgs, InfoArgs, SaversArgs, batch, registry};

/// Run the `identify` subcommand.
pub fn identify(args: IdentifyArgs) -> anyhow::Result<()> {
    let files = batch::expand_inputs(&args.files)?;
    let registry = AdapterRegistry::all();

    for path in &files {
        let header = match read_header(path) {
            Ok(h) => h,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                continue;
            }
        };
        let claimed: Vec<&str> = registry
            .candidates(path, &header)
            .iter()
            .map(|a| a.name())
            .collect();
        if claimed.is_empty() {
            println!("{}: not recognized", path.display());
        } else {
            println!("{}: {}", path.display(), claimed.join(", "));
        }
    }

    Ok(())
}

/// Run the `info` subcommand.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let files = batch::expand_inputs(&args.files)?;

    if files.is_empty() {
        anyhow::bail!("no image files found");
    }

    let registry = registry(args.adapter, AdapterConfig::default());
    let multi = files.len() > 1;

    for (i, path) in files.iter().enumerate() {
        if multi && !args.json {
            if i > 0 {
                println!();
            }
            println!("{}:", path.display());
        }

        match inspect_file(&registry, path) {
            Ok(info) => {
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else {
                    print_info(&info);
                }
            }
            Err(e) => {
                eprintln!("  error: {e}");
            }
        }
    }

    Ok(())
}

/// Probe the header, then decode to learn what the adapter hands back.
fn inspect_file(registry: &AdapterRegistry, path: &Path) -> anyhow::Result<ImageInfoDisplay> {
    let file_size = std::fs::metadata(path)?.len();
    let header = read_header(path)?;
    let probed = probe(&header);

    let adapter = registry
        .identify(path, &header)
        .map(|a| a.name().to_string());
    let decoded = match adapter {
        Some(_) => Some(registry.load(path)?),
        None => None,
    };

    let format = probed
        .as_ref()
        .map(|p| p.format)
        .or_else(|| decoded.as_ref().and_then(|d| d.format()));

    Ok(ImageInfoDisplay {
        path: path.display().to_string(),
        format: format.map(|f| f.full_name().to_string()),
        mime_type: format.map(|f| f.mime_type().to_string()),
        header_width: probed.as_ref().and_then(|p| p.width),
        header_height: probed.as_ref().and_then(|p| p.height),
        bit_depth: probed.as_ref().and_then(|p| p.bit_depth),
        has_alpha: probed.as_ref().and_then(|p| p.has_alpha),
        adapter,
        decoded: decoded.map(|d| DecodedDisplay {
            width: d.width(),
            height: d.height(),
            components: format!("{:?}", d.components()),
            channels: d.components().count(),
        }),
        file_size,
    })
}

#[derive(Debug, Serialize)]
struct ImageInfoDisplay {
    path: String,
    format: Option<String>,
    mime_type: Option<String>,
    header_width: Option<u32>,
    header_height: Option<u32>,
    bit_depth: Option<u8>,
    has_alpha: Option<bool>,
    adapter: Option<String>,
    decoded: Option<DecodedDisplay>,
    file_size: u64,
}

#[derive(Debug, Serialize)]
struct DecodedDisplay {
    width: u32,
    height: u32,
    components: String,
    channels: usize,
}

fn print_info(info: &ImageInfoDisplay) {
    match (&info.format, &info.mime_type) {
        (Some(format), Some(mime)) => println!("  Format:       {format} ({mime})"),
        _ => println!("  Format:       unknown"),
    }
    if let (Some(w), Some(h)) = (info.header_width, info.header_height) {
        println!("  Header:       {w}x{h}");
    }
    if let Some(depth) = info.bit_depth {
        println!("  Bit depth:    {depth}");
    }
    if let Some(alpha) = info.has_alpha {
        println!("  Alpha:        {}", if alpha { "yes" } else { "no" });
    }
    match (&info.adapter, &info.decoded) {
        (Some(adapter), Some(d)) => {
            println!("  Adapter:      {adapter}");
            println!(
                "  Decoded:      {}x{} {} ({} channels)",
                d.width, d.height, d.components, d.channels
            );
        }
        _ => println!("  Adapter:      none"),
    }
    println!("  File size:    {}", batch::format_size(info.file_size));
}

#[derive(Debug, Serialize)]
struct SaverDisplay {
    adapter: String,
    format: String,
    extensions: Vec<String>,
    description: String,
}

/// Run the `savers` subcommand.
pub fn savers(args: SaversArgs) -> anyhow::Result<()> {
    let registry = registry(args.adapter, AdapterConfig::default());

    if args.json {
        let entries: Vec<SaverDisplay> = registry
            .adapters()
            .flat_map(|adapter| {
                adapter.saver_info().into_iter().map(move |info| SaverDisplay {
                    adapter: adapter.name().to_string(),
                    format: info.full_name.to_string(),
                    extensions: info.extensions.iter().map(|e| e.to_string()).collect(),
                    description: info.description,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for adapter in registry.adapters() {
        println!("{:<9} {}", adapter.name(), adapter.savers());
    }
    if args.adapter.is_none() {
        println!("{:<9} {}", "any", registry.savers());
    }
    Ok(())
}
