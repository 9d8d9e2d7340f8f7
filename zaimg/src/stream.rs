//! Row-by-row decoding through a streaming session.

use std::time::Instant;

use zenadapters::AdapterConfig;

use crate::{StreamArgs, registry};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over one row.
fn row_checksum(row: &[u8]) -> u64 {
    row.iter()
        .fold(FNV_OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

/// Run the `stream` subcommand.
pub fn run(args: StreamArgs) -> anyhow::Result<()> {
    let registry = registry(args.adapter, AdapterConfig::default());
    let start = Instant::now();
    let mut session = registry.open(&args.file)?;

    let (width, height) = (session.width(), session.height());
    let components = session.components();
    println!(
        "{}: {width}x{height} {components:?}",
        args.file.display()
    );

    let mut row = vec![0u8; session.row_bytes()];
    let mut combined = FNV_OFFSET;
    let order: Box<dyn Iterator<Item = u32>> = if args.reverse {
        Box::new((0..height).rev())
    } else {
        Box::new(0..height)
    };

    for y in order {
        if let Err(e) = session.read_line(y, &mut row) {
            session.close();
            return Err(anyhow::Error::new(e).context(format!("row {y}")));
        }
        let sum = row_checksum(&row);
        if args.rows {
            println!("  {y:>6} {sum:016x}");
        }
        // order independent so --reverse reports the same total
        combined ^= sum.rotate_left(y % 64);
    }
    session.close();

    println!(
        "  {height} rows, checksum {combined:016x}, {}ms",
        start.elapsed().as_millis()
    );
    Ok(())
}
