//! # zenadapters
//!
//! Uniform image adapters: one identify/load/save/stream contract over
//! different codec libraries.
//!
//! Each binding is feature-gated:
//!
//! ```toml
//! [dependencies]
//! zenadapters = { version = "0.1", features = ["native", "image-rs"] }
//! ```
//!
//! - `native`: the png crate, with row-at-a-time PNG streaming. Add `jpeg`
//!   for zenjpeg-backed JPEG.
//! - `image-rs`: the `image` crate toolkit and every format it was built with.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zenadapters::{AdapterRegistry, ImageView};
//!
//! let registry = AdapterRegistry::default();
//! let image = registry.load(Path::new("input.png"))?;
//! println!("{}x{} {:?}", image.width(), image.height(), image.components());
//!
//! // Stream rows without holding the decoded image
//! let mut session = registry.open(Path::new("input.png"))?;
//! let mut row = vec![0u8; session.row_bytes()];
//! for y in 0..session.height() {
//!     session.read_line(y, &mut row)?;
//! }
//! session.close();
//!
//! registry.save(Path::new("output.jpg"), &image.view(), "jpg")?;
//! # Ok::<(), zenadapters::AdapterError>(())
//! ```
//!
//! Hosts that expect boolean results and a last-error message wrap an adapter
//! in [`Plugin`].

#![forbid(unsafe_code)]

mod adapter;
pub mod adapters;
mod buffer;
mod codecs;
mod config;
mod error;
mod format;
mod limits;
pub mod pixel;
mod plugin;
pub mod probe;
mod registry;
mod session;

pub use adapter::{ImageAdapter, SaverInfo, ScanlineSession};
pub use buffer::{DecodedImage, ImageView};
pub use config::{AdapterConfig, PngCompression};
pub use error::{AdapterError, ErrorKind};
pub use format::ImageFormat;
pub use limits::Limits;
pub use pixel::{ChannelOrder, Components, RowOrder};
pub use plugin::{OpenSession, Plugin, SessionHandle};
pub use probe::ProbeResult;
pub use registry::AdapterRegistry;
pub use session::BufferedSession;

#[cfg(feature = "image-rs")]
pub use adapters::ImageRsAdapter;
#[cfg(feature = "native")]
pub use adapters::NativeAdapter;
