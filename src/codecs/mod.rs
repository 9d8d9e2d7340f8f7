//! Codec glue for the native binding.
//!
//! Each module is a thin layer between the adapter types and one
//! format-specific codec crate.

#[cfg(feature = "jpeg")]
pub(crate) mod jpeg;

#[cfg(feature = "native")]
pub(crate) mod png;
