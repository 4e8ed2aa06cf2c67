//! Low-level cursors shared by the folio crates.
//!
//! This crate is not meant for external consumption.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bit;
pub mod byte;
