//! Readers and writers for RPM and DEB packages and the ar and cpio
//! containers they are built from.

pub mod ar;
pub mod deb;
mod error;
pub mod header;
pub mod lead;
pub mod payload;
pub mod rpm;
pub mod utils;

pub use crate::error::{Error, Result};
pub use crate::rpm::{RpmBuilder, RpmInfo, RpmPackage};
