//! # Tabsync Serde
//! Bit-level writer/reader pair and the `Serde` trait used to encode
//! replication messages exchanged between tabsync nodes.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bit_reader;
mod bit_writer;
mod error;
mod integer;
mod serde;

pub use bit_reader::BitReader;
pub use bit_writer::{BitWrite, BitWriter};
pub use error::SerdeErr;
pub use integer::{SerdeInteger, SignedVariableInteger, UnsignedVariableInteger};
pub use serde::Serde;
