//! Star field datasets: a versioned body list, bincode-encoded and zstd-compressed.
//!
//! Loading goes through [`StarField::new`], so a dataset can never produce a
//! field that construction in memory would have refused.

use std::borrow::Cow;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use bincode::ErrorKind;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::{FieldError, StarField};
use crate::Body;

/// Bumped whenever the encoded layout of [`Body`] changes.
pub const DATASET_VERSION: u16 = 1;

const COMPRESSION_LEVEL: i32 = 19;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] Box<ErrorKind>),
    #[error("Compression error: {0}")]
    Compression(#[source] std::io::Error),
    #[error("dataset version {found} is not supported (expected {})", DATASET_VERSION)]
    UnsupportedVersion { found: u16 },
    #[error("dataset holds an invalid field: {0}")]
    Field(#[from] FieldError),
}

#[derive(Serialize, Deserialize)]
struct FieldDataset<'a> {
    version: u16,
    bodies: Cow<'a, [Body]>,
}

fn encode(dataset: &FieldDataset<'_>) -> Result<Vec<u8>, DataError> {
    let raw = bincode::serialize(dataset)?;
    zstd::stream::encode_all(Cursor::new(raw), COMPRESSION_LEVEL).map_err(DataError::Compression)
}

pub fn serialize_field(field: &StarField) -> Result<Vec<u8>, DataError> {
    encode(&FieldDataset {
        version: DATASET_VERSION,
        bodies: Cow::Borrowed(&field.bodies),
    })
}

pub fn deserialize_field(bytes: &[u8]) -> Result<StarField, DataError> {
    let raw = zstd::stream::decode_all(Cursor::new(bytes)).map_err(DataError::Compression)?;
    let dataset: FieldDataset<'static> = bincode::deserialize(&raw)?;
    if dataset.version != DATASET_VERSION {
        return Err(DataError::UnsupportedVersion {
            found: dataset.version,
        });
    }
    let field = StarField::new(dataset.bodies.into_owned())?;
    debug!("Decoded dataset with {} bodies", field.len());
    Ok(field)
}

pub fn write_field_to_file<P: AsRef<Path>>(field: &StarField, path: P) -> Result<(), DataError> {
    fs::write(path, serialize_field(field)?)?;
    Ok(())
}

pub fn read_field_from_file<P: AsRef<Path>>(path: P) -> Result<StarField, DataError> {
    deserialize_field(&fs::read(path)?)
}
