//! Length-prefixed `u32` array files
//!
//! # Format
//!
//! ```text
//! [len: u32 LE][elem 0: u32 LE][elem 1: u32 LE] ... [elem len-1: u32 LE]
//! ```
//!
//! A file must be exactly `4 + 4 * len` bytes. Rank vectors use the same
//! framing with each element holding the bit pattern of an `f32`.

use crate::error::{ArrayFormatError, RankError, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;

const WORD: usize = std::mem::size_of::<u32>();

/// Encode an array as `[len][elements...]`, little-endian
///
/// # Errors
///
/// Returns [`ArrayFormatError::TooLong`] if `values` has more than `u32::MAX`
/// elements
pub fn encode_u32_array(values: &[u32]) -> std::result::Result<Vec<u8>, ArrayFormatError> {
    let len = u32::try_from(values.len()).map_err(|_| ArrayFormatError::TooLong(values.len()))?;

    let mut bytes = vec![0_u8; WORD * (values.len() + 1)];
    let (header, payload) = bytes.split_at_mut(WORD);
    LittleEndian::write_u32(header, len);
    LittleEndian::write_u32_into(values, payload);
    Ok(bytes)
}

/// Decode a buffer produced by [`encode_u32_array`]
///
/// # Errors
///
/// Returns an [`ArrayFormatError`] if the buffer is shorter or longer than its
/// length prefix announces. A file written with the opposite byte order
/// almost always lands here, since its prefix decodes to a huge length.
pub fn decode_u32_array(bytes: &[u8]) -> std::result::Result<Vec<u32>, ArrayFormatError> {
    if bytes.len() < WORD {
        return Err(ArrayFormatError::MissingHeader(bytes.len()));
    }

    let (header, payload) = bytes.split_at(WORD);
    let expected = u64::from(LittleEndian::read_u32(header));
    let expected_bytes = expected * WORD as u64;

    if (payload.len() as u64) < expected_bytes {
        return Err(ArrayFormatError::Truncated {
            expected,
            found: payload.len(),
        });
    }
    if (payload.len() as u64) > expected_bytes {
        #[allow(clippy::cast_possible_truncation)] // bounded by payload.len()
        let extra = payload.len() - expected_bytes as usize;
        return Err(ArrayFormatError::TrailingBytes { expected, extra });
    }

    let mut values = vec![0_u32; payload.len() / WORD];
    LittleEndian::read_u32_into(payload, &mut values);
    Ok(values)
}

/// Write a `u32` array file
///
/// # Errors
///
/// Returns [`RankError::Persistence`] on I/O failure (e.g. disk full) and
/// [`RankError::MalformedArray`] if the array is too long for the format
pub async fn write_u32_array<P: AsRef<Path>>(path: P, values: &[u32]) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_u32_array(values).map_err(|reason| RankError::MalformedArray {
        path: path.to_path_buf(),
        reason,
    })?;

    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| RankError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;

    log::debug!("Wrote {} elements to {}", values.len(), path.display());
    Ok(())
}

/// Read a `u32` array file
///
/// # Errors
///
/// Returns [`RankError::Persistence`] if the file cannot be read and
/// [`RankError::MalformedArray`] if its size disagrees with its length prefix
pub async fn read_u32_array<P: AsRef<Path>>(path: P) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| RankError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;

    let values = decode_u32_array(&bytes).map_err(|reason| RankError::MalformedArray {
        path: path.to_path_buf(),
        reason,
    })?;

    log::debug!("Read {} elements from {}", values.len(), path.display());
    Ok(values)
}

/// Write a rank vector as `f32` bit patterns
///
/// # Errors
///
/// Same as [`write_u32_array`]
pub async fn write_f32_array<P: AsRef<Path>>(path: P, ranks: &[f32]) -> Result<()> {
    let bits: Vec<u32> = ranks.iter().map(|r| r.to_bits()).collect();
    write_u32_array(path, &bits).await
}

/// Read a rank vector written by [`write_f32_array`]
///
/// # Errors
///
/// Same as [`read_u32_array`]
pub async fn read_f32_array<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let bits = read_u32_array(path).await?;
    Ok(bits.into_iter().map(f32::from_bits).collect())
}
