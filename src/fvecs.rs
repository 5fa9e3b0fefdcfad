//! Reading and writing `.fvecs` files.
//!
//! Each record is a little-endian `i32` dimension followed by that many
//! little-endian `f32` values. Records repeat until end of file; each one
//! carries its own dimension.

use crate::error::{KnnError, Result};
use crate::vector::Vector;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

const DIM_HEADER_SIZE: usize = 4;
const FLOAT_SIZE: usize = 4;

/// Parse records from an in-memory `.fvecs` buffer.
///
/// Reading stops after `limit` records when one is given. A record cut short
/// by the end of the buffer ends the read; the records before it are kept.
pub fn parse_fvecs(bytes: &[u8], limit: Option<usize>) -> Result<Vec<Vector>> {
    let mut vectors = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        if limit.is_some_and(|max| vectors.len() >= max) {
            break;
        }

        let Some(header) = bytes.get(offset..offset + DIM_HEADER_SIZE) else {
            warn!(offset, "truncated dimension header at end of fvecs data");
            break;
        };
        let dim = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if dim <= 0 {
            return Err(KnnError::InvalidFormat {
                offset,
                reason: format!("non-positive dimension {}", dim),
            });
        }
        let dim = dim as usize;

        let body_start = offset + DIM_HEADER_SIZE;
        let body_end = body_start + dim * FLOAT_SIZE;
        let Some(body) = bytes.get(body_start..body_end) else {
            warn!(
                offset,
                dim,
                available = bytes.len() - body_start,
                "truncated vector record at end of fvecs data"
            );
            break;
        };

        let data = body
            .chunks_exact(FLOAT_SIZE)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        vectors.push(Vector::new(data));
        offset = body_end;
    }

    Ok(vectors)
}

/// Read up to `limit` vectors from an `.fvecs` file.
///
/// The file is memory-mapped when possible, with a plain read as fallback.
pub fn read_fvecs(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<Vector>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }

    // The map is read-only and dropped before returning.
    let vectors = match unsafe { memmap2::Mmap::map(&file) } {
        Ok(mmap) => parse_fvecs(&mmap, limit)?,
        Err(_) => parse_fvecs(&std::fs::read(path)?, limit)?,
    };

    info!(path = %path.display(), count = vectors.len(), "loaded fvecs");
    Ok(vectors)
}

/// Write vectors to an `.fvecs` file, replacing any existing file.
pub fn write_fvecs(path: impl AsRef<Path>, vectors: &[Vector]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    for vector in vectors {
        let dim = i32::try_from(vector.dimension())
            .ok()
            .filter(|&d| d > 0)
            .ok_or_else(|| KnnError::InvalidVector {
                reason: format!("cannot encode dimension {}", vector.dimension()),
            })?;
        out.write_all(&dim.to_le_bytes())?;
        for &val in vector.as_slice() {
            out.write_all(&val.to_le_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Resize `vectors` to exactly `count` entries.
///
/// Extra vectors are dropped; missing ones are filled by cycling through the
/// originals, so entry `i` is a copy of entry `i % original_len`. An empty
/// input stays empty.
pub fn fill_to_count(mut vectors: Vec<Vector>, count: usize) -> Vec<Vector> {
    let original = vectors.len();
    if original == 0 || original >= count {
        vectors.truncate(count);
        return vectors;
    }

    vectors.reserve(count - original);
    for i in original..count {
        let copy = vectors[i % original].clone();
        vectors.push(copy);
    }
    vectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn encode(records: &[&[f32]]) -> Vec<u8> {
        let mut buf = Vec::new();
        for r in records {
            buf.extend_from_slice(&(r.len() as i32).to_le_bytes());
            for v in r.iter() {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        buf
    }

    #[test]
    fn test_parse_records() {
        let bytes = encode(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]);
        let vectors = parse_fvecs(&bytes, None).unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[2].as_slice(), &[5.0, 6.0]);
    }

    #[test]
    fn test_parse_limit() {
        let bytes = encode(&[&[1.0], &[2.0], &[3.0]]);
        let vectors = parse_fvecs(&bytes, Some(2)).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(parse_fvecs(&bytes, Some(0)).unwrap().len(), 0);
    }

    #[test]
    fn test_truncated_trailing_record() {
        let mut bytes = encode(&[&[1.0, 2.0], &[3.0, 4.0]]);
        bytes.truncate(bytes.len() - 2);
        let vectors = parse_fvecs(&bytes, None).unwrap();
        assert_eq!(vectors.len(), 1);

        let mut bytes = encode(&[&[1.0, 2.0]]);
        bytes.extend_from_slice(&[0x02, 0x00]);
        assert_eq!(parse_fvecs(&bytes, None).unwrap().len(), 1);
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut bytes = encode(&[&[1.0]]);
        bytes.extend_from_slice(&(-3i32).to_le_bytes());
        assert!(matches!(
            parse_fvecs(&bytes, None),
            Err(KnnError::InvalidFormat { offset: 8, .. })
        ));
    }

    #[test]
    fn test_mixed_dimensions_are_preserved() {
        let bytes = encode(&[&[1.0, 2.0, 3.0], &[4.0]]);
        let vectors = parse_fvecs(&bytes, None).unwrap();
        assert_eq!(vectors[0].dimension(), 3);
        assert_eq!(vectors[1].dimension(), 1);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("base.fvecs");
        let vectors = vec![
            Vector::new(vec![0.5, -1.5, 2.25]),
            Vector::new(vec![3.0, 4.0, 5.0]),
        ];
        write_fvecs(&path, &vectors).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * (4 + 3 * 4));
        assert_eq!(read_fvecs(&path, None).unwrap(), vectors);
        assert_eq!(read_fvecs(&path, Some(1)).unwrap(), vectors[..1].to_vec());
    }

    #[test]
    fn test_read_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.fvecs");
        std::fs::write(&path, b"").unwrap();
        assert!(read_fvecs(&path, None).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_fvecs(dir.path().join("nope.fvecs"), None),
            Err(KnnError::IoError(_))
        ));
    }

    #[test]
    fn test_write_rejects_empty_vector() {
        let dir = TempDir::new().unwrap();
        let result = write_fvecs(dir.path().join("bad.fvecs"), &[Vector::new(vec![])]);
        assert!(matches!(result, Err(KnnError::InvalidVector { .. })));
    }

    #[test]
    fn test_fill_to_count_cycles() {
        let vectors = vec![Vector::new(vec![0.0]), Vector::new(vec![1.0])];
        let filled = fill_to_count(vectors, 5);
        let values: Vec<f32> = filled.iter().map(|v| v.as_slice()[0]).collect();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fill_to_count_truncates_and_keeps_empty() {
        let vectors = vec![Vector::new(vec![0.0]), Vector::new(vec![1.0])];
        assert_eq!(fill_to_count(vectors, 1).len(), 1);
        assert!(fill_to_count(Vec::new(), 3).is_empty());
    }
}
