//! Hand-rolled Blosc1 container (§6): used only for the embedded static
//! coordinate chunks this store writes inline (`time`, `time_bnds`, and any
//! materialised coordinate array small enough to ship eagerly). Data
//! variable chunks are always sent uncompressed (`compressor: null`) since
//! their bytes come straight off an OPeNDAP hyperslab, not a local buffer
//! worth shrinking.

use esa_common::EsaCciError;

const BLOSC_VERSION: u8 = 2;
const BLOSC_VERSION_FORMAT: u8 = 2;
const FLAG_BYTE_SHUFFLE: u8 = 0x01;
const HEADER_LEN: usize = 16;

pub const CNAME: &str = "zstd";
pub const CLEVEL: i32 = 1;
pub const SHUFFLE: u8 = 1;

/// Byte-shuffles `data` (grouped into `typesize`-byte elements), zstd
/// compresses the result, and wraps it in a 16-byte Blosc1 header.
pub fn compress(data: &[u8], typesize: usize) -> Result<Vec<u8>, EsaCciError> {
    let shuffled = shuffle(data, typesize);
    let compressed = zstd::stream::encode_all(shuffled.as_slice(), CLEVEL)
        .map_err(|e| EsaCciError::InvalidArgument(format!("blosc compress: {e}")))?;

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.push(BLOSC_VERSION);
    out.push(BLOSC_VERSION_FORMAT);
    out.push(FLAG_BYTE_SHUFFLE);
    out.push(typesize as u8);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    let cbytes = (HEADER_LEN + compressed.len()) as u32;
    out.extend_from_slice(&cbytes.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn decompress(blob: &[u8]) -> Result<Vec<u8>, EsaCciError> {
    if blob.len() < HEADER_LEN {
        return Err(EsaCciError::InvalidArgument(
            "blosc blob shorter than its own header".to_string(),
        ));
    }
    let flags = blob[2];
    let typesize = blob[3] as usize;
    let nbytes = u32::from_le_bytes(blob[4..8].try_into().unwrap()) as usize;

    let decompressed = zstd::stream::decode_all(&blob[HEADER_LEN..])
        .map_err(|e| EsaCciError::InvalidArgument(format!("blosc decompress: {e}")))?;
    let data = if flags & FLAG_BYTE_SHUFFLE != 0 {
        unshuffle(&decompressed, typesize)
    } else {
        decompressed
    };
    if data.len() != nbytes {
        return Err(EsaCciError::InvalidArgument(format!(
            "blosc decompressed length {} does not match header nbytes {nbytes}",
            data.len()
        )));
    }
    Ok(data)
}

/// Rearranges `typesize`-byte elements so all their first bytes come first,
/// then all second bytes, and so on: the transform a general-purpose codec
/// compresses much better than the original interleaved layout.
fn shuffle(data: &[u8], typesize: usize) -> Vec<u8> {
    if typesize <= 1 || data.len() % typesize != 0 {
        return data.to_vec();
    }
    let n = data.len() / typesize;
    let mut out = vec![0u8; data.len()];
    for byte_pos in 0..typesize {
        for elem in 0..n {
            out[byte_pos * n + elem] = data[elem * typesize + byte_pos];
        }
    }
    out
}

fn unshuffle(data: &[u8], typesize: usize) -> Vec<u8> {
    if typesize <= 1 || data.len() % typesize != 0 {
        return data.to_vec();
    }
    let n = data.len() / typesize;
    let mut out = vec![0u8; data.len()];
    for byte_pos in 0..typesize {
        for elem in 0..n {
            out[elem * typesize + byte_pos] = data[byte_pos * n + elem];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_f64_array_through_shuffle_and_zstd() {
        let values: [f64; 4] = [1.0, -2.5, 3.25, 1e10];
        let mut bytes = Vec::new();
        for v in &values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let blob = compress(&bytes, 8).unwrap();
        assert_eq!(decompress(&blob).unwrap(), bytes);
    }

    #[test]
    fn shuffle_then_unshuffle_is_identity() {
        let data: Vec<u8> = (0u8..40).collect();
        let shuffled = shuffle(&data, 4);
        assert_eq!(unshuffle(&shuffled, 4), data);
    }

    #[test]
    fn header_carries_typesize_and_uncompressed_length() {
        let data = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let blob = compress(&data, 4).unwrap();
        assert_eq!(blob[3], 4);
        assert_eq!(u32::from_le_bytes(blob[4..8].try_into().unwrap()), 8);
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(decompress(&[0u8; 4]).is_err());
    }
}
