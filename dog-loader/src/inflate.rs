use std::io::Read;

use flate2::read::MultiGzDecoder;

use crate::{LoadError, LoadResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Inflate a gzip body, accepting concatenated members.
///
/// Fails with `LoadError::Decompression` when the body is not gzip, is
/// corrupt or truncated, or inflates past `limit` bytes.
pub fn gunzip(body: &[u8], limit: u64) -> LoadResult<Vec<u8>> {
    if !body.starts_with(&GZIP_MAGIC) {
        return Err(LoadError::decompression("missing gzip header"));
    }

    let mut inflated = Vec::new();
    MultiGzDecoder::new(body)
        .take(limit.saturating_add(1))
        .read_to_end(&mut inflated)
        .map_err(|e| LoadError::decompression(e.to_string()))?;

    if inflated.len() as u64 > limit {
        return Err(LoadError::decompression(format!(
            "inflated size exceeds {limit} bytes"
        )));
    }

    Ok(inflated)
}
