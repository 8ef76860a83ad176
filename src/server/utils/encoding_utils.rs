use std::io::Read;

use flate2::read::GzDecoder;
use tracing::{debug, error};

use crate::server::error::{AppResult, Error};

/// undoes upstream content-encoding so a playlist can be rewritten as text
///
/// unknown encodings are passed through untouched, the utf-8 check afterwards catches anything
/// that really was compressed
pub fn decode_body(bytes: &[u8], content_encoding: Option<&str>) -> AppResult<Vec<u8>> {
    let encoding = content_encoding.map(|e| e.trim().to_ascii_lowercase());

    match encoding.as_deref() {
        Some("zstd") => {
            debug!("Decompressing zstd-encoded playlist");
            zstd::decode_all(bytes).map_err(|e| {
                error!("Failed to decompress zstd: {}", e);
                Error::UpstreamFormat(format!("failed to decompress zstd body: {}", e))
            })
        }
        Some("gzip") | Some("x-gzip") => {
            debug!("Decompressing gzip-encoded playlist");
            let mut decoder = GzDecoder::new(bytes);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed).map_err(|e| {
                error!("Failed to decompress gzip: {}", e);
                Error::UpstreamFormat(format!("failed to decompress gzip body: {}", e))
            })?;
            Ok(decompressed)
        }
        _ => Ok(bytes.to_vec()),
    }
}
