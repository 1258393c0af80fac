use std::io::Read;

use streamhub_api::{CodecError, CompressFormat};

// ---- Envelope ----

/// `u8` algorithm id + `u32` big-endian uncompressed length.
pub const HEADER_LEN: usize = 5;

/// Parsed envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub format: CompressFormat,
    pub raw_len: usize,
}

impl EnvelopeHeader {
    pub fn parse(envelope: &[u8]) -> Result<Self, CodecError> {
        if envelope.len() < HEADER_LEN {
            return Err(CodecError::corrupt(format!(
                "envelope header needs {HEADER_LEN} bytes, got {}",
                envelope.len()
            )));
        }
        let format = CompressFormat::from_id(envelope[0])?;
        let raw_len = u32::from_be_bytes([envelope[1], envelope[2], envelope[3], envelope[4]]) as usize;
        Ok(Self { format, raw_len })
    }
}

// ---- CompressMiddleware ----

/// Wraps serialized batches in a self-describing compression envelope.
///
/// `encode` always uses the configured format; `decode` honours whatever
/// id the envelope carries, so a client can read a response compressed
/// differently from its own requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressMiddleware {
    format: CompressFormat,
}

impl CompressMiddleware {
    pub fn new(format: CompressFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> CompressFormat {
        self.format
    }

    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        compress(data, self.format)
    }

    pub fn decode(&self, envelope: &[u8]) -> Result<Vec<u8>, CodecError> {
        decompress(envelope).map(|(_, raw)| raw)
    }
}

// ---- Algorithms ----

/// Compress `data` and prepend the envelope header.
pub fn compress(data: &[u8], format: CompressFormat) -> Result<Vec<u8>, CodecError> {
    let raw_len = u32::try_from(data.len())
        .map_err(|_| CodecError::Compression(format!("payload too large: {} bytes", data.len())))?;

    let body = match format {
        CompressFormat::None => data.to_vec(),
        CompressFormat::Lz4 => lz4_flex::block::compress(data),
        CompressFormat::Zlib => {
            let mut encoder = flate2::read::ZlibEncoder::new(data, flate2::Compression::default());
            let mut compressed = Vec::new();
            encoder
                .read_to_end(&mut compressed)
                .map_err(|e| CodecError::Compression(format!("zlib compress: {e}")))?;
            compressed
        }
        CompressFormat::Deflate => {
            let mut encoder = flate2::read::DeflateEncoder::new(data, flate2::Compression::default());
            let mut compressed = Vec::new();
            encoder
                .read_to_end(&mut compressed)
                .map_err(|e| CodecError::Compression(format!("deflate compress: {e}")))?;
            compressed
        }
    };

    let mut envelope = Vec::with_capacity(HEADER_LEN + body.len());
    envelope.push(format.id());
    envelope.extend_from_slice(&raw_len.to_be_bytes());
    envelope.extend_from_slice(&body);
    Ok(envelope)
}

/// Strip the envelope and decompress. The result must match the declared length.
pub fn decompress(envelope: &[u8]) -> Result<(CompressFormat, Vec<u8>), CodecError> {
    let header = EnvelopeHeader::parse(envelope)?;
    let body = &envelope[HEADER_LEN..];

    let raw = match header.format {
        CompressFormat::None => body.to_vec(),
        CompressFormat::Lz4 => lz4_flex::block::decompress(body, header.raw_len)
            .map_err(|e| CodecError::corrupt(format!("lz4 decompress: {e}")))?,
        CompressFormat::Zlib => {
            inflate(flate2::read::ZlibDecoder::new(body), header.raw_len, "zlib")?
        }
        CompressFormat::Deflate => {
            inflate(flate2::read::DeflateDecoder::new(body), header.raw_len, "deflate")?
        }
    };

    if raw.len() != header.raw_len {
        return Err(CodecError::corrupt(format!(
            "{} envelope declares {} bytes, decompressed {}",
            header.format,
            header.raw_len,
            raw.len()
        )));
    }
    Ok((header.format, raw))
}

/// Read at most one byte past the declared length, enough to detect a mismatch.
fn inflate(decoder: impl Read, raw_len: usize, name: &str) -> Result<Vec<u8>, CodecError> {
    let mut raw = Vec::with_capacity(raw_len);
    decoder
        .take(raw_len as u64 + 1)
        .read_to_end(&mut raw)
        .map_err(|e| CodecError::corrupt(format!("{name} decompress: {e}")))?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..200u32 {
            data.extend_from_slice(format!("record-{}|", i % 17).as_bytes());
        }
        data
    }

    #[test]
    fn test_round_trip_all_formats() {
        let data = sample();
        for format in CompressFormat::ALL {
            let middleware = CompressMiddleware::new(format);
            let envelope = middleware.encode(&data).unwrap();
            assert_eq!(envelope[0], format.id());
            let (detected, raw) = decompress(&envelope).unwrap();
            assert_eq!(detected, format);
            assert_eq!(raw, data, "format {format}");
        }
    }

    #[test]
    fn test_empty_payload() {
        for format in CompressFormat::ALL {
            let envelope = compress(&[], format).unwrap();
            assert!(decompress(&envelope).unwrap().1.is_empty());
        }
    }

    #[test]
    fn test_none_is_identity_after_header() {
        let envelope = compress(b"abc", CompressFormat::None).unwrap();
        assert_eq!(envelope, vec![0, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_compression_shrinks_repetitive_data() {
        let data = sample();
        for format in [CompressFormat::Lz4, CompressFormat::Zlib, CompressFormat::Deflate] {
            assert!(compress(&data, format).unwrap().len() < data.len());
        }
    }

    #[test]
    fn test_unknown_algorithm_id() {
        assert_eq!(
            decompress(&[9, 0, 0, 0, 0]).unwrap_err(),
            CodecError::UnsupportedCompression(9)
        );
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(decompress(&[1, 0]), Err(CodecError::CorruptPayload(_))));
    }

    #[test]
    fn test_declared_length_mismatch() {
        for format in CompressFormat::ALL {
            let mut envelope = compress(&sample(), format).unwrap();
            // Claim one byte more than was compressed.
            let declared = u32::from_be_bytes([envelope[1], envelope[2], envelope[3], envelope[4]]) + 1;
            envelope[1..5].copy_from_slice(&declared.to_be_bytes());
            assert!(
                matches!(decompress(&envelope), Err(CodecError::CorruptPayload(_))),
                "format {format}"
            );
        }
    }

    #[test]
    fn test_garbage_body() {
        let envelope = [2u8, 0, 0, 0, 10, 0xde, 0xad, 0xbe, 0xef];
        assert!(matches!(decompress(&envelope), Err(CodecError::CorruptPayload(_))));
    }
}
