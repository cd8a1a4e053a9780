//! Binary data arrays for mzML
//!
//! mzML stores numerical arrays (m/z, intensity) as Base64-encoded binary data,
//! optionally compressed with zlib. Decoding runs the pipeline forwards:
//!
//! 1. Base64 decode the text
//! 2. Decompress if needed (zlib)
//! 3. Interpret bytes as float32 or float64 (little-endian)
//!
//! Encoding runs it backwards and is used when re-encoding runs into canonical
//! indexed mzML.

use std::io::{Read, Write};

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Compression types used in mzML binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// No compression (raw binary)
    #[default]
    None,
    /// zlib compression (most common)
    Zlib,
    /// MS-Numpress (any flavour); recognized but not decoded
    Numpress,
}

impl CompressionType {
    /// Determine compression type from CV accession
    pub fn from_cv_accession(accession: &str) -> Option<Self> {
        match accession {
            "MS:1000574" => Some(CompressionType::Zlib),
            "MS:1000576" => Some(CompressionType::None),
            "MS:1002312" | "MS:1002313" | "MS:1002314" => Some(CompressionType::Numpress),
            _ => None,
        }
    }

    /// CV accession and name written into mzML
    pub fn cv_term(&self) -> (&'static str, &'static str) {
        match self {
            CompressionType::Zlib => ("MS:1000574", "zlib compression"),
            _ => ("MS:1000576", "no compression"),
        }
    }
}

/// Binary encoding precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryEncoding {
    /// 32-bit floating point (CV: MS:1000521)
    Float32,
    /// 64-bit floating point (CV: MS:1000523)
    #[default]
    Float64,
}

impl BinaryEncoding {
    /// Determine encoding from CV accession
    pub fn from_cv_accession(accession: &str) -> Option<Self> {
        match accession {
            "MS:1000521" => Some(BinaryEncoding::Float32),
            "MS:1000523" => Some(BinaryEncoding::Float64),
            _ => None,
        }
    }

    /// CV accession and name written into mzML
    pub fn cv_term(&self) -> (&'static str, &'static str) {
        match self {
            BinaryEncoding::Float32 => ("MS:1000521", "32-bit float"),
            BinaryEncoding::Float64 => ("MS:1000523", "64-bit float"),
        }
    }

    /// Get the byte size per value
    pub fn byte_size(&self) -> usize {
        match self {
            BinaryEncoding::Float32 => 4,
            BinaryEncoding::Float64 => 8,
        }
    }
}

/// Errors that can occur during binary decoding
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    /// Invalid Base64 payload
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// zlib stream could not be inflated
    #[error("Decompression error: {0}")]
    DecompressionError(#[from] std::io::Error),

    /// Decoded value count does not match the declared length
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected number of values (or bytes)
        expected: usize,
        /// Actual number of values (or bytes)
        actual: usize,
    },

    /// Compression scheme that is recognized but not supported
    #[error("Unsupported compression: {0:?}")]
    UnsupportedCompression(CompressionType),
}

/// Decoder for mzML binary data arrays
pub struct BinaryDecoder;

impl BinaryDecoder {
    /// Decode a Base64-encoded binary array from mzML
    ///
    /// # Arguments
    /// * `base64_data` - The Base64-encoded string from the `<binary>` element
    /// * `encoding` - The numerical precision (32 or 64 bit)
    /// * `compression` - The compression type (none, zlib)
    /// * `expected_length` - Expected number of values (from defaultArrayLength)
    pub fn decode(
        base64_data: &str,
        encoding: BinaryEncoding,
        compression: CompressionType,
        expected_length: Option<usize>,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let trimmed = base64_data.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let decoded_bytes = BASE64_STANDARD.decode(trimmed)?;
        let uncompressed = Self::decompress(decoded_bytes, compression)?;
        let values = Self::bytes_to_floats(&uncompressed, encoding)?;

        if let Some(expected) = expected_length {
            if values.len() != expected {
                return Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: values.len(),
                });
            }
        }

        Ok(values)
    }

    /// Inflate a payload according to its compression type
    pub fn decompress(
        bytes: Vec<u8>,
        compression: CompressionType,
    ) -> Result<Vec<u8>, BinaryDecodeError> {
        match compression {
            CompressionType::None => Ok(bytes),
            CompressionType::Zlib => {
                let mut decoder = ZlibDecoder::new(&bytes[..]);
                let mut uncompressed = Vec::new();
                decoder.read_to_end(&mut uncompressed)?;
                Ok(uncompressed)
            }
            CompressionType::Numpress => {
                Err(BinaryDecodeError::UnsupportedCompression(compression))
            }
        }
    }

    /// Convert raw little-endian bytes to f64 values based on encoding
    fn bytes_to_floats(
        bytes: &[u8],
        encoding: BinaryEncoding,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let byte_size = encoding.byte_size();

        if bytes.len() % byte_size != 0 {
            return Err(BinaryDecodeError::InvalidLength {
                expected: bytes.len() / byte_size * byte_size,
                actual: bytes.len(),
            });
        }

        let count = bytes.len() / byte_size;
        let mut values = Vec::with_capacity(count);
        let mut cursor = std::io::Cursor::new(bytes);

        match encoding {
            BinaryEncoding::Float32 => {
                for _ in 0..count {
                    values.push(cursor.read_f32::<LittleEndian>()? as f64);
                }
            }
            BinaryEncoding::Float64 => {
                for _ in 0..count {
                    values.push(cursor.read_f64::<LittleEndian>()?);
                }
            }
        }

        Ok(values)
    }
}

/// Encoder producing mzML `<binary>` payloads
pub struct BinaryEncoder;

impl BinaryEncoder {
    /// Encode values as little-endian floats, optionally zlib-compressed, then Base64
    pub fn encode(
        values: &[f64],
        encoding: BinaryEncoding,
        compression: CompressionType,
    ) -> Result<String, std::io::Error> {
        let mut bytes = Vec::with_capacity(values.len() * encoding.byte_size());
        for &value in values {
            match encoding {
                BinaryEncoding::Float32 => bytes.write_f32::<LittleEndian>(value as f32)?,
                BinaryEncoding::Float64 => bytes.write_f64::<LittleEndian>(value)?,
            }
        }

        let payload = match compression {
            CompressionType::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&bytes)?;
                encoder.finish()?
            }
            _ => bytes,
        };

        Ok(BASE64_STANDARD.encode(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_float64_uncompressed() {
        // 100.0 = 0x4059000000000000, 200.0 = 0x4069000000000000 (little-endian)
        let bytes: [u8; 16] = [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x59, 0x40, // 100.0
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x69, 0x40, // 200.0
        ];
        let base64_data = BASE64_STANDARD.encode(bytes);

        let result = BinaryDecoder::decode(
            &base64_data,
            BinaryEncoding::Float64,
            CompressionType::None,
            Some(2),
        )
        .unwrap();

        assert_eq!(result, vec![100.0, 200.0]);
    }

    #[test]
    fn test_decode_float32_uncompressed() {
        let bytes: [u8; 8] = [
            0x00, 0x00, 0xc8, 0x42, // 100.0
            0x00, 0x00, 0x48, 0x43, // 200.0
        ];
        let base64_data = BASE64_STANDARD.encode(bytes);

        let result = BinaryDecoder::decode(
            &base64_data,
            BinaryEncoding::Float32,
            CompressionType::None,
            Some(2),
        )
        .unwrap();

        assert!((result[0] - 100.0).abs() < 1e-5);
        assert!((result[1] - 200.0).abs() < 1e-5);
    }

    #[test]
    fn test_decode_empty() {
        let result =
            BinaryDecoder::decode("", BinaryEncoding::Float64, CompressionType::None, None)
                .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_length_mismatch_is_reported() {
        let payload =
            BinaryEncoder::encode(&[1.0, 2.0, 3.0], BinaryEncoding::Float64, CompressionType::None)
                .unwrap();
        let err = BinaryDecoder::decode(
            &payload,
            BinaryEncoding::Float64,
            CompressionType::None,
            Some(4),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BinaryDecodeError::InvalidLength {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_zlib_encoded_payload_decodes() {
        let values = vec![100.0, 200.5, 300.25, 400.125];
        let payload =
            BinaryEncoder::encode(&values, BinaryEncoding::Float64, CompressionType::Zlib).unwrap();

        let result =
            BinaryDecoder::decode(&payload, BinaryEncoding::Float64, CompressionType::Zlib, Some(4))
                .unwrap();
        assert_eq!(result, values);
    }

    #[test]
    fn test_numpress_is_unsupported() {
        let payload =
            BinaryEncoder::encode(&[1.0], BinaryEncoding::Float64, CompressionType::None).unwrap();
        let err = BinaryDecoder::decode(
            &payload,
            BinaryEncoding::Float64,
            CompressionType::Numpress,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, BinaryDecodeError::UnsupportedCompression(_)));
    }
}
