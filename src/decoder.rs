use anyhow::{Context, Result};
use bytes::Bytes;
use encoding_rs::SHIFT_JIS;
use flate2::read::{DeflateDecoder, GzDecoder};
use std::io::Read;
use tracing::debug;

/// Content codings the client can undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Zstd,
}

impl ContentEncoding {
    /// Reads a `Content-Encoding` header value. Only the first coding of a
    /// list is honoured; anything unknown is treated as identity.
    pub fn from_header(value: Option<&str>) -> Self {
        let first = value
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match first.as_str() {
            "gzip" | "x-gzip" => ContentEncoding::Gzip,
            "deflate" => ContentEncoding::Deflate,
            "zstd" => ContentEncoding::Zstd,
            _ => ContentEncoding::Identity,
        }
    }
}

pub fn decode_gzip(data: &[u8]) -> Result<Bytes> {
    let mut decoded = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut decoded)
        .context("Failed to decode gzip body")?;
    Ok(Bytes::from(decoded))
}

pub fn decode_deflate(data: &[u8]) -> Result<Bytes> {
    let mut decoded = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut decoded)
        .context("Failed to decode deflate body")?;
    Ok(Bytes::from(decoded))
}

pub fn decode_zstd(data: &[u8]) -> Result<Bytes> {
    let decoded = zstd::decode_all(data).context("Failed to decode zstd body")?;
    Ok(Bytes::from(decoded))
}

/// Undoes the content coding, then turns the bytes into text: UTF-8 first,
/// Shift_JIS when that fails, and lossy UTF-8 as the last resort.
pub fn decode_body(data: &[u8], encoding: ContentEncoding) -> Result<String> {
    let body = match encoding {
        ContentEncoding::Identity => Bytes::copy_from_slice(data),
        ContentEncoding::Gzip => decode_gzip(data)?,
        ContentEncoding::Deflate => decode_deflate(data)?,
        ContentEncoding::Zstd => decode_zstd(data)?,
    };

    match String::from_utf8(body.to_vec()) {
        Ok(s) => Ok(s),
        Err(utf8e) => {
            let (text, _, had_errors) = SHIFT_JIS.decode(&body);
            if !had_errors {
                debug!("body is not UTF-8 ({}), decoded as Shift_JIS", utf8e);
                return Ok(text.into_owned());
            }
            debug!("body is neither UTF-8 nor Shift_JIS, decoding lossily");
            Ok(String::from_utf8_lossy(&body).into_owned())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder};
    use std::io::Write;

    const GZIP_TEST_123: [u8; 28] = [
        31, 139, 8, 0, 0, 0, 0, 0, 0, 255, 43, 73, 45, 46, 137, 55, 52, 50, 6, 0, 21, 191, 53, 241,
        8, 0, 0, 0,
    ];

    #[test]
    fn decode_gzip_should_return_correct_bytes() {
        let result = decode_gzip(&GZIP_TEST_123).unwrap();
        assert_eq!(&result[..], b"test_123");
    }

    #[test]
    fn decode_deflate_should_return_correct_bytes() {
        let data = [43, 73, 45, 46, 137, 55, 52, 50, 6, 0];
        let result = decode_deflate(&data).unwrap();
        assert_eq!(&result[..], b"test_123");
    }

    #[test]
    fn decode_zstd_should_return_correct_bytes() {
        let data = [
            40, 181, 47, 253, 0, 88, 65, 0, 0, 116, 101, 115, 116, 95, 49, 50, 51,
        ];
        let result = decode_zstd(&data).unwrap();
        assert_eq!(&result[..], b"test_123");
    }

    #[test]
    fn decode_should_fail_on_corrupted_input() {
        assert!(decode_gzip(&[31, 139, 8, 0, 0, 0, 0, 0, 0, 255, 1, 2, 3]).is_err());
        assert!(decode_deflate(&[1, 2, 3, 4, 5]).is_err());
        assert!(decode_zstd(&[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn from_header_should_be_case_and_whitespace_insensitive() {
        let cases = [
            (Some("gzip"), ContentEncoding::Gzip),
            (Some(" GZip "), ContentEncoding::Gzip),
            (Some("Deflate"), ContentEncoding::Deflate),
            (Some("ZSTD"), ContentEncoding::Zstd),
            (Some("gzip, deflate"), ContentEncoding::Gzip),
            (Some("br"), ContentEncoding::Identity),
            (Some(""), ContentEncoding::Identity),
            (None, ContentEncoding::Identity),
        ];
        for (header, expected) in cases {
            assert_eq!(ContentEncoding::from_header(header), expected, "{header:?}");
        }
    }

    #[test]
    fn decode_body_should_keep_utf8_text() {
        let result = decode_body("Hello, 世界!".as_bytes(), ContentEncoding::Identity).unwrap();
        assert_eq!(result, "Hello, 世界!");
    }

    #[test]
    fn decode_body_should_fall_back_to_shift_jis() {
        let (sjis, _, _) = SHIFT_JIS.encode("こんにちは");
        let result = decode_body(&sjis, ContentEncoding::Identity).unwrap();
        assert_eq!(result, "こんにちは");
    }

    #[test]
    fn decode_body_should_never_fail_on_plain_bytes() {
        assert!(decode_body(&[0xFF, 0xFE, 0xFD], ContentEncoding::Identity).is_ok());
    }

    #[test]
    fn decode_body_should_decompress_before_decoding() {
        let original = r#"{"message": "compressed"}"#;

        let mut gz = GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(original.as_bytes()).unwrap();
        let gz = gz.finish().unwrap();
        assert_eq!(decode_body(&gz, ContentEncoding::Gzip).unwrap(), original);

        let mut df = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        df.write_all(original.as_bytes()).unwrap();
        let df = df.finish().unwrap();
        assert_eq!(decode_body(&df, ContentEncoding::Deflate).unwrap(), original);
    }
}
