//! # Index and Trailer Text Format
//!
//! The manifest a caller keeps to reconstruct a stream:
//!
//! ```text
//! <hex digest of block 0>
//! <hex digest of block 1>
//! ...
//! >HEXDIGEST LENGTH
//! ```
//!
//! Each index line is the lowercase hex digest of one block, in stream
//! order. The trailer carries the digest and byte length of the whole
//! reassembled stream, not of the index. Exactly one trailer terminates the
//! index; anything after it is rejected.
//!
//! Parsing reads the complete text before returning, so a malformed trailer
//! is reported before any block is fetched.

use std::fmt;
use std::io::{BufRead, Read, Write};
use std::str::FromStr;

use gob_core::{Digest, DigestError};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Marker that starts the trailer line.
pub const TRAILER_MARKER: char = '>';

/// Digest and length of a whole stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub digest: Digest,
    pub length: u64,
}

impl Trailer {
    /// Parse a trailer line without its terminating newline.
    pub fn parse(line: &str) -> Result<Self, StoreError> {
        let body = line
            .strip_prefix(TRAILER_MARKER)
            .ok_or_else(|| malformed("last line is not a trailer line"))?;
        let (hex, length) = body
            .split_once(' ')
            .ok_or_else(|| malformed("no separator between trailer hash and length"))?;

        let digest =
            Digest::from_hex(hex).map_err(|e| malformed(&format!("bad trailer hash: {e}")))?;

        if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(&format!("invalid data length {length:?}")));
        }
        let length = length
            .parse::<u64>()
            .map_err(|e| malformed(&format!("invalid data length {length:?}: {e}")))?;

        Ok(Self { digest, length })
    }
}

impl fmt::Display for Trailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TRAILER_MARKER}{} {}", self.digest, self.length)
    }
}

/// Ordered block digests of one stream plus its trailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub blocks: Vec<Digest>,
    pub trailer: Trailer,
}

impl Index {
    /// Parse index text from `reader`, consuming it to the end.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidEncoding`] for an index line that is not a
    ///   canonical hex digest.
    /// - [`StoreError::MalformedTrailer`] if the trailer is missing,
    ///   malformed, or followed by more input.
    /// - [`StoreError::Stream`] if reading fails.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<Self, StoreError> {
        let mut blocks = Vec::new();
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Err(malformed("missing trailer line"));
            }
            line_no += 1;
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }

            if buf.first() == Some(&(TRAILER_MARKER as u8)) {
                let line = std::str::from_utf8(&buf)
                    .map_err(|_| malformed("trailer is not valid UTF-8"))?;
                let trailer = Trailer::parse(line)?;

                buf.clear();
                if reader.read_to_end(&mut buf)? != 0 {
                    return Err(malformed("trailer is not the last line"));
                }
                return Ok(Self { blocks, trailer });
            }

            let line = std::str::from_utf8(&buf).map_err(|_| StoreError::InvalidEncoding {
                line: line_no,
                source: DigestError::InvalidEncoding {
                    reason: "line is not valid UTF-8".to_string(),
                },
            })?;
            let digest = Digest::from_hex(line).map_err(|source| StoreError::InvalidEncoding {
                line: line_no,
                source,
            })?;
            blocks.push(digest);
        }
    }

    /// Write the index in its text form.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for digest in &self.blocks {
            writeln!(writer, "{digest}")?;
        }
        writeln!(writer, "{}", self.trailer)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digest in &self.blocks {
            writeln!(f, "{digest}")?;
        }
        writeln!(f, "{}", self.trailer)
    }
}

impl FromStr for Index {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

fn malformed(reason: &str) -> StoreError {
    StoreError::MalformedTrailer {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Index {
        Index {
            blocks: vec![Digest::compute(b"ABCD"), Digest::compute(b"EFG")],
            trailer: Trailer {
                digest: Digest::compute(b"ABCDEFG"),
                length: 7,
            },
        }
    }

    #[test]
    fn renders_one_line_per_block_then_trailer() {
        let index = sample();
        let text = index.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], Digest::compute(b"ABCD").as_hex());
        assert_eq!(lines[1], Digest::compute(b"EFG").as_hex());
        assert_eq!(
            lines[2],
            format!(">{} 7", Digest::compute(b"ABCDEFG").as_hex())
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn write_to_matches_display() {
        let index = sample();
        let mut out = Vec::new();
        index.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), index.to_string());
    }

    #[test]
    fn parses_rendered_text() {
        let index = sample();
        assert_eq!(index.to_string().parse::<Index>().unwrap(), index);
    }

    #[test]
    fn parses_trailer_without_final_newline() {
        let index = sample();
        let text = index.to_string();
        let parsed: Index = text.trim_end_matches('\n').parse().unwrap();
        assert_eq!(parsed, index);
    }

    #[test]
    fn parses_empty_stream() {
        let text = format!(">{} 0\n", Digest::compute(b"").as_hex());
        let index: Index = text.parse().unwrap();
        assert!(index.blocks.is_empty());
        assert_eq!(index.trailer.length, 0);
    }

    #[test]
    fn missing_trailer() {
        let text = format!("{}\n", Digest::compute(b"x").as_hex());
        let err = text.parse::<Index>().unwrap_err();
        assert!(matches!(err, StoreError::MalformedTrailer { .. }), "got: {err}");
        assert!("".parse::<Index>().is_err());
    }

    #[test]
    fn trailer_without_marker_is_an_index_line() {
        // Without '>' the last line is read as a block digest, which it is not.
        let text = format!("{} 7\n", Digest::compute(b"x").as_hex());
        let err = text.parse::<Index>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidEncoding { line: 1, .. }), "got: {err}");
    }

    #[test]
    fn content_after_trailer() {
        let mut text = sample().to_string();
        text.push_str("extra\n");
        let err = text.parse::<Index>().unwrap_err();
        assert!(format!("{err}").contains("not the last line"), "got: {err}");
    }

    #[test]
    fn invalid_index_line_reports_line_number() {
        let text = format!(
            "{}\nnot-a-digest\n>{} 8\n",
            Digest::compute(b"x").as_hex(),
            Digest::compute(b"y").as_hex()
        );
        let err = text.parse::<Index>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidEncoding { line: 2, .. }), "got: {err}");
    }

    #[test]
    fn uppercase_index_line_is_rejected() {
        let text = format!(
            "{}\n>{} 1\n",
            Digest::compute(b"x").as_hex().to_uppercase(),
            Digest::compute(b"x").as_hex()
        );
        assert!(matches!(
            text.parse::<Index>(),
            Err(StoreError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn carriage_return_is_not_stripped() {
        let text = format!("{}\r\n>{} 1\n", Digest::compute(b"x"), Digest::compute(b"x"));
        assert!(text.parse::<Index>().is_err());
    }

    #[test]
    fn trailer_parse_accepts_valid() {
        let digest = Digest::compute(b"stream");
        let trailer = Trailer::parse(&format!(">{digest} 12345")).unwrap();
        assert_eq!(trailer.digest, digest);
        assert_eq!(trailer.length, 12345);
        assert_eq!(trailer.to_string(), format!(">{digest} 12345"));
    }

    #[test]
    fn trailer_parse_rejects_malformed() {
        let hex = Digest::compute(b"stream").as_hex().to_string();
        let mut bad_hex = hex.clone();
        bad_hex.replace_range(0..1, "x");

        for line in [
            format!("{hex} 5"),
            format!(">{hex}"),
            format!(">{hex}5"),
            format!(">{hex} "),
            format!(">{hex} five"),
            format!(">{hex} +5"),
            format!(">{hex} -5"),
            format!(">{hex} 5 "),
            format!(">{hex} 99999999999999999999999"),
            format!(">{bad_hex} 5"),
            format!(">{} 5", &hex[..10]),
        ] {
            let err = Trailer::parse(&line).unwrap_err();
            assert!(
                matches!(err, StoreError::MalformedTrailer { .. }),
                "{line:?} gave {err}"
            );
        }
    }

    #[test]
    fn serde_roundtrip_uses_hex() {
        let index = sample();
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["trailer"]["length"], 7);
        assert_eq!(json["blocks"][0], Digest::compute(b"ABCD").as_hex());
        let back: Index = serde_json::from_value(json).unwrap();
        assert_eq!(back, index);
    }
}
