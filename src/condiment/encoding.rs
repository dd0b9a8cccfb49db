//! Source text encoding
//!
//! A source may declare its encoding in a comment on one of its first two lines,
//! e.g. `# -*- coding: latin-1 -*-`. The declaration decides how the source is
//! decoded and how the rewritten output is encoded back. Without a declaration,
//! or with one we do not know, UTF-8 is used. Text that is not valid UTF-8 is
//! read as Latin-1 so every byte survives the rewrite.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::borrow::Cow;

static CODING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t\x0c]*#(?-u:.)*?coding[:=][ \t]*([-\w.]+)").unwrap());

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Encodings a source can be read and written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    /// UTF-8 with a leading byte order mark
    Utf8Bom,
    /// ISO-8859-1: every byte is the code point of the same value
    Latin1,
}

impl SourceEncoding {
    /// Map a declared encoding name onto a supported encoding.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_ascii_lowercase().replace('_', "-");
        match label.as_str() {
            "utf-8" | "utf8" | "ascii" | "us-ascii" => Some(SourceEncoding::Utf8),
            "utf-8-sig" => Some(SourceEncoding::Utf8Bom),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" | "cp819" | "iso-latin-1" => {
                Some(SourceEncoding::Latin1)
            }
            _ => None,
        }
    }

    /// Find the encoding of `bytes` from a BOM or a coding declaration.
    ///
    /// Bytes that are not valid in the UTF-8 flavour found are read as Latin-1,
    /// which maps every byte to itself, so they are written back unchanged.
    pub fn sniff(bytes: &[u8]) -> Self {
        let encoding = Self::declared(bytes);
        let utf8_body = match encoding {
            SourceEncoding::Utf8 => bytes,
            SourceEncoding::Utf8Bom => bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes),
            SourceEncoding::Latin1 => return encoding,
        };
        if std::str::from_utf8(utf8_body).is_err() {
            tracing::warn!("source is not valid utf-8, reading it as latin-1");
            return SourceEncoding::Latin1;
        }
        encoding
    }

    fn declared(bytes: &[u8]) -> Self {
        if bytes.starts_with(UTF8_BOM) {
            return SourceEncoding::Utf8Bom;
        }
        for line in bytes.split(|&b| b == b'\n').take(2) {
            let Some(caps) = CODING_REGEX.captures(line) else {
                continue;
            };
            let label = String::from_utf8_lossy(&caps[1]);
            return match Self::from_label(&label) {
                Some(encoding) => encoding,
                None => {
                    tracing::warn!(encoding = %label, "unsupported source encoding, using utf-8");
                    SourceEncoding::Utf8
                }
            };
        }
        SourceEncoding::Utf8
    }

    pub fn decode<'b>(&self, bytes: &'b [u8]) -> Cow<'b, str> {
        match self {
            SourceEncoding::Utf8 => decode_utf8(bytes),
            SourceEncoding::Utf8Bom => decode_utf8(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)),
            SourceEncoding::Latin1 => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode `text`; characters Latin-1 cannot hold become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            SourceEncoding::Utf8 => text.as_bytes().to_vec(),
            SourceEncoding::Utf8Bom => {
                let mut out = UTF8_BOM.to_vec();
                out.extend_from_slice(text.as_bytes());
                out
            }
            SourceEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

fn decode_utf8(bytes: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        tracing::warn!("source is not valid utf-8, invalid bytes replaced");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(SourceEncoding::sniff(b"x = 1\n"), SourceEncoding::Utf8);
        assert_eq!(SourceEncoding::sniff(b""), SourceEncoding::Utf8);
    }

    #[test]
    fn reads_declaration_on_first_two_lines() {
        assert_eq!(
            SourceEncoding::sniff(b"#!/usr/bin/env python\n# -*- coding: latin-1 -*-\n"),
            SourceEncoding::Latin1
        );
        assert_eq!(
            SourceEncoding::sniff(b"# vim: set fileencoding=ISO_8859_1 :\n"),
            SourceEncoding::Latin1
        );
        assert_eq!(
            SourceEncoding::sniff(b"\n\n# coding: latin-1\n"),
            SourceEncoding::Utf8
        );
    }

    #[test]
    fn unknown_declaration_falls_back() {
        assert_eq!(
            SourceEncoding::sniff(b"# coding: klingon\n"),
            SourceEncoding::Utf8
        );
    }

    #[test]
    fn invalid_utf8_round_trips_as_latin1() {
        let bytes = b"x = b'\xff\xfe'\n";
        let encoding = SourceEncoding::sniff(bytes);
        assert_eq!(encoding, SourceEncoding::Latin1);
        assert_eq!(encoding.encode(&encoding.decode(bytes)), bytes.to_vec());
        assert_eq!(
            SourceEncoding::sniff(b"# coding: utf-8\n\xff\n"),
            SourceEncoding::Latin1
        );
    }

    #[test]
    fn bom_round_trips() {
        let bytes = b"\xef\xbb\xbfif WITH_A:\n";
        let encoding = SourceEncoding::sniff(bytes);
        assert_eq!(encoding, SourceEncoding::Utf8Bom);
        let text = encoding.decode(bytes);
        assert_eq!(text, "if WITH_A:\n");
        assert_eq!(encoding.encode(&text), bytes.to_vec());
    }

    #[test]
    fn latin1_round_trips_and_replaces_wide_chars() {
        let bytes = b"caf\xe9\n";
        let text = SourceEncoding::Latin1.decode(bytes);
        assert_eq!(text, "café\n");
        assert_eq!(SourceEncoding::Latin1.encode(&text), bytes.to_vec());
        assert_eq!(SourceEncoding::Latin1.encode("€"), b"?".to_vec());
    }
}
