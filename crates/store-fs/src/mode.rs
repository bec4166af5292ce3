//! Text and binary content modes
//!
//! A store either treats file contents as text in a fixed encoding or as raw
//! bytes. The choice is made once, when the store is built.

use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Encoding used for text-mode stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "utf-16le", alias = "utf16le")]
    Utf16Le,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
        }
    }

    fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        match self {
            Self::Utf8 => Cow::Borrowed(text.as_bytes()),
            Self::Utf16Le => Cow::Owned(
                text.encode_utf16()
                    .flat_map(u16::to_le_bytes)
                    .collect(),
            ),
        }
    }

    fn decode(&self, bytes: Vec<u8>) -> Option<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes).ok(),
            Self::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return None;
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            }
        }
    }

    fn accepts(&self, bytes: &[u8]) -> bool {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).is_ok(),
            Self::Utf16Le => self.decode(bytes.to_vec()).is_some(),
        }
    }
}

/// How a store interprets file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Text(TextEncoding),
    Binary,
}

impl Default for FileType {
    fn default() -> Self {
        Self::Text(TextEncoding::Utf8)
    }
}

impl FileType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary => "binary",
        }
    }

    pub fn encoding(&self) -> Option<TextEncoding> {
        match self {
            Self::Text(encoding) => Some(*encoding),
            Self::Binary => None,
        }
    }

    /// Turn a write payload into the bytes stored on disk.
    pub(crate) fn encode<'a>(&self, data: Data<'a>) -> Result<Cow<'a, [u8]>> {
        match (self, data) {
            (Self::Text(encoding), Data::Text(text)) => Ok(encoding.encode(text)),
            (Self::Text(encoding), Data::Bytes(bytes)) if encoding.accepts(bytes) => {
                Ok(Cow::Borrowed(bytes))
            }
            (Self::Text(_), Data::Bytes(_)) => Err(Error::ModeMismatch {
                expected: "text",
                found: "undecodable bytes",
            }),
            (Self::Binary, Data::Bytes(bytes)) => Ok(Cow::Borrowed(bytes)),
            (Self::Binary, Data::Text(_)) => Err(Error::ModeMismatch {
                expected: "binary",
                found: "text",
            }),
        }
    }

    /// Interpret bytes read from `path`.
    pub(crate) fn decode(&self, path: &Path, bytes: Vec<u8>) -> Result<Content> {
        match self {
            Self::Text(encoding) => encoding
                .decode(bytes)
                .map(Content::Text)
                .ok_or_else(|| Error::Decode {
                    path: path.to_path_buf(),
                    encoding: encoding.name(),
                }),
            Self::Binary => Ok(Content::Bytes(bytes)),
        }
    }
}

/// Borrowed payload handed to a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Data<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl<'a> From<&'a str> for Data<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(s)
    }
}

impl<'a> From<&'a String> for Data<'a> {
    fn from(s: &'a String) -> Self {
        Self::Text(s.as_str())
    }
}

impl<'a> From<&'a [u8]> for Data<'a> {
    fn from(b: &'a [u8]) -> Self {
        Self::Bytes(b)
    }
}

impl<'a> From<&'a Vec<u8>> for Data<'a> {
    fn from(b: &'a Vec<u8>) -> Self {
        Self::Bytes(b.as_slice())
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Data<'a> {
    fn from(b: &'a [u8; N]) -> Self {
        Self::Bytes(b.as_slice())
    }
}

/// Owned payload returned by a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// Raw bytes of binary content, or the UTF-8 bytes of decoded text.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_mode_refuses_text() {
        let err = FileType::Binary.encode(Data::from("hi")).unwrap_err();
        assert!(matches!(err, Error::ModeMismatch { expected: "binary", .. }));
    }

    #[test]
    fn text_mode_accepts_valid_bytes() {
        let bytes = FileType::default().encode(Data::from(b"plain")).unwrap();
        assert_eq!(bytes.as_ref(), b"plain");
        assert!(FileType::default().encode(Data::from(&[0xffu8, 0xfe, 0xfd])).is_err());
    }

    #[test]
    fn utf16_text_is_encoded_little_endian() {
        let file_type = FileType::Text(TextEncoding::Utf16Le);
        let bytes = file_type.encode(Data::from("hi")).unwrap();
        assert_eq!(bytes.as_ref(), &[b'h', 0, b'i', 0]);

        let content = file_type.decode(Path::new("x"), bytes.into_owned()).unwrap();
        assert_eq!(content.as_text(), Some("hi"));
    }

    #[test]
    fn odd_length_utf16_fails_to_decode() {
        let file_type = FileType::Text(TextEncoding::Utf16Le);
        let err = file_type.decode(Path::new("x"), vec![b'h']).unwrap_err();
        assert!(matches!(err, Error::Decode { encoding: "utf-16le", .. }));
    }
}
