//! Line framing for tokio.
//!
//! [`LineCodec`] splits the receive buffer on `\n`, strips the line ending
//! and decodes the bytes with the session's character encoding (UTF-8
//! unless the `encoding` feature is enabled).

#[cfg(feature = "encoding")]
use std::borrow::Cow;

use bytes::BytesMut;
#[cfg(feature = "encoding")]
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{CodecError, ConfigError};
use crate::util::{MAX_LINE_LEN, MAX_TAGS_LENGTH};

/// Longest line accepted from the server: full tag section plus a
/// 512-byte body.
pub const MAX_FRAME_LEN: usize = MAX_TAGS_LENGTH + MAX_LINE_LEN;

/// Newline-delimited codec with an upper bound on line length.
#[derive(Debug)]
pub struct LineCodec {
    #[cfg(feature = "encoding")]
    encoding: &'static Encoding,
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    /// Skipping the tail of an oversized line up to its newline.
    discarding: bool,
}

impl LineCodec {
    /// Codec for the encoding `label` (e.g. `UTF-8`, `ISO-8859-1`).
    ///
    /// Without the `encoding` feature only UTF-8 is available and the label
    /// is ignored.
    pub fn new(_label: &str) -> Result<Self, ConfigError> {
        Ok(LineCodec {
            #[cfg(feature = "encoding")]
            encoding: Encoding::for_label(_label.as_bytes())
                .ok_or_else(|| ConfigError::UnknownEncoding(_label.to_owned()))?,
            next_index: 0,
            max_len: MAX_FRAME_LEN,
            discarding: false,
        })
    }

    /// Codec with a custom line limit.
    pub fn with_max_len(label: &str, max_len: usize) -> Result<Self, ConfigError> {
        let mut codec = Self::new(label)?;
        codec.max_len = max_len;
        Ok(codec)
    }

    /// Encoding name in use.
    pub fn encoding_name(&self) -> &'static str {
        #[cfg(feature = "encoding")]
        {
            self.encoding.name()
        }
        #[cfg(not(feature = "encoding"))]
        {
            "UTF-8"
        }
    }

    /// Forget any partially scanned line.
    pub(crate) fn reset(&mut self) {
        self.next_index = 0;
        self.discarding = false;
    }

    fn overflow(&mut self, src: &mut BytesMut, len: usize) -> CodecError {
        src.clear();
        self.next_index = 0;
        self.discarding = true;
        CodecError::LineTooLong {
            len,
            max: self.max_len,
        }
    }

    fn decode_bytes(&self, raw: &[u8]) -> Result<String, CodecError> {
        #[cfg(feature = "encoding")]
        {
            self.encoding
                .decode_without_bom_handling_and_without_replacement(raw)
                .map(Cow::into_owned)
                .ok_or(CodecError::Decode {
                    encoding: self.encoding.name(),
                })
        }
        #[cfg(not(feature = "encoding"))]
        {
            String::from_utf8(raw.to_vec()).map_err(|_| CodecError::Decode { encoding: "UTF-8" })
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        if self.discarding {
            let Some(offset) = src.iter().position(|b| *b == b'\n') else {
                src.clear();
                return Ok(None);
            };
            let _ = src.split_to(offset + 1);
            self.discarding = false;
        }

        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            if src.len() > self.max_len {
                let len = src.len();
                return Err(self.overflow(src, len));
            }
            return Ok(None);
        };

        let end = self.next_index + offset + 1;
        self.next_index = 0;
        if end > self.max_len {
            // Drop the oversized line but keep whatever follows it.
            let _ = src.split_to(end);
            return Err(CodecError::LineTooLong {
                len: end,
                max: self.max_len,
            });
        }

        let line = src.split_to(end);
        let mut body = &line[..line.len() - 1];
        if let Some(stripped) = body.strip_suffix(b"\r") {
            body = stripped;
        }
        self.decode_bytes(body).map(Some)
    }
}

impl Encoder<&str> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> Result<(), CodecError> {
        #[cfg(feature = "encoding")]
        {
            let (bytes, _, _) = self.encoding.encode(line);
            dst.extend_from_slice(&bytes);
        }
        #[cfg(not(feature = "encoding"))]
        {
            dst.extend_from_slice(line.as_bytes());
        }
        Ok(())
    }
}
