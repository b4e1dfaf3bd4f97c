//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Line codec for `tokio_util` framed transports

use crate::CodecError;
use tokio_util::bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::trace;

/// Default maximum length of a single inbound line in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Newline-delimited UTF-8 codec
///
/// Decoding strips the trailing `\n` (and a preceding `\r`). Encoding
/// appends `\n` and replaces embedded line breaks with spaces, so one
/// encoded message is always exactly one frame.
#[derive(Debug, Clone)]
pub struct ChatLineCodec {
    inner: LinesCodec,
    max_length: usize,
}

impl ChatLineCodec {
    /// Create a codec with [`DEFAULT_MAX_LINE_LENGTH`]
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec rejecting inbound lines longer than `max_length`
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    /// Get the maximum inbound line length
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn map_error(&self, error: LinesCodecError) -> CodecError {
        match error {
            LinesCodecError::MaxLineLengthExceeded => CodecError::LineTooLong(self.max_length),
            LinesCodecError::Io(e) => CodecError::Io(e),
        }
    }
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        let line = self.inner.decode(src).map_err(|e| self.map_error(e))?;
        if let Some(ref line) = line {
            trace!(length = line.len(), "Decoded line");
        }
        Ok(line)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        self.inner.decode_eof(src).map_err(|e| self.map_error(e))
    }
}

impl<T: AsRef<str>> Encoder<T> for ChatLineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), CodecError> {
        let line = line.as_ref();
        dst.reserve(line.len() + 1);
        for (index, part) in line.split(['\r', '\n']).enumerate() {
            if index > 0 {
                dst.put_u8(b' ');
            }
            dst.put_slice(part.as_bytes());
        }
        dst.put_u8(b'\n');
        Ok(())
    }
}
