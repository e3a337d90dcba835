use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Re-encodes a byte stream in a declared charset into UTF-8 chunks.
///
/// Byte sequences that are malformed in the declared charset fail the stream
/// with `InvalidData` rather than being replaced with U+FFFD.
pub struct Utf8Transcoder {
    decoder: encoding_rs::Decoder,
    charset: &'static encoding_rs::Encoding,
    finished: bool,
}

impl Utf8Transcoder {
    pub fn new(charset: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: charset.new_decoder_without_bom_handling(),
            charset,
            finished: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> io::Result<Option<BytesMut>> {
        let cap = self
            .decoder
            .max_utf8_buffer_length_without_replacement(src.len())
            .unwrap_or_else(|| src.len() * 3 + 4);
        let mut out = vec![0; cap];

        let (result, read, written) =
            self.decoder
                .decode_to_utf8_without_replacement(src, &mut out, last);
        src.advance(read);

        if let encoding_rs::DecoderResult::Malformed(_, _) = result {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed {} byte sequence in upload", self.charset.name()),
            ));
        }
        if written == 0 {
            return Ok(None);
        }
        out.truncate(written);
        Ok(Some(BytesMut::from(&out[..])))
    }
}

impl Decoder for Utf8Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        self.transcode(src, false)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // the decoder must not be fed again once flushed
        if self.finished {
            return Ok(None);
        }
        self.finished = true;
        let chunk = self.transcode(buf, true)?;
        buf.clear();
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_bytes_become_utf8() -> io::Result<()> {
        let mut t = Utf8Transcoder::new(encoding_rs::WINDOWS_1252);
        let mut src = BytesMut::from(&b"Symbol,Caf\xe9\n"[..]);
        let out = t.decode(&mut src)?.expect("chunk");
        assert_eq!(std::str::from_utf8(&out).ok(), Some("Symbol,Café\n"));
        assert!(src.is_empty());
        Ok(())
    }

    #[test]
    fn split_utf16_code_unit_waits_for_more_input() -> io::Result<()> {
        let mut t = Utf8Transcoder::new(encoding_rs::UTF_16LE);
        let mut src = BytesMut::from(&b"A\x00B"[..]);
        let out = t.decode(&mut src)?.expect("chunk");
        assert_eq!(&out[..], b"A");

        let mut rest = BytesMut::from(&b"\x00"[..]);
        let out = t.decode_eof(&mut rest)?.expect("tail");
        assert_eq!(&out[..], b"B");
        Ok(())
    }

    #[test]
    fn malformed_sequence_is_invalid_data() {
        let mut t = Utf8Transcoder::new(encoding_rs::UTF_16LE);
        // unpaired low surrogate
        let mut src = BytesMut::from(&b"\x00\xdcA\x00"[..]);
        let err = t.decode(&mut src).expect_err("malformed");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
