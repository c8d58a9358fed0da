//! Record codec — JSON values written back to back on a stream.
//!
//! Each record is one compact JSON value followed by a newline. Compact
//! JSON never contains a raw newline, so a reader only parses once a
//! newline has arrived, and a line that does not hold a whole value is
//! malformed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ProtocolError;

/// Maximum size of a single record in bytes.
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

const READ_CHUNK: usize = 64 * 1024;

/// Encode one record.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(value).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    if bytes.len() > MAX_RECORD_SIZE {
        return Err(ProtocolError::RecordTooLarge {
            size: bytes.len(),
            max: MAX_RECORD_SIZE,
        });
    }
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode the first record in `data`.
///
/// Returns the value and the number of bytes it occupied, or `Ok(None)`
/// when `data` holds only whitespace or an incomplete record.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<Option<(T, usize)>, ProtocolError> {
    let mut stream = serde_json::Deserializer::from_slice(data).into_iter::<T>();
    match stream.next() {
        None => Ok(None),
        Some(Ok(value)) => Ok(Some((value, stream.byte_offset()))),
        Some(Err(e)) if e.is_eof() => Ok(None),
        Some(Err(e)) => Err(ProtocolError::Malformed(e.to_string())),
    }
}

/// Write one record and flush.
pub async fn write_record<W, T>(writer: &mut W, value: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = encode(value)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads records one at a time from a byte stream, keeping whatever
/// follows the current record for the next call.
pub struct RecordReader<R> {
    inner: R,
    buf: Vec<u8>,
    /// Bytes of `buf` already searched for a newline.
    scanned: usize,
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            scanned: 0,
        }
    }

    /// Read the next record.
    ///
    /// `Ok(None)` means the peer closed the stream cleanly between records.
    /// A close in the middle of a record is [`ProtocolError::UnexpectedEof`].
    pub async fn read_record<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        loop {
            if let Some(value) = self.next_line()? {
                return Ok(Some(value));
            }
            if self.buf.len() > MAX_RECORD_SIZE {
                return Err(ProtocolError::RecordTooLarge {
                    size: self.buf.len(),
                    max: MAX_RECORD_SIZE,
                });
            }

            let start = self.buf.len();
            self.buf.resize(start + READ_CHUNK, 0);
            let n = self.inner.read(&mut self.buf[start..]).await;
            let n = match n {
                Ok(n) => n,
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e.into());
                }
            };
            self.buf.truncate(start + n);

            if n == 0 {
                // A final record may arrive without its newline.
                if let Some((value, used)) = decode::<T>(&self.buf)? {
                    self.consume(used);
                    return Ok(Some(value));
                }
                if self.buf.iter().all(u8::is_ascii_whitespace) {
                    self.consume(self.buf.len());
                    return Ok(None);
                }
                return Err(ProtocolError::UnexpectedEof);
            }
        }
    }

    /// Decode the first complete line, searching only bytes not yet seen.
    fn next_line<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset + 1;
            if let Some((value, used)) = decode::<T>(&self.buf[..end])? {
                self.consume(used);
                return Ok(Some(value));
            }
            if !self.buf[..end].iter().all(u8::is_ascii_whitespace) {
                return Err(ProtocolError::Malformed("record spans a line break".into()));
            }
            self.consume(end);
        }
        self.scanned = self.buf.len();
        Ok(None)
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
        self.scanned = 0;
    }

    /// Whether bytes beyond the last returned record are buffered.
    pub fn has_buffered(&self) -> bool {
        !self.buf.iter().all(u8::is_ascii_whitespace)
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Header, RequestKind};
    use tokio::io::duplex;

    #[test]
    fn decode_reports_consumed_bytes() {
        let bytes = encode(&Header::new(RequestKind::LastBlock)).unwrap();
        let (header, used): (Header, usize) = decode(&bytes).unwrap().unwrap();
        assert_eq!(header.kind().unwrap(), RequestKind::LastBlock);
        assert!(used <= bytes.len());
    }

    #[test]
    fn incomplete_record_needs_more() {
        let bytes = encode(&vec![1u8, 2, 3]).unwrap();
        assert!(decode::<Vec<u8>>(&bytes[..bytes.len() - 3]).unwrap().is_none());
        assert!(decode::<Vec<u8>>(b"   \n").unwrap().is_none());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode::<Header>(b"}{"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn back_to_back_records_split_across_reads() {
        let (mut client, server) = duplex(8);
        let writer = tokio::spawn(async move {
            write_record(&mut client, &Header::new(RequestKind::BlockByHash))
                .await
                .unwrap();
            write_record(&mut client, &[7u8; 32]).await.unwrap();
            write_record(&mut client, &Option::<u8>::None).await.unwrap();
        });

        let mut reader = RecordReader::new(server);
        let header: Header = reader.read_record().await.unwrap().unwrap();
        assert_eq!(header.kind().unwrap(), RequestKind::BlockByHash);
        let hash: [u8; 32] = reader.read_record().await.unwrap().unwrap();
        assert_eq!(hash, [7u8; 32]);
        let sentinel: Option<Option<u8>> = reader.read_record().await.unwrap();
        assert_eq!(sentinel, Some(None));

        writer.await.unwrap();
        assert!(reader.read_record::<Header>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn large_record_arrives_in_many_chunks() {
        let payload: Vec<u8> = (0..400_000u32).map(|i| i as u8).collect();
        let expected = payload.clone();
        let (mut client, server) = duplex(READ_CHUNK);
        let writer = tokio::spawn(async move {
            write_record(&mut client, &payload).await.unwrap();
            write_record(&mut client, &Header::new(RequestKind::LastBlock))
                .await
                .unwrap();
        });

        let mut reader = RecordReader::new(server);
        let got: Vec<u8> = reader.read_record().await.unwrap().unwrap();
        assert_eq!(got, expected);
        let header: Header = reader.read_record().await.unwrap().unwrap();
        assert_eq!(header.kind().unwrap(), RequestKind::LastBlock);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let (mut client, server) = duplex(64);
        client.write_all(b"\n\n{\"t\":44}\n\n").await.unwrap();
        drop(client);

        let mut reader = RecordReader::new(server);
        let header: Header = reader.read_record().await.unwrap().unwrap();
        assert_eq!(header.kind().unwrap(), RequestKind::LastBlock);
        assert!(!reader.has_buffered());
        assert!(reader.read_record::<Header>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_split_over_lines_is_malformed() {
        let (mut client, server) = duplex(64);
        client.write_all(b"{\"t\":\n44}\n").await.unwrap();

        let mut reader = RecordReader::new(server);
        assert!(matches!(
            reader.read_record::<Header>().await,
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn close_inside_record_is_an_error() {
        let (mut client, server) = duplex(64);
        client.write_all(b"{\"t\":4").await.unwrap();
        drop(client);

        let mut reader = RecordReader::new(server);
        assert!(matches!(
            reader.read_record::<Header>().await,
            Err(ProtocolError::UnexpectedEof)
        ));
    }
}
