//! Line reader
//!
//! Turns the byte stream of a session into [`LogLine`]s and hands each one
//! to a [`LineSink`] as soon as it is complete.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;

use tl_core::LogLine;

use crate::transport::ByteSource;

/// Lines longer than this are split into several lines.
///
/// `tail -f` on a device tty log normally emits short lines; the cap keeps a
/// missing newline from growing the buffer without limit.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Receives lines from the reader
///
/// `push` is called on the reader task for every line and must not block.
pub trait LineSink: Send + Sync {
    /// Accept one line
    fn push(&self, line: LogLine);
}

/// Assigns sequence ids to lines as they are created
#[derive(Debug, Default)]
pub struct LineSequence {
    last: AtomicU64,
}

impl LineSequence {
    /// Create a sequence whose first id is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next id
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The last id handed out (0 if none)
    pub fn last_id(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Why [`read_lines`] returned
#[derive(Debug)]
pub enum ReadOutcome {
    /// The remote side ended the stream
    EndOfStream,
    /// Reading failed mid-stream
    ReadError { cause: io::Error },
    /// The cancellation token fired
    Cancelled,
}

impl ReadOutcome {
    /// Whether the retry loop should try to reconnect after this outcome
    pub fn should_reconnect(&self) -> bool {
        !matches!(self, ReadOutcome::Cancelled)
    }
}

/// Splits bytes on `\n` into text lines
///
/// A trailing `\r` is stripped and invalid UTF-8 is replaced rather than
/// rejected, so a corrupted byte never ends the stream.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// How far into the buffer has already been searched for `\n`
    next_index: usize,
}

impl LineCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self { next_index: 0 }
    }

    /// Where to cut an overlong line: at the cap, backed off so a UTF-8
    /// character is not torn in two
    fn split_point(src: &[u8]) -> usize {
        let is_continuation = |b: u8| b & 0xC0 == 0x80;
        (MAX_LINE_LENGTH.saturating_sub(3)..=MAX_LINE_LENGTH)
            .rev()
            .find(|&cut| cut > 0 && !is_continuation(src[cut]))
            .unwrap_or(MAX_LINE_LENGTH)
    }

    fn to_text(bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // One past the cap, so a terminator right after a full-length line
        // still ends it instead of forcing a split
        let search_end = src.len().min(MAX_LINE_LENGTH + 1);
        let start = self.next_index.min(search_end);
        let newline = src[start..search_end]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| start + offset);

        match newline {
            Some(index) => {
                self.next_index = 0;
                let line = src.split_to(index + 1);
                Ok(Some(Self::to_text(&line[..index])))
            }
            None if src.len() > MAX_LINE_LENGTH => {
                self.next_index = 0;
                let cut = Self::split_point(src);
                let line = src.split_to(cut);
                Ok(Some(Self::to_text(&line)))
            }
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => {
                self.next_index = 0;
                let rest = src.split();
                Ok(Some(Self::to_text(&rest)))
            }
        }
    }
}

/// Read lines from `source` until it ends, fails, or `cancel` fires.
///
/// Every completed line gets the next id from `sequence` and goes to `sink`
/// before the next chunk is read. A partial last line is delivered at end of
/// stream but dropped on error or cancellation.
pub async fn read_lines<S>(
    source: &mut S,
    sink: &dyn LineSink,
    sequence: &LineSequence,
    cancel: &CancellationToken,
) -> ReadOutcome
where
    S: ByteSource + ?Sized,
{
    let mut codec = LineCodec::new();
    let mut buffer = BytesMut::with_capacity(8192);
    let mut line_count: u64 = 0;

    tracing::debug!("Started reading from stream");

    let outcome = loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => break ReadOutcome::Cancelled,
            chunk = source.read_chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                buffer.extend_from_slice(&bytes);
                while let Ok(Some(text)) = codec.decode(&mut buffer) {
                    line_count += 1;
                    emit(sink, sequence, text, line_count);
                }
            }
            Ok(None) => {
                if let Ok(Some(text)) = codec.decode_eof(&mut buffer) {
                    line_count += 1;
                    emit(sink, sequence, text, line_count);
                }
                tracing::warn!("Stream ended after {} lines", line_count);
                break ReadOutcome::EndOfStream;
            }
            Err(cause) => {
                tracing::warn!("Error reading stream after {} lines: {}", line_count, cause);
                break ReadOutcome::ReadError { cause };
            }
        }
    };

    tracing::debug!("Reading loop ended, total lines: {}", line_count);
    outcome
}

fn emit(sink: &dyn LineSink, sequence: &LineSequence, text: String, line_count: u64) {
    if line_count <= 5 || line_count % 100 == 0 {
        let preview: String = text.chars().take(50).collect();
        tracing::debug!("Received line #{}: {}", line_count, preview);
    }
    sink.push(LogLine::new(sequence.next_id(), text));
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Yields the scripted chunks, then the final result forever
    struct ScriptedSource {
        chunks: VecDeque<io::Result<Option<Bytes>>>,
        pending_forever: bool,
    }

    impl ScriptedSource {
        fn new(chunks: Vec<io::Result<Option<Bytes>>>) -> Self {
            Self {
                chunks: chunks.into(),
                pending_forever: false,
            }
        }
    }

    #[async_trait]
    impl ByteSource for ScriptedSource {
        async fn read_chunk(&mut self) -> io::Result<Option<Bytes>> {
            match self.chunks.pop_front() {
                Some(chunk) => chunk,
                None if self.pending_forever => std::future::pending().await,
                None => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct CollectSink {
        lines: Mutex<Vec<LogLine>>,
    }

    impl LineSink for CollectSink {
        fn push(&self, line: LogLine) {
            self.lines.lock().unwrap().push(line);
        }
    }

    impl CollectSink {
        fn texts(&self) -> Vec<String> {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .map(|l| l.text.clone())
                .collect()
        }
    }

    fn chunk(s: &str) -> io::Result<Option<Bytes>> {
        Ok(Some(Bytes::copy_from_slice(s.as_bytes())))
    }

    #[test]
    fn test_codec_splits_and_strips_cr() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("one\r\ntwo\nthr");

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("one"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("two"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"ee\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("three"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_lossy_utf8() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"ok \xff bad\n"[..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("ok \u{fffd} bad")
        );
    }

    #[test]
    fn test_codec_splits_overlong_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'a'; MAX_LINE_LENGTH + 10]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.len(), MAX_LINE_LENGTH);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap().unwrap().len(), 10);
    }

    #[test]
    fn test_codec_split_keeps_utf8_intact() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'a'; MAX_LINE_LENGTH - 1]);
        // Two-byte character straddling the cap
        buf.extend_from_slice("éb\n".as_bytes());

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.len(), MAX_LINE_LENGTH - 1);
        assert!(!first.contains('\u{fffd}'));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("éb"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_crlf_at_cap_is_one_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'a'; MAX_LINE_LENGTH - 1]);
        buf.extend_from_slice(b"\r\nnext\n");

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.len(), MAX_LINE_LENGTH - 1);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("next"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_codec_full_length_line_not_split() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'a'; MAX_LINE_LENGTH]);
        buf.extend_from_slice(b"\n");

        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_LENGTH);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_eof_flushes_partial() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("tail");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("tail"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[tokio::test]
    async fn test_lines_across_chunks_then_eof() {
        let mut source = ScriptedSource::new(vec![
            chunk("boot: st"),
            chunk("arting\nnet: up\n"),
            chunk("partial"),
        ]);
        let sink = CollectSink::default();
        let sequence = LineSequence::new();
        let cancel = CancellationToken::new();

        let outcome = read_lines(&mut source, &sink, &sequence, &cancel).await;

        assert!(matches!(outcome, ReadOutcome::EndOfStream));
        assert!(outcome.should_reconnect());
        assert_eq!(sink.texts(), vec!["boot: starting", "net: up", "partial"]);

        let ids: Vec<u64> = sink.lines.lock().unwrap().iter().map(|l| l.seq).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(sequence.last_id(), 3);
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let mut source = ScriptedSource::new(vec![
            chunk("a\n"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let sink = CollectSink::default();

        let outcome = read_lines(
            &mut source,
            &sink,
            &LineSequence::new(),
            &CancellationToken::new(),
        )
        .await;

        match outcome {
            ReadOutcome::ReadError { cause } => {
                assert_eq!(cause.kind(), io::ErrorKind::ConnectionReset)
            }
            other => panic!("Expected ReadError, got {:?}", other),
        }
        assert_eq!(sink.texts(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_blocked_read() {
        let mut source = ScriptedSource::new(vec![chunk("x\n")]);
        source.pending_forever = true;
        let sink = CollectSink::default();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = read_lines(&mut source, &sink, &LineSequence::new(), &cancel).await;
        assert!(matches!(outcome, ReadOutcome::Cancelled));
        assert!(!outcome.should_reconnect());
        assert_eq!(sink.texts(), vec!["x"]);
    }

    #[test]
    fn test_sequence_continues() {
        let sequence = LineSequence::new();
        assert_eq!(sequence.last_id(), 0);
        assert_eq!(sequence.next_id(), 1);
        assert_eq!(sequence.next_id(), 2);
        assert_eq!(sequence.last_id(), 2);
    }
}
