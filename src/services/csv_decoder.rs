//! Streaming CSV decoding of flashcard rows.
//!
//! Bytes are pushed through a `csv_core` reader chunk by chunk, so rows become
//! available as soon as their line has arrived and the object is never held in
//! memory as a whole. Columns are positional (question, answer); the first
//! line is data like any other.

use crate::models::flashcard::FlashcardRow;
use bytes::Bytes;
use csv_core::{ReadRecordResult, Reader, ReaderBuilder};
use futures::{Stream, StreamExt, stream};
use std::{collections::VecDeque, io, mem};
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("object stream ended abnormally")]
    Stream(#[from] io::Error),
}

/// Decode a byte stream into flashcard rows, lazily and in order.
///
/// The returned stream ends once the body ends; a read error is yielded once
/// and terminates it. Rows with too few columns are padded with empty
/// strings, extra columns are ignored and blank lines are skipped.
pub fn decode_rows<S>(body: S) -> impl Stream<Item = Result<FlashcardRow, DecodeError>> + Send
where
    S: Stream<Item = io::Result<Bytes>> + Send + Unpin,
{
    let state = DecodeState {
        body,
        decoder: RowDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(row) = state.pending.pop_front() {
                return Some((Ok(row), state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    if !chunk.is_empty() {
                        state.decoder.feed(&chunk, &mut state.pending);
                    }
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(DecodeError::Stream(err)), state));
                }
                None => {
                    state.decoder.finish(&mut state.pending);
                    state.done = true;
                }
            }
        }
    })
}

struct DecodeState<S> {
    body: S,
    decoder: RowDecoder,
    pending: VecDeque<FlashcardRow>,
    done: bool,
}

/// Incremental record assembler around `csv_core::Reader`.
///
/// Field bytes and field end offsets accumulate across chunks until the
/// reader reports a complete record.
struct RowDecoder {
    reader: Reader,
    output: Vec<u8>,
    outlen: usize,
    ends: Vec<usize>,
    endlen: usize,
    /// Leading bytes held back until a BOM can be ruled in or out.
    head: Option<Vec<u8>>,
}

impl RowDecoder {
    fn new() -> Self {
        Self {
            reader: ReaderBuilder::new().build(),
            output: vec![0; 1024],
            outlen: 0,
            ends: vec![0; 4],
            endlen: 0,
            head: Some(Vec::new()),
        }
    }

    /// Feed one non-empty chunk, pushing every completed row onto `rows`.
    fn feed(&mut self, input: &[u8], rows: &mut VecDeque<FlashcardRow>) {
        let Some(mut head) = self.head.take() else {
            return self.drive(input, rows);
        };

        head.extend_from_slice(input);
        if head.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&head) {
            self.head = Some(head);
            return;
        }
        let data = head.strip_prefix(UTF8_BOM).unwrap_or(&head[..]);
        if !data.is_empty() {
            self.drive(data, rows);
        }
    }

    /// Signal end of input and flush a trailing row without a line terminator.
    fn finish(&mut self, rows: &mut VecDeque<FlashcardRow>) {
        if let Some(head) = self.head.take() {
            if !head.is_empty() {
                self.drive(&head, rows);
            }
        }
        self.drive(&[], rows);
    }

    /// An empty `input` tells `csv_core` the stream has ended.
    fn drive(&mut self, mut input: &[u8], rows: &mut VecDeque<FlashcardRow>) {
        let eof = input.is_empty();
        loop {
            let (result, nin, nout, nend) = self.reader.read_record(
                input,
                &mut self.output[self.outlen..],
                &mut self.ends[self.endlen..],
            );
            input = &input[nin..];
            self.outlen += nout;
            self.endlen += nend;

            match result {
                ReadRecordResult::InputEmpty => return,
                ReadRecordResult::OutputFull => {
                    let len = self.output.len();
                    self.output.resize(len * 2, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len();
                    self.ends.resize(len * 2, 0);
                }
                ReadRecordResult::Record => {
                    let row = self.take_row();
                    rows.push_back(row);
                    if input.is_empty() && !eof {
                        return;
                    }
                }
                ReadRecordResult::End => return,
            }
        }
    }

    /// Missing columns become empty strings; columns past the second are
    /// dropped. Blank lines never get here: the reader discards line
    /// terminators at the start of a record.
    fn take_row(&mut self) -> FlashcardRow {
        let ends = &self.ends[..mem::take(&mut self.endlen)];
        self.outlen = 0;

        let mut fields = Vec::with_capacity(2);
        let mut start = 0;
        for &end in ends.iter().take(2) {
            fields.push(String::from_utf8_lossy(&self.output[start..end]).into_owned());
            start = end;
        }

        let mut fields = fields.into_iter();
        FlashcardRow {
            question: fields.next().unwrap_or_default(),
            answer: fields.next().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::ErrorKind;

    fn row(question: &str, answer: &str) -> FlashcardRow {
        FlashcardRow {
            question: question.into(),
            answer: answer.into(),
        }
    }

    async fn decode_chunks(chunks: &[&'static [u8]]) -> Vec<FlashcardRow> {
        let body = stream::iter(
            chunks
                .iter()
                .map(|chunk| Ok::<_, io::Error>(Bytes::from_static(*chunk))),
        );
        decode_rows(body).try_collect().await.unwrap()
    }

    /// Split `input` into chunks of `size` bytes.
    async fn decode_in_pieces(input: &'static [u8], size: usize) -> Vec<FlashcardRow> {
        let pieces: Vec<&'static [u8]> = input.chunks(size).collect();
        decode_chunks(&pieces).await
    }

    #[tokio::test]
    async fn decodes_rows_in_order() {
        let rows = decode_chunks(&[
            b"What is TCP?,A transport protocol\nWhat is UDP?,Another protocol\n",
        ])
        .await;
        assert_eq!(
            rows,
            vec![
                row("What is TCP?", "A transport protocol"),
                row("What is UDP?", "Another protocol"),
            ]
        );
    }

    #[tokio::test]
    async fn first_line_is_data() {
        let rows = decode_chunks(&[b"question,answer\nq,a\n"]).await;
        assert_eq!(rows, vec![row("question", "answer"), row("q", "a")]);
    }

    #[tokio::test]
    async fn rows_survive_arbitrary_chunk_boundaries() {
        let input: &'static [u8] =
            b"\"What, exactly?\",\"Line one\nLine two\"\r\nplain,\"say \"\"hi\"\"\"\r\n";
        let expected = vec![
            row("What, exactly?", "Line one\nLine two"),
            row("plain", "say \"hi\""),
        ];
        for size in [1, 2, 3, 7, 64] {
            assert_eq!(decode_in_pieces(input, size).await, expected, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn long_fields_grow_the_buffer() {
        let long = "x".repeat(5000);
        let input = format!("{long},{long}\n");
        let body = stream::iter(vec![Ok(Bytes::from(input))]);
        let rows: Vec<FlashcardRow> = decode_rows(body).try_collect().await.unwrap();
        assert_eq!(rows, vec![row(&long, &long)]);
    }

    #[tokio::test]
    async fn malformed_rows_pass_through() {
        let rows = decode_chunks(&[b"only a question\nq,a,extra,columns\n,\n"]).await;
        assert_eq!(
            rows,
            vec![row("only a question", ""), row("q", "a"), row("", "")]
        );
    }

    #[tokio::test]
    async fn final_row_without_newline_is_flushed() {
        let rows = decode_chunks(&[b"q1,a1\nq2,", b"a2"]).await;
        assert_eq!(rows, vec![row("q1", "a1"), row("q2", "a2")]);
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let rows = decode_chunks(&[b"q1,a1\n\n\r\nq2,a2\n\n"]).await;
        assert_eq!(rows, vec![row("q1", "a1"), row("q2", "a2")]);
    }

    #[tokio::test]
    async fn quoted_empty_line_is_a_row() {
        let rows = decode_chunks(&[b"q1,a1\n\"\"\nq2,a2\n"]).await;
        assert_eq!(rows, vec![row("q1", "a1"), row("", ""), row("q2", "a2")]);

        let rows = decode_in_pieces(b"q1,a1\r\n\"\"\r\n\r\n", 1).await;
        assert_eq!(rows, vec![row("q1", "a1"), row("", "")]);
    }

    #[tokio::test]
    async fn empty_body_yields_no_rows() {
        assert!(decode_chunks(&[]).await.is_empty());
        assert!(decode_chunks(&[b"", b""]).await.is_empty());
    }

    #[tokio::test]
    async fn byte_order_mark_is_stripped() {
        let input: &'static [u8] = b"\xEF\xBB\xBFq,a\n";
        for size in [1, 2, 4, 16] {
            assert_eq!(decode_in_pieces(input, size).await, vec![row("q", "a")]);
        }
        // A lone BOM prefix that never completes is kept as data.
        let rows = decode_chunks(&[b"\xEF\xBB"]).await;
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let rows = decode_chunks(&[b"caf\xE9,ok\n"]).await;
        assert_eq!(rows, vec![row("caf\u{FFFD}", "ok")]);
    }

    #[tokio::test]
    async fn read_error_ends_the_stream() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"q1,a1\nq2,")),
            Err(io::Error::new(ErrorKind::ConnectionReset, "reset by peer")),
            Ok(Bytes::from_static(b"a2\n")),
        ]);
        let mut rows = Box::pin(decode_rows(body));

        assert_eq!(rows.next().await.unwrap().unwrap(), row("q1", "a1"));
        assert!(matches!(
            rows.next().await,
            Some(Err(DecodeError::Stream(_)))
        ));
        assert!(rows.next().await.is_none());
    }
}
