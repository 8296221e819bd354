//! Line decoding for streamed HTTP bodies (NDJSON and SSE)

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use crate::error::{Error, Result};

struct LineState<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

/// Split a byte stream into lines, buffering across chunk boundaries.
///
/// Line terminators (`\n` or `\r\n`) are stripped. A trailing unterminated line is
/// emitted at end of stream. A transport error is yielded once and ends the stream.
pub fn lines<S, E>(bytes: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        inner: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.pending.pop_front() {
                return Some((Ok(line), st));
            }
            if st.finished {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    st.buffer.extend_from_slice(&chunk);
                    while let Some(pos) = st.buffer.iter().position(|b| *b == b'\n') {
                        let raw: Vec<u8> = st.buffer.drain(..=pos).collect();
                        st.pending.push_back(decode_line(&raw[..raw.len() - 1]));
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    st.buffer.clear();
                    st.pending.clear();
                    return Some((Err(Error::llm(format!("Stream error: {}", e))), st));
                }
                None => {
                    st.finished = true;
                    if !st.buffer.is_empty() {
                        let rest = std::mem::take(&mut st.buffer);
                        st.pending.push_back(decode_line(&rest));
                    }
                }
            }
        }
    })
    .boxed()
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end_matches('\r').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = std::result::Result<Bytes, String>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_lines_across_chunks() {
        let out: Vec<_> = lines(chunks(&[b"{\"a\":", b"1}\n{\"b\"", b":2}\r\n", b"tail"]))
            .collect()
            .await;
        let out: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}", "tail"]);
    }

    #[tokio::test]
    async fn test_multibyte_split() {
        let text = "données\n".as_bytes();
        let (a, b) = text.split_at(3);
        let parts: Vec<std::result::Result<Bytes, String>> =
            vec![Ok(Bytes::copy_from_slice(a)), Ok(Bytes::copy_from_slice(b))];
        let out: Vec<_> = lines(stream::iter(parts)).collect().await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "données");
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let parts: Vec<std::result::Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"one\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"never\n")),
        ];
        let out: Vec<_> = lines(stream::iter(parts)).collect().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "one");
        assert!(matches!(out[1], Err(Error::Llm(_))));
    }
}
