//! Turns a model chunk stream into response body bytes

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Result;
use crate::providers::ChunkStream;

/// Wire framing applied to each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Chunks passed through unchanged
    Plain,
    /// Server-Sent Events, one frame per chunk
    Sse,
}

/// Body stream of framed chunks
pub type FramedStream = BoxStream<'static, Result<Bytes>>;

/// Frame one chunk as a single SSE event.
///
/// Each line of the chunk gets its own `data: ` field so line breaks never end
/// the frame early.
pub fn sse_frame(chunk: &str) -> String {
    let mut frame = String::with_capacity(chunk.len() + 8);
    for line in chunk.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line.strip_suffix('\r').unwrap_or(line));
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// A stream that ends immediately
pub fn empty() -> FramedStream {
    stream::empty().boxed()
}

struct FrameState {
    chunks: ChunkStream,
    mode: StreamMode,
    emitted: usize,
    failed: bool,
}

/// Frame every non-empty chunk according to `mode`.
///
/// Each chunk is logged at debug level and the final count at info level. A model
/// error is forwarded once and ends the stream.
pub fn frame(mode: StreamMode, chunks: ChunkStream) -> FramedStream {
    let state = FrameState {
        chunks,
        mode,
        emitted: 0,
        failed: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.failed {
            return None;
        }
        loop {
            match st.chunks.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => {
                    st.emitted += 1;
                    tracing::debug!("Chunk {}: {:?}", st.emitted, chunk);
                    let bytes = match st.mode {
                        StreamMode::Plain => Bytes::from(chunk),
                        StreamMode::Sse => Bytes::from(sse_frame(&chunk)),
                    };
                    return Some((Ok(bytes), st));
                }
                Some(Err(e)) => {
                    tracing::error!("Generation failed after {} chunks: {}", st.emitted, e);
                    st.failed = true;
                    return Some((Err(e), st));
                }
                None => {
                    tracing::info!("Stream finished with {} chunks", st.emitted);
                    return None;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn chunks(items: Vec<Result<String>>) -> ChunkStream {
        stream::iter(items).boxed()
    }

    async fn collect_ok(stream: FramedStream) -> String {
        let parts: Vec<Result<Bytes>> = stream.collect().await;
        parts
            .into_iter()
            .map(|p| String::from_utf8(p.unwrap().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_sse_frame() {
        assert_eq!(sse_frame("Hello"), "data: Hello\n\n");
        assert_eq!(sse_frame(" world"), "data:  world\n\n");
        assert_eq!(sse_frame("a\nb"), "data: a\ndata: b\n\n");
        assert_eq!(sse_frame("a\r\nb\n"), "data: a\ndata: b\ndata: \n\n");
    }

    #[tokio::test]
    async fn test_sse_mode_exact_bytes() {
        let out = collect_ok(frame(
            StreamMode::Sse,
            chunks(vec![Ok("Hello".into()), Ok(" world".into())]),
        ))
        .await;
        assert_eq!(out, "data: Hello\n\ndata:  world\n\n");
    }

    #[tokio::test]
    async fn test_plain_mode_passes_through_and_drops_empty() {
        let out = collect_ok(frame(
            StreamMode::Plain,
            chunks(vec![Ok("Li ".into()), Ok(String::new()), Ok("worked on Apollo".into())]),
        ))
        .await;
        assert_eq!(out, "Li worked on Apollo");
    }

    #[tokio::test]
    async fn test_error_terminates_stream() {
        let parts: Vec<Result<Bytes>> = frame(
            StreamMode::Sse,
            chunks(vec![
                Ok("partial".into()),
                Err(Error::llm("connection reset")),
                Ok("never".into()),
            ]),
        )
        .collect()
        .await;

        assert_eq!(parts.len(), 2);
        assert_eq!(&parts[0].as_ref().unwrap()[..], b"data: partial\n\n");
        assert!(matches!(parts[1], Err(Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let parts: Vec<Result<Bytes>> = empty().collect().await;
        assert!(parts.is_empty());
    }
}
