use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::traits::ChunkStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineEvent {
    Chunk(String),
    Done,
    Skip,
}

/// Splits a streaming HTTP body into lines and forwards parsed chunks.
///
/// The reader task stops as soon as the receiving side is dropped, which
/// also drops the underlying connection.
pub(crate) fn spawn_line_stream(
    response: reqwest::Response,
    parse_line: fn(&str) -> LineEvent,
) -> ChunkStream {
    let (tx, rx) = tokio::sync::mpsc::channel::<anyhow::Result<String>>(256);

    tokio::spawn(async move {
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tx.send(Err(anyhow::anyhow!("Stream interrupted: {}", e))).await;
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_line(&String::from_utf8_lossy(&line)) {
                    LineEvent::Chunk(text) => {
                        if tx.send(Ok(text)).await.is_err() {
                            return;
                        }
                    }
                    LineEvent::Done => return,
                    LineEvent::Skip => {}
                }
            }
        }

        if let LineEvent::Chunk(text) = parse_line(&String::from_utf8_lossy(&buffer)) {
            let _ = tx.send(Ok(text)).await;
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

pub(crate) async fn error_for_status(
    vendor: &str,
    response: reqwest::Response,
) -> anyhow::Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(anyhow::anyhow!("{} API error ({}): {}", vendor, status, error_text))
}
