//! `GET /audio`: streams the current utterance as it is synthesized

use crate::http::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use cliptalk_core::{AudioBuffer, ReadOutcome};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use tracing::debug;

pub async fn audio_handler(State(state): State<AppState>) -> Response {
    // Later buffer swaps do not affect this response
    let Some(buffer) = state.session.current_buffer() else {
        return (StatusCode::NOT_FOUND, "no audio selected").into_response();
    };

    debug!("Streaming audio buffer {}", buffer.id());
    let media_type = buffer.media_type().to_string();

    (
        [
            (header::CONTENT_TYPE, media_type),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(chunks(buffer)),
    )
        .into_response()
}

/// Chunks of `buffer` up to its terminal marker
pub fn chunks(buffer: AudioBuffer) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    stream::unfold(buffer, |buffer| async move {
        match buffer.read().await {
            ReadOutcome::Chunk(chunk) => Some((Ok(chunk), buffer)),
            ReadOutcome::EndOfStream => {
                debug!("Audio buffer {} drained", buffer.id());
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_chunks_end_at_shutdown() {
        let buffer = AudioBuffer::new("audio/wav");
        assert!(!buffer.write(Bytes::from_static(b"ab")).await.is_closed());
        assert!(!buffer.write(Bytes::from_static(b"cd")).await.is_closed());
        buffer.shutdown(false);

        let collected: Vec<Bytes> = chunks(buffer)
            .map(|chunk| chunk.unwrap_or_default())
            .collect()
            .await;
        assert_eq!(collected, vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")]);
    }
}
