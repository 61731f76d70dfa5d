//! Server-sent event stream for live reload

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use futures_util::stream::{self, Stream};
use notegraph_watcher::Subscription;
use tracing::debug;

use crate::ServerState;

static X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Subscribe to change notifications as a `text/event-stream` body.
pub async fn event_stream(State(state): State<Arc<ServerState>>) -> Response {
    let subscription = state.bus.subscribe();
    debug!("Event stream {} opened", subscription.id());

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING.clone(), "no"),
        ],
        Body::from_stream(frames(subscription)),
    )
        .into_response()
}

/// Frames of `subscription` until it ends. The subscription is dropped,
/// and so deregistered, together with the stream.
fn frames(subscription: Subscription) -> impl Stream<Item = Result<String, Infallible>> + Send {
    stream::unfold(subscription, |mut subscription| async move {
        let frame = subscription.next_frame().await?;
        Some((Ok(frame), subscription))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state_with_notes;
    use futures_util::StreamExt;
    use notegraph_watcher::{CONNECTED_FRAME, ChangeEvent, ChangeKind};

    #[tokio::test]
    async fn test_stream_headers() {
        let (_tmp, state) = state_with_notes();
        let response = event_stream(State(Arc::clone(&state))).await;

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");
        assert_eq!(state.bus.subscriber_count(), 1);

        drop(response);
        assert_eq!(state.bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_frames_follow_bus() {
        let (_tmp, state) = state_with_notes();
        let mut frames = Box::pin(frames(state.bus.subscribe()));

        assert_eq!(frames.next().await, Some(Ok(CONNECTED_FRAME.to_string())));
        state.bus.broadcast(&ChangeEvent::new(ChangeKind::Created, "/ideas"));
        assert_eq!(
            frames.next().await,
            Some(Ok("event: created\ndata: /ideas\n\n".to_string()))
        );

        state.bus.shutdown();
        assert_eq!(frames.next().await, None);
    }
}
