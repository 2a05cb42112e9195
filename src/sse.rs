//! The Stream Multiplexer (spec.md §4.4): turns an `EventStore::stream` into
//! an SSE response, honouring `Last-Event-ID` as a resume cursor.

use axum::http::{header, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::events::store::StreamParams;
use crate::events::ChannelType;
use crate::state::AppState;

pub async fn stream_response(
    state: &AppState,
    channel_type: ChannelType,
    channel_id: Uuid,
    last_event_id: Option<Uuid>,
) -> Response {
    let events = state
        .events
        .stream(StreamParams {
            channel_type,
            channel_id,
            starting_event_id: last_event_id,
        })
        .await;

    // `scan` stops yielding once `stopped` flips, mirroring "on the first
    // event with end=true ... terminate" and "on error ... terminate"
    // (spec.md §4.4). A store error still produces one `error` frame before
    // the stream ends, rather than dropping the connection silently.
    let frames = events.scan(false, |stopped, item| {
        let frame: Option<Result<Event, std::convert::Infallible>> = if *stopped {
            None
        } else {
            match item {
                Ok(record) => {
                    if record.end {
                        *stopped = true;
                    }
                    Some(Ok(Event::default()
                        .id(record.id.to_string())
                        .event(record.event_type.as_str())
                        .data(record.data)))
                }
                Err(err) => {
                    *stopped = true;
                    Some(Ok(Event::default()
                        .event("error")
                        .data(serde_json::json!({ "error": err.to_string() }).to_string())))
                }
            }
        };
        futures_util::future::ready(frame)
    });

    let sse = Sse::new(frames).keep_alive(KeepAlive::default());
    let mut response = sse.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
