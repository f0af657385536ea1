use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::gui::state::AppState;

/// Streams review progress lines to the browser via SSE.
pub async fn stream_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.log_tx.subscribe();
    let (tx, out_rx) = mpsc::channel::<Result<Event, Infallible>>(100);

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if tx.send(Ok(Event::default().data(message))).await.is_err() {
                        // Browser went away.
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    let note = format!("(log stream lagged, {} message(s) dropped)", skipped);
                    if tx.send(Ok(Event::default().data(note))).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    Sse::new(ReceiverStream::new(out_rx)).keep_alive(KeepAlive::default())
}
