//! Server-sent event demultiplexing onto a bounded channel.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use responses_api::cancel::{await_or_cancel, CancelSignal};
use responses_api::url::paths;
use responses_api::{ApiError, ApiRequest, SseStreamParser, StreamEvent};

use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::request::ResponseRequest;

/// Events of one streamed response, in server order.
///
/// The channel ends cleanly when the body does, or after delivering a single
/// error. Consume it with [`EventStream::next`]/[`EventStream::event`],
/// [`EventStream::recv`], or as a [`Stream`].
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::Receiver<Result<StreamEvent>>,
    pump: JoinHandle<()>,
    current: Option<StreamEvent>,
    error: Option<Error>,
}

impl EventStream {
    /// Advances to the next event. Returns `false` at the end of the stream
    /// or on error; check [`EventStream::err`] to tell them apart.
    pub async fn next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(Ok(event)) => {
                self.current = Some(event);
                true
            }
            Some(Err(error)) => {
                self.current = None;
                self.error = Some(error);
                false
            }
            None => {
                self.current = None;
                false
            }
        }
    }

    /// Event the last successful [`EventStream::next`] advanced to.
    pub fn event(&self) -> Option<&StreamEvent> {
        self.current.as_ref()
    }

    pub fn err(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn take_err(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Raw channel form.
    pub async fn recv(&mut self) -> Option<Result<StreamEvent>> {
        self.receiver.recv().await
    }

    /// Stops reading the body. Events already buffered stay readable.
    pub fn close(&mut self) {
        self.receiver.close();
        self.pump.abort();
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

pub(crate) async fn open(
    client: &ClientInner,
    request: &ResponseRequest,
    cancellation: Option<CancelSignal>,
) -> Result<EventStream> {
    if !request.stream {
        return Err(Error::ModeMismatch(
            "stream=false requires the non-streaming entry point",
        ));
    }

    let wire = request.assemble(&client.registry, &client.options.default_model, true)?;
    let api_request = ApiRequest::post(paths::RESPONSES)
        .with_json(&wire)?
        .streaming();
    let response = client
        .transport
        .send(&api_request, cancellation.as_ref())
        .await?;

    let (sender, receiver) = mpsc::channel(client.options.stream_buffer.max(1));
    let pump = tokio::spawn(pump_events(response, sender, cancellation));

    Ok(EventStream {
        receiver,
        pump,
        current: None,
        error: None,
    })
}

async fn pump_events(
    response: reqwest::Response,
    sender: mpsc::Sender<Result<StreamEvent>>,
    cancellation: Option<CancelSignal>,
) {
    let started = Instant::now();
    let mut bytes = response.bytes_stream();
    let mut parser = SseStreamParser::default();

    loop {
        let next = match await_or_cancel(bytes.next(), cancellation.as_ref()).await {
            Ok(next) => next,
            Err(error) => {
                let _ = sender.send(Err(error.into())).await;
                return;
            }
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(source) => {
                let error = Error::Transport {
                    elapsed: started.elapsed(),
                    source,
                };
                let _ = sender.send(Err(error)).await;
                return;
            }
        };

        for event in parser.feed(&chunk) {
            if !forward(&sender, event).await {
                return;
            }
        }
    }

    for event in parser.finish() {
        if !forward(&sender, event).await {
            return;
        }
    }
}

/// Sends one parsed event; `false` once the stream must end.
async fn forward(
    sender: &mpsc::Sender<Result<StreamEvent>>,
    event: std::result::Result<StreamEvent, ApiError>,
) -> bool {
    let failed = event.is_err();
    if sender.send(event.map_err(Error::from)).await.is_err() {
        tracing::debug!("stream receiver dropped; stopping");
        return false;
    }
    !failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use responses_api::decode_event;

    fn stream_of(items: Vec<Result<StreamEvent>>) -> EventStream {
        let (sender, receiver) = mpsc::channel(items.len().max(1));
        for item in items {
            sender.try_send(item).expect("capacity");
        }
        drop(sender);
        EventStream {
            receiver,
            pump: tokio::spawn(async {}),
            current: None,
            error: None,
        }
    }

    fn delta(sequence_number: u64, text: &str) -> StreamEvent {
        decode_event(&format!(
            r#"{{"type":"response.output_text.delta","sequence_number":{sequence_number},"delta":"{text}"}}"#
        ))
        .expect("event")
    }

    #[tokio::test]
    async fn iterator_form_ends_cleanly() {
        let mut stream = stream_of(vec![Ok(delta(1, "he")), Ok(delta(2, "llo"))]);
        let mut text = String::new();
        while stream.next().await {
            text.push_str(stream.event().and_then(StreamEvent::delta).unwrap_or_default());
        }
        assert_eq!(text, "hello");
        assert!(stream.err().is_none());
        assert!(stream.event().is_none());
    }

    #[tokio::test]
    async fn iterator_form_surfaces_errors() {
        let mut stream = stream_of(vec![Ok(delta(1, "he")), Err(Error::Cancelled)]);
        assert!(stream.next().await);
        assert!(!stream.next().await);
        assert!(matches!(stream.err(), Some(Error::Cancelled)));
        assert!(!stream.next().await);
    }

    #[tokio::test]
    async fn stream_form_yields_in_order() {
        let stream = stream_of(vec![Ok(delta(1, "a")), Ok(delta(2, "b"))]);
        let sequence: Vec<u64> = stream
            .map(|item| item.map(|event| event.sequence_number).unwrap_or_default())
            .collect()
            .await;
        assert_eq!(sequence, vec![1, 2]);
    }
}
