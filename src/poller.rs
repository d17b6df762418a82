//! Background response polling and the other single-response endpoints.

use std::time::Duration;

use responses_api::cancel::{ensure_not_cancelled, sleep_or_cancel, CancelSignal};
use responses_api::envelope::Deleted;
use responses_api::url::paths;
use responses_api::{AcceptStatus, ApiRequest, ResponseObject, ResponseStatus, Transport};

use crate::error::{Error, Result};
use crate::response::Response;

/// Fetches `GET /responses/{id}` until the response settles.
///
/// The first fetch happens immediately; each later one waits `interval`,
/// racing the wait against `cancellation`. An envelope without `status`
/// settles once it carries output or an error object.
pub(crate) async fn poll(
    transport: &Transport,
    id: &str,
    interval: Duration,
    cancellation: Option<&CancelSignal>,
) -> Result<Response> {
    require_id(id)?;
    let mut attempts = 0u32;

    loop {
        ensure_not_cancelled(cancellation)?;
        let envelope = fetch(transport, id, cancellation).await?;
        attempts += 1;

        match envelope.status {
            Some(ResponseStatus::Completed | ResponseStatus::Incomplete) => {
                tracing::debug!(response_id = id, attempts, "background response settled");
                return settled(envelope, id);
            }
            None if envelope.error.is_some() || !envelope.output.is_empty() => {
                tracing::debug!(
                    response_id = id,
                    attempts,
                    "background response settled without status"
                );
                return settled(envelope, id);
            }
            Some(ResponseStatus::Failed) => {
                return Err(match envelope.error {
                    Some(error) => Error::remote(error.code, error.message),
                    None => Error::remote(
                        Some("failed".to_owned()),
                        format!("response {id} failed"),
                    ),
                });
            }
            Some(status @ (ResponseStatus::Cancelled | ResponseStatus::Expired)) => {
                return Err(Error::remote(
                    Some(status.as_str().to_owned()),
                    format!("response {id} ended as {}", status.as_str()),
                ));
            }
            status => {
                tracing::debug!(
                    response_id = id,
                    status = status.map_or("unknown", |status| status.as_str()),
                    "background response pending"
                );
            }
        }

        sleep_or_cancel(interval, cancellation).await?;
    }
}

/// Single `GET /responses/{id}`, whatever the status.
pub(crate) async fn retrieve(
    transport: &Transport,
    id: &str,
    cancellation: Option<&CancelSignal>,
) -> Result<Response> {
    require_id(id)?;
    let envelope = fetch(transport, id, cancellation).await?;
    settled(envelope, id)
}

pub(crate) async fn cancel(
    transport: &Transport,
    id: &str,
    cancellation: Option<&CancelSignal>,
) -> Result<Response> {
    require_id(id)?;
    let request = ApiRequest::post(paths::response_cancel(id));
    let body = transport.send_buffered(&request, cancellation).await?;
    settled(body.json("cancelled response")?, id)
}

pub(crate) async fn delete(
    transport: &Transport,
    id: &str,
    cancellation: Option<&CancelSignal>,
) -> Result<()> {
    require_id(id)?;
    let request = ApiRequest::delete(paths::response(id)).accepting(AcceptStatus::AnySuccess);
    let body = transport.send_buffered(&request, cancellation).await?;
    if !body.body.is_empty() {
        let deleted: Deleted = body.json("delete acknowledgement")?;
        tracing::debug!(response_id = %deleted.id, deleted = deleted.deleted, "response deleted");
    }
    Ok(())
}

async fn fetch(
    transport: &Transport,
    id: &str,
    cancellation: Option<&CancelSignal>,
) -> Result<ResponseObject> {
    let request = ApiRequest::get(paths::response(id));
    let body = transport.send_buffered(&request, cancellation).await?;
    Ok(body.json("response")?)
}

fn settled(envelope: ResponseObject, id: &str) -> Result<Response> {
    let mut response = Response::from_envelope(envelope)?;
    response.set_id_if_empty(id);
    Ok(response)
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::Validation("response id is required".to_owned()));
    }
    Ok(())
}
