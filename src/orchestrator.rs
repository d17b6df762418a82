//! Tool-call loop driving a request to its final aggregate response.

use responses_api::cancel::CancelSignal;
use responses_api::items::{CustomToolCallOutput, FunctionCallOutput};
use responses_api::url::paths;
use responses_api::{AcceptStatus, ApiRequest, InputItem, OutputItem, RawItem, ResponseObject};
use responses_tools::{Executor, ToolError, ToolRegistry};

use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::request::{Input, ResponseRequest};
use crate::response::Response;

/// A tool call the registry can run.
struct PendingCall {
    name: String,
    call_id: String,
    arguments: String,
    custom: bool,
    executor: Executor,
}

/// How one round's outputs are handled.
#[derive(Default)]
struct RoundPlan {
    /// Items that may still reach the aggregate, in server order, flagged
    /// when they are an entry of `executable`.
    items: Vec<(RawItem, OutputItem, bool)>,
    executable: Vec<PendingCall>,
    returnable: bool,
    unknown: Option<String>,
}

enum CallTarget {
    Run(Executor),
    Return,
    Unknown,
}

pub(crate) async fn create_response(
    client: &ClientInner,
    request: ResponseRequest,
    cancellation: Option<&CancelSignal>,
) -> Result<Response> {
    if request.stream {
        return Err(Error::ModeMismatch(
            "stream=true requires the streaming entry point",
        ));
    }
    if request.background {
        return create_background(client, &request, cancellation).await;
    }

    let mut request = request;
    let mut aggregate = Response::default();
    let mut round_index = 0usize;

    loop {
        let mut round = send_round(client, &request, cancellation).await?;
        round_index += 1;
        aggregate.adopt_round(&round);

        let plan = classify(&mut round, &client.registry, request.return_tool_calls);
        tracing::debug!(
            response_id = %round.id(),
            round = round_index,
            outputs = plan.items.len(),
            executable = plan.executable.len(),
            "response round completed"
        );

        if let Some(name) = plan.unknown {
            return Err(Error::UnknownTool(name));
        }

        if plan.executable.is_empty() || plan.returnable {
            for (raw, item, _) in plan.items {
                aggregate.push_output(raw, item);
            }
            return Ok(aggregate);
        }

        let handler = request.intermediate_message_handler.clone();
        let mut kept = Vec::with_capacity(plan.items.len());
        for (raw, item, executed) in plan.items {
            if let (OutputItem::Message(message), Some(handler)) = (&item, &handler) {
                handler(message);
                continue;
            }
            kept.push((raw, item, executed));
        }

        let outputs = match execute_calls(&plan.executable)? {
            Execution::Outputs(outputs) => outputs,
            Execution::Stopped(tool) => {
                tracing::debug!(tool = %tool, "tool asked not to respond; ending loop");
                for (raw, item, _) in kept {
                    aggregate.push_output(raw, item);
                }
                aggregate.mark_stopped_by(tool);
                return Ok(aggregate);
            }
        };

        for (raw, item, executed) in kept {
            if !executed {
                aggregate.push_output(raw, item);
            }
        }

        request = follow_up(request, round.id(), outputs);
    }
}

async fn create_background(
    client: &ClientInner,
    request: &ResponseRequest,
    cancellation: Option<&CancelSignal>,
) -> Result<Response> {
    let wire = request.assemble(&client.registry, &client.options.default_model, false)?;
    let api_request = ApiRequest::post(paths::RESPONSES)
        .with_json(&wire)?
        .accepting(AcceptStatus::OkOrAccepted);
    let body = client.transport.send_buffered(&api_request, cancellation).await?;
    let envelope: ResponseObject = body.json("background response")?;
    if let Some(error) = envelope.error {
        return Err(Error::remote(error.code, error.message));
    }
    if envelope.id.is_empty() {
        return Err(Error::Decode {
            context: "background response",
            message: "acknowledgement carries no id".to_owned(),
        });
    }
    tracing::debug!(response_id = %envelope.id, status = %body.status, "background response accepted");
    Ok(Response::accepted(envelope.id, envelope.status))
}

async fn send_round(
    client: &ClientInner,
    request: &ResponseRequest,
    cancellation: Option<&CancelSignal>,
) -> Result<Response> {
    let wire = request.assemble(&client.registry, &client.options.default_model, false)?;
    let api_request = ApiRequest::post(paths::RESPONSES).with_json(&wire)?;
    let body = client.transport.send_buffered(&api_request, cancellation).await?;
    Response::from_body(&body)
}

fn classify(round: &mut Response, registry: &ToolRegistry, return_tool_calls: bool) -> RoundPlan {
    let mut plan = RoundPlan::default();

    for (raw, item) in round.take_outputs() {
        let call = match &item {
            OutputItem::Message(message) => {
                for refusal in message.refusals() {
                    tracing::warn!(refusal, "model refused");
                }
                None
            }
            OutputItem::FunctionCall(call) => Some((
                call.name.clone(),
                call.call_id.clone(),
                call.arguments.clone(),
                false,
            )),
            OutputItem::CustomToolCall(call) => Some((
                call.name.clone(),
                call.call_id.clone(),
                call.input.clone(),
                true,
            )),
            _ => None,
        };

        let Some((name, call_id, arguments, custom)) = call else {
            plan.items.push((raw, item, false));
            continue;
        };

        let target = if return_tool_calls {
            CallTarget::Return
        } else if custom {
            custom_target(registry, &name)
        } else {
            function_target(registry, &name)
        };

        match target {
            CallTarget::Run(executor) => {
                plan.items.push((raw, item, true));
                plan.executable.push(PendingCall {
                    name,
                    call_id,
                    arguments,
                    custom,
                    executor,
                });
            }
            CallTarget::Return => {
                plan.returnable = true;
                plan.items.push((raw, item, false));
            }
            CallTarget::Unknown => {
                plan.unknown.get_or_insert(name);
                plan.items.push((raw, item, false));
            }
        }
    }

    plan
}

fn function_target(registry: &ToolRegistry, name: &str) -> CallTarget {
    call_target(registry.function_executor(name))
}

fn custom_target(registry: &ToolRegistry, name: &str) -> CallTarget {
    call_target(registry.custom_executor(name))
}

fn call_target(found: Option<Option<Executor>>) -> CallTarget {
    match found {
        Some(Some(executor)) => CallTarget::Run(executor),
        Some(None) => CallTarget::Return,
        None => CallTarget::Unknown,
    }
}

enum Execution {
    Outputs(Vec<InputItem>),
    Stopped(String),
}

/// Runs executors one at a time in item order.
fn execute_calls(calls: &[PendingCall]) -> Result<Execution> {
    let mut outputs = Vec::with_capacity(calls.len());
    for call in calls {
        let output = match (call.executor)(call.arguments.as_str()) {
            Ok(output) => output,
            Err(ToolError::DoNotRespond) => return Ok(Execution::Stopped(call.name.clone())),
            Err(ToolError::Failed(message)) => {
                return Err(Error::ToolExecution {
                    tool: call.name.clone(),
                    message,
                })
            }
        };

        let item = if call.custom {
            OutputItem::CustomToolCallOutput(CustomToolCallOutput::new(&call.call_id, output))
        } else {
            OutputItem::FunctionCallOutput(FunctionCallOutput::new(&call.call_id, output))
        };
        outputs.push(InputItem::Output(item));
    }
    Ok(Execution::Outputs(outputs))
}

/// Next round's request: the same options with the tool outputs as input,
/// chained to `response_id` unless a conversation carries the context.
fn follow_up(mut request: ResponseRequest, response_id: &str, outputs: Vec<InputItem>) -> ResponseRequest {
    request.input = Input::Items(outputs);
    request.previous_response_id = if request.conversation.is_some() {
        None
    } else {
        Some(response_id.to_owned())
    };
    request
}
