use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use actix_web::{web, App, HttpResponse, HttpServer};
use prost::Message;

use crate::actor::{resolve_scheduled_to, Routing, WorkflowResult};
use crate::errors::{SystemError, WorkflowError};
use crate::proto;
use crate::proto::{
    Actor, ActorId, ActorInvocation, ActorInvocationResponse, ActorSystem, Context,
    InvocationRequest, Payload, SideEffect,
};
use crate::registry::{ActionRegistry, InboundInvocation};

// ============================================================================
// Callback Dispatcher
// ============================================================================
//
// The inbound half of the protocol: the proxy POSTs a binary ActorInvocation
// to this process whenever an action must execute. Each request walks
// Received -> Resolved -> Executed -> Responded, with two fast exits:
//
// - Unresolved: no callback registered for the action. The proxy may probe
//   for default behavior, so this is answered 200 with the inbound context
//   echoed untouched, never an error.
// - Failed: anything raised while unpacking, executing the callback, or
//   finalizing its workflow. Logged locally and answered with a bare 400;
//   the wire schema has no error-detail field.
//
// Requests are handled independently and concurrently. Actor state lives
// entirely inside the request envelope, so no cross-request locking exists
// here; serializing concurrent updates to one actor is the proxy's job.
//
// ============================================================================

const ACTIONS_ROUTE: &str = "/api/v1/actors/actions";

#[derive(Debug, thiserror::Error)]
pub(crate) enum DispatchError {
    #[error("failed to decode actor invocation: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("failed to finalize workflow: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Handle one inbound invocation, producing the encoded wire response.
pub(crate) async fn dispatch(
    registry: &ActionRegistry,
    body: &[u8],
) -> Result<Vec<u8>, DispatchError> {
    let invocation = ActorInvocation::decode(body)?;

    let actor_id = invocation.actor.clone().unwrap_or_default();
    let action = invocation.action_name.clone();
    let current = invocation.current_context.clone().unwrap_or_default();

    let connector = match registry.resolve(&actor_id, &action) {
        Some(connector) => connector,
        None => {
            tracing::debug!(
                actor = %actor_id.name,
                action = %action,
                "No callback registered for action, echoing current context"
            );

            let echo = ActorInvocationResponse {
                actor_name: actor_id.name,
                actor_system: actor_id.system,
                updated_context: Some(current),
                payload: None,
                workflow: None,
            };

            return Ok(echo.encode_to_vec());
        }
    };

    let inbound = InboundInvocation {
        context: current.clone(),
        payload: invocation.payload.clone(),
        self_id: actor_id.clone(),
        caller: invocation.caller.clone(),
    };

    // The callback runs to completion before the response is built; any
    // asynchronous work it performs suspends this request until it resolves.
    let value = (connector.handler)(inbound).await.map_err(|error| {
        tracing::error!(
            actor = %actor_id.name,
            action = %action,
            error = %error,
            "Action callback failed"
        );
        DispatchError::Handler(error)
    })?;

    let result = value
        .parse(connector.response_type.as_deref())
        .map_err(|error| {
            tracing::error!(
                actor = %actor_id.name,
                action = %action,
                error = %error,
                "Failed to finalize workflow result"
            );
            DispatchError::Workflow(error)
        })?;

    let updated_context = Context {
        // State is never silently dropped: when the handler did not set one,
        // the inbound envelope goes back byte-identical.
        state: result.state.clone().or_else(|| current.state.clone()),
        metadata: current.metadata.clone(),
        tags: result.tags.clone().unwrap_or_else(|| current.tags.clone()),
        caller: invocation.caller.clone(),
        self_: Some(actor_id.clone()),
    };

    let payload = match result.response.clone() {
        Some(any) => Some(Payload::Value(any)),
        None => Some(Payload::noop()),
    };

    let workflow = build_workflow(&actor_id, &result);

    let response = ActorInvocationResponse {
        actor_name: actor_id.name,
        actor_system: actor_id.system,
        updated_context: Some(updated_context),
        payload,
        workflow: Some(workflow),
    };

    Ok(response.encode_to_vec())
}

/// Translate the declarative workflow result into its wire shape.
fn build_workflow(self_id: &ActorId, result: &WorkflowResult) -> proto::Workflow {
    let broadcast = result.broadcast.as_ref().map(|broadcast| proto::Broadcast {
        channel_group: broadcast.channel.clone(),
        action_name: broadcast.action.clone(),
        payload: Some(
            broadcast
                .payload
                .clone()
                .map(Payload::Value)
                .unwrap_or_else(Payload::noop),
        ),
    });

    let effects = result
        .effects
        .iter()
        .map(|effect| SideEffect {
            request: Some(InvocationRequest {
                system: Some(ActorSystem {
                    name: self_id.system.clone(),
                    registry: None,
                }),
                actor: Some(Actor {
                    id: Some(ActorId {
                        name: effect.actor_name.clone(),
                        system: self_id.system.clone(),
                        parent: String::new(),
                    }),
                    ..Default::default()
                }),
                action_name: effect.action.clone(),
                payload: Some(
                    effect
                        .payload
                        .clone()
                        .map(Payload::Value)
                        .unwrap_or_else(Payload::noop),
                ),
                r#async: true,
                caller: Some(self_id.clone()),
                metadata: HashMap::new(),
                pooled: false,
                scheduled_to: resolve_scheduled_to(effect.delay_ms, effect.scheduled_to)
                    .unwrap_or(0),
            }),
        })
        .collect();

    let routing = result.routing.as_ref().map(|routing| match routing {
        Routing::Pipe(pipe) => proto::Routing::Pipe(proto::Pipe {
            actor: pipe.actor_name.clone(),
            action_name: pipe.action.clone(),
        }),
        Routing::Forward(forward) => proto::Routing::Forward(proto::Forward {
            actor: forward.actor_name.clone(),
            action_name: forward.action.clone(),
        }),
    });

    proto::Workflow {
        broadcast,
        effects,
        routing,
    }
}

async fn actions_handler(
    body: web::Bytes,
    registry: web::Data<ActionRegistry>,
) -> HttpResponse {
    match dispatch(&registry, &body).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/octet-stream")
            .body(bytes),
        // The proxy treats this as a retryable invocation failure; details
        // were already logged at the failure site.
        Err(_) => HttpResponse::BadRequest().finish(),
    }
}

/// A running callback server. Stopping waits for in-flight requests.
pub(crate) struct CallbackServerHandle {
    handle: actix_web::dev::ServerHandle,
    thread: Option<thread::JoinHandle<()>>,
}

impl CallbackServerHandle {
    pub async fn stop(mut self) {
        self.handle.stop(true).await;

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Start the callback endpoint on a dedicated thread with its own runtime.
///
/// One route only; anything else answers 404 through the default service.
pub(crate) fn start_callback_server(
    registry: Arc<ActionRegistry>,
    host: String,
    port: u16,
) -> Result<CallbackServerHandle, SystemError> {
    let (tx, rx) = mpsc::channel();

    let thread = thread::Builder::new()
        .name("bridge-callback-server".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(error) => {
                    let _ = tx.send(Err(error));
                    return;
                }
            };

            runtime.block_on(async move {
                let data = web::Data::from(registry);

                let bound = HttpServer::new(move || {
                    App::new()
                        .app_data(data.clone())
                        .route(ACTIONS_ROUTE, web::post().to(actions_handler))
                })
                .bind((host.as_str(), port));

                let server = match bound {
                    Ok(server) => server.run(),
                    Err(error) => {
                        let _ = tx.send(Err(error));
                        return;
                    }
                };

                tracing::info!(host = %host, port = port, "Callback server listening");
                let _ = tx.send(Ok(server.handle()));

                if let Err(error) = server.await {
                    tracing::error!(error = %error, "Callback server terminated with error");
                }
            });
        })?;

    let handle = rx
        .recv()
        .map_err(|_| {
            SystemError::CallbackServer(std::io::Error::other(
                "callback server thread exited before startup",
            ))
        })?
        .map_err(SystemError::CallbackServer)?;

    Ok(CallbackServerHandle {
        handle,
        thread: Some(thread),
    })
}
