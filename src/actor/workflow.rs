use std::collections::HashMap;

use chrono::{DateTime, Utc};
use prost::{Message, Name};
use prost_types::Any;

use crate::envelope;
use crate::errors::WorkflowError;
use crate::proto::JsonType;

// ============================================================================
// Workflow Builder
// ============================================================================
//
// A single-use accumulator an action callback declares its outcome through:
// new state, response payload, outgoing tags, at most one broadcast, at most
// one routing decision, and any number of scheduled side effects.
//
// `parse` consumes the builder, so a result can only be materialized once.
//
// ============================================================================

/// Publish a payload to every actor subscribed to a channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Broadcast {
    pub channel: String,
    pub action: String,
    pub payload: Option<Any>,
}

impl Broadcast {
    pub fn new(channel: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            action: action.into(),
            payload: None,
        }
    }

    pub fn payload(mut self, payload: Any) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A scheduled, asynchronous follow-up invocation emitted with the result.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    pub actor_name: String,
    pub action: String,
    pub payload: Option<Any>,
    /// Relative schedule in milliseconds; takes precedence over `scheduled_to`.
    pub delay_ms: Option<u64>,
    /// Absolute schedule.
    pub scheduled_to: Option<DateTime<Utc>>,
}

impl Effect {
    pub fn new(actor_name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            actor_name: actor_name.into(),
            action: action.into(),
            payload: None,
            delay_ms: None,
            scheduled_to: None,
        }
    }

    pub fn payload(mut self, payload: Any) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn delayed_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.scheduled_to = Some(when);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pipe {
    pub actor_name: String,
    pub action: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Forward {
    pub actor_name: String,
    pub action: String,
}

/// The routing decision of a handler result. Pipe and forward are mutually
/// exclusive; the builder keeps whichever was set last.
#[derive(Clone, Debug, PartialEq)]
pub enum Routing {
    Pipe(Pipe),
    Forward(Forward),
}

/// Response forms in precedence order: an explicit pre-built envelope wins
/// over a typed value, which wins over the raw-JSON fallback.
enum ResponseSource {
    Envelope(Any),
    Typed(Any),
    Json(serde_json::Value),
}

impl ResponseSource {
    fn rank(&self) -> u8 {
        match self {
            ResponseSource::Envelope(_) => 3,
            ResponseSource::Typed(_) => 2,
            ResponseSource::Json(_) => 1,
        }
    }
}

enum StateSource {
    Envelope(Any),
    Json(serde_json::Value),
}

/// Finalized workflow result, ready for translation to the wire.
#[derive(Clone, Debug)]
pub struct WorkflowResult {
    pub state: Option<Any>,
    pub response: Option<Any>,
    pub tags: Option<HashMap<String, String>>,
    pub broadcast: Option<Broadcast>,
    pub routing: Option<Routing>,
    pub effects: Vec<Effect>,
}

/// The fluent accumulator returned by action callbacks.
#[derive(Default)]
pub struct Value {
    state: Option<StateSource>,
    response: Option<ResponseSource>,
    tags: Option<HashMap<String, String>>,
    broadcast: Option<Broadcast>,
    routing: Option<Routing>,
    effects: Vec<Effect>,
}

impl Value {
    pub fn of() -> Self {
        Self::default()
    }

    /// Replace the actor's state with a typed value.
    pub fn state<S: Message + Name>(mut self, state: &S) -> Self {
        self.state = Some(StateSource::Envelope(envelope::pack(state)));
        self
    }

    /// Replace the actor's state with a dynamic JSON value.
    pub fn state_json(mut self, state: serde_json::Value) -> Self {
        self.state = Some(StateSource::Json(state));
        self
    }

    /// Respond with a typed value.
    pub fn response<R: Message + Name>(mut self, response: &R) -> Self {
        let typed = ResponseSource::Typed(envelope::pack(response));
        self.set_response(typed);
        self
    }

    /// Respond with a pre-built envelope. Takes precedence over any other
    /// response form set on this builder.
    pub fn response_envelope(mut self, envelope: Any) -> Self {
        self.set_response(ResponseSource::Envelope(envelope));
        self
    }

    /// Respond with a dynamic value carried in the raw-JSON envelope. The
    /// weakest response form; a typed response set on the same builder wins.
    pub fn response_json(mut self, response: serde_json::Value) -> Self {
        self.set_response(ResponseSource::Json(response));
        self
    }

    /// Replace the context tags wholesale.
    pub fn tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn broadcast(mut self, broadcast: Broadcast) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    /// Route this invocation's response through another actor's action.
    ///
    /// Pipe and forward are mutually exclusive: setting one after the other
    /// overwrites it (last write wins), matching proxy tolerance.
    pub fn pipe(mut self, actor_name: impl Into<String>, action: impl Into<String>) -> Self {
        self.routing = Some(Routing::Pipe(Pipe {
            actor_name: actor_name.into(),
            action: action.into(),
        }));
        self
    }

    /// Delegate the reply entirely to another actor's action, discarding this
    /// handler's own response. Last write wins against `pipe`.
    pub fn forward(mut self, actor_name: impl Into<String>, action: impl Into<String>) -> Self {
        self.routing = Some(Routing::Forward(Forward {
            actor_name: actor_name.into(),
            action: action.into(),
        }));
        self
    }

    pub fn effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }

    /// Materialize the workflow result, resolving the response against the
    /// action's declared response type when one was declared.
    pub fn parse(self, expected_response_type: Option<&str>) -> Result<WorkflowResult, WorkflowError> {
        let state = match self.state {
            Some(StateSource::Envelope(any)) => Some(any),
            Some(StateSource::Json(value)) => Some(envelope::pack_json(&value)?),
            None => None,
        };

        let response = match self.response {
            Some(ResponseSource::Envelope(any)) | Some(ResponseSource::Typed(any)) => {
                if let Some(expected) = expected_response_type {
                    if any.type_url != expected {
                        return Err(WorkflowError::ResponseTypeMismatch {
                            expected: expected.to_string(),
                            got: any.type_url,
                        });
                    }
                }
                Some(any)
            }
            Some(ResponseSource::Json(value)) => {
                if let Some(expected) = expected_response_type {
                    if expected != JsonType::type_url() {
                        return Err(WorkflowError::ResponseTypeMismatch {
                            expected: expected.to_string(),
                            got: JsonType::type_url(),
                        });
                    }
                }
                Some(envelope::pack_json(&value)?)
            }
            None => None,
        };

        Ok(WorkflowResult {
            state,
            response,
            tags: self.tags,
            broadcast: self.broadcast,
            routing: self.routing,
            effects: self.effects,
        })
    }

    fn set_response(&mut self, source: ResponseSource) {
        let keep_existing = self
            .response
            .as_ref()
            .map(|existing| existing.rank() > source.rank())
            .unwrap_or(false);

        if !keep_existing {
            self.response = Some(source);
        }
    }
}

/// Resolve a relative or absolute schedule to epoch millis at call time.
/// A delay takes precedence when both are given.
pub(crate) fn resolve_scheduled_to(
    delay_ms: Option<u64>,
    scheduled_to: Option<DateTime<Utc>>,
) -> Option<i64> {
    if let Some(delay) = delay_ms {
        return Some(Utc::now().timestamp_millis() + delay as i64);
    }

    scheduled_to.map(|when| when.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto_name;
    use serde_json::json;

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct ChangeUserNameResponse {
        #[prost(string, tag = "1")]
        new_name: String,
        #[prost(int32, tag = "2")]
        status: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct UserState {
        #[prost(string, tag = "1")]
        name: String,
    }

    proto_name!(ChangeUserNameResponse, "bridge.test", "ChangeUserNameResponse");
    proto_name!(UserState, "bridge.test", "UserState");

    #[test]
    fn test_routing_is_last_write_wins() {
        let result = Value::of()
            .pipe("transformer", "transform")
            .forward("delegate", "handle")
            .parse(None)
            .unwrap();

        assert_eq!(
            result.routing,
            Some(Routing::Forward(Forward {
                actor_name: "delegate".to_string(),
                action: "handle".to_string(),
            }))
        );

        let result = Value::of()
            .forward("delegate", "handle")
            .pipe("transformer", "transform")
            .parse(None)
            .unwrap();

        assert!(matches!(result.routing, Some(Routing::Pipe(_))));
    }

    #[test]
    fn test_typed_response_beats_json_fallback() {
        let typed = ChangeUserNameResponse {
            new_name: "novo_nome".to_string(),
            status: 1,
        };

        // JSON set after the typed response still loses.
        let result = Value::of()
            .response(&typed)
            .response_json(json!({ "ignored": true }))
            .parse(None)
            .unwrap();

        let response = result.response.unwrap();
        let unpacked: ChangeUserNameResponse = envelope::unpack(&response).unwrap();
        assert_eq!(unpacked, typed);
    }

    #[test]
    fn test_explicit_envelope_beats_typed_response() {
        let prebuilt = envelope::pack(&UserState {
            name: "prebuilt".to_string(),
        });

        let result = Value::of()
            .response_envelope(prebuilt.clone())
            .response(&ChangeUserNameResponse::default())
            .parse(None)
            .unwrap();

        assert_eq!(result.response.unwrap(), prebuilt);
    }

    #[test]
    fn test_declared_response_type_is_enforced() {
        let result = Value::of()
            .response(&UserState {
                name: "x".to_string(),
            })
            .parse(Some(&ChangeUserNameResponse::type_url()));

        assert!(matches!(
            result,
            Err(WorkflowError::ResponseTypeMismatch { .. })
        ));

        let result = Value::of()
            .response_json(json!({}))
            .parse(Some(&ChangeUserNameResponse::type_url()));

        assert!(matches!(
            result,
            Err(WorkflowError::ResponseTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_matching_declared_response_type_passes() {
        let result = Value::of()
            .response(&ChangeUserNameResponse::default())
            .parse(Some(&ChangeUserNameResponse::type_url()))
            .unwrap();

        assert!(result.response.is_some());
    }

    #[test]
    fn test_empty_builder_parses_to_empty_result() {
        let result = Value::of().parse(None).unwrap();

        assert!(result.state.is_none());
        assert!(result.response.is_none());
        assert!(result.tags.is_none());
        assert!(result.broadcast.is_none());
        assert!(result.routing.is_none());
        assert!(result.effects.is_empty());
    }

    #[test]
    fn test_delay_takes_precedence_over_absolute_schedule() {
        let past = Utc::now() - chrono::Duration::hours(1);
        let before = Utc::now().timestamp_millis();

        let resolved = resolve_scheduled_to(Some(5_000), Some(past)).unwrap();
        assert!(resolved >= before + 5_000);

        let resolved = resolve_scheduled_to(None, Some(past)).unwrap();
        assert_eq!(resolved, past.timestamp_millis());

        assert!(resolve_scheduled_to(None, None).is_none());
    }

    #[test]
    fn test_json_state_is_packed_at_parse_time() {
        let result = Value::of()
            .state_json(json!({ "name": "novo_nome" }))
            .parse(None)
            .unwrap();

        let state = result.state.unwrap();
        assert!(envelope::is_json(&state));
        assert_eq!(
            envelope::unpack_json(&state).unwrap(),
            json!({ "name": "novo_nome" })
        );
    }
}
