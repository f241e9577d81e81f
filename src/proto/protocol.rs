//! Request/response protocol messages (package `eigr.functions.protocol`).

use std::collections::HashMap;

use super::actors::{Actor, ActorId, ActorSystem};
use crate::proto_name;

/// Reserved "no value" marker. Packing it yields the empty envelope; any
/// payload slot carrying it means the caller sent nothing.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Noop {}

/// Reserved raw-JSON carrier. Dynamic payloads travel as a UTF-8 JSON string
/// wrapped in the same envelope shape as typed messages.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JsonType {
    #[prost(string, tag = "1")]
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Status {
    Unknown = 0,
    Ok = 1,
    ActorNotFound = 2,
    Error = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestStatus {
    #[prost(enumeration = "Status", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

/// Payload slot shared by every protocol message that can carry either a
/// typed envelope or the explicit no-value marker.
#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum Payload {
    #[prost(message, tag = "4")]
    Value(::prost_types::Any),
    #[prost(message, tag = "5")]
    Noop(Noop),
}

impl Payload {
    pub fn noop() -> Self {
        Payload::Noop(Noop {})
    }

    pub fn from_envelope(envelope: Option<::prost_types::Any>) -> Option<Self> {
        envelope.map(Payload::Value)
    }

    /// The typed envelope, if this slot carries one.
    pub fn as_value(&self) -> Option<&::prost_types::Any> {
        match self {
            Payload::Value(any) => Some(any),
            Payload::Noop(_) => None,
        }
    }
}

/// Metadata describing the SDK registering with the proxy.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceInfo {
    #[prost(string, tag = "1")]
    pub service_name: String,
    #[prost(string, tag = "2")]
    pub service_version: String,
    #[prost(string, tag = "3")]
    pub service_runtime: String,
    #[prost(string, tag = "4")]
    pub support_library_name: String,
    #[prost(string, tag = "5")]
    pub support_library_version: String,
    #[prost(int32, tag = "6")]
    pub protocol_major_version: i32,
    #[prost(int32, tag = "7")]
    pub protocol_minor_version: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProxyInfo {
    #[prost(int32, tag = "1")]
    pub protocol_major_version: i32,
    #[prost(int32, tag = "2")]
    pub protocol_minor_version: i32,
    #[prost(string, tag = "3")]
    pub proxy_name: String,
    #[prost(string, tag = "4")]
    pub proxy_version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegistrationRequest {
    #[prost(message, optional, tag = "1")]
    pub service_info: Option<ServiceInfo>,
    #[prost(message, optional, tag = "2")]
    pub actor_system: Option<ActorSystem>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegistrationResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<RequestStatus>,
    #[prost(message, optional, tag = "2")]
    pub proxy_info: Option<ProxyInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpawnRequest {
    #[prost(message, repeated, tag = "1")]
    pub actors: Vec<ActorId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpawnResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<RequestStatus>,
}

/// Outbound request asking the proxy to run an action on an actor.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvocationRequest {
    #[prost(message, optional, tag = "1")]
    pub system: Option<ActorSystem>,
    #[prost(message, optional, tag = "2")]
    pub actor: Option<Actor>,
    #[prost(string, tag = "3")]
    pub action_name: String,
    #[prost(oneof = "Payload", tags = "4, 5")]
    pub payload: Option<Payload>,
    #[prost(bool, tag = "6")]
    pub r#async: bool,
    #[prost(message, optional, tag = "7")]
    pub caller: Option<ActorId>,
    #[prost(map = "string, string", tag = "8")]
    pub metadata: HashMap<String, String>,
    #[prost(bool, tag = "9")]
    pub pooled: bool,
    /// Absolute epoch millis at which the proxy should run the action;
    /// zero means immediately.
    #[prost(int64, tag = "10")]
    pub scheduled_to: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InvocationResponse {
    #[prost(message, optional, tag = "1")]
    pub status: Option<RequestStatus>,
    #[prost(message, optional, tag = "2")]
    pub system: Option<ActorSystem>,
    #[prost(message, optional, tag = "3")]
    pub actor: Option<Actor>,
    #[prost(oneof = "Payload", tags = "4, 5")]
    pub payload: Option<Payload>,
}

/// Handler-visible execution context, round-tripped with every callback.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Context {
    #[prost(message, optional, tag = "1")]
    pub state: Option<::prost_types::Any>,
    #[prost(map = "string, string", tag = "2")]
    pub metadata: HashMap<String, String>,
    #[prost(map = "string, string", tag = "3")]
    pub tags: HashMap<String, String>,
    #[prost(message, optional, tag = "6")]
    pub caller: Option<ActorId>,
    #[prost(message, optional, tag = "7")]
    pub self_: Option<ActorId>,
}

/// Inbound callback from the proxy: run `action_name` on `actor`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorInvocation {
    #[prost(message, optional, tag = "1")]
    pub actor: Option<ActorId>,
    #[prost(string, tag = "2")]
    pub action_name: String,
    #[prost(message, optional, tag = "3")]
    pub current_context: Option<Context>,
    #[prost(oneof = "Payload", tags = "4, 5")]
    pub payload: Option<Payload>,
    #[prost(message, optional, tag = "6")]
    pub caller: Option<ActorId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pipe {
    #[prost(string, tag = "1")]
    pub actor: String,
    #[prost(string, tag = "2")]
    pub action_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Forward {
    #[prost(string, tag = "1")]
    pub actor: String,
    #[prost(string, tag = "2")]
    pub action_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Broadcast {
    #[prost(string, tag = "1")]
    pub channel_group: String,
    #[prost(string, tag = "2")]
    pub action_name: String,
    #[prost(oneof = "Payload", tags = "4, 5")]
    pub payload: Option<Payload>,
}

/// A follow-up invocation emitted as part of a handler result. Always
/// dispatched asynchronously by the proxy.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SideEffect {
    #[prost(message, optional, tag = "1")]
    pub request: Option<InvocationRequest>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Workflow {
    #[prost(message, optional, tag = "1")]
    pub broadcast: Option<Broadcast>,
    #[prost(message, repeated, tag = "2")]
    pub effects: Vec<SideEffect>,
    #[prost(oneof = "Routing", tags = "3, 4")]
    pub routing: Option<Routing>,
}

/// Mutually exclusive routing decision on the wire: pipe the response through
/// another action, or forward to it entirely.
#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum Routing {
    #[prost(message, tag = "3")]
    Pipe(Pipe),
    #[prost(message, tag = "4")]
    Forward(Forward),
}

/// Reply to an `ActorInvocation` callback.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorInvocationResponse {
    #[prost(string, tag = "1")]
    pub actor_name: String,
    #[prost(string, tag = "2")]
    pub actor_system: String,
    #[prost(message, optional, tag = "3")]
    pub updated_context: Option<Context>,
    #[prost(oneof = "Payload", tags = "4, 5")]
    pub payload: Option<Payload>,
    #[prost(message, optional, tag = "6")]
    pub workflow: Option<Workflow>,
}

proto_name!(Noop, "eigr.functions.protocol", "Noop");
proto_name!(JsonType, "eigr.functions.protocol", "JSONType");
proto_name!(Context, "eigr.functions.protocol", "Context");
proto_name!(ActorInvocation, "eigr.functions.protocol", "ActorInvocation");
proto_name!(ActorInvocationResponse, "eigr.functions.protocol", "ActorInvocationResponse");
proto_name!(InvocationRequest, "eigr.functions.protocol", "InvocationRequest");
proto_name!(InvocationResponse, "eigr.functions.protocol", "InvocationResponse");
proto_name!(RegistrationRequest, "eigr.functions.protocol", "RegistrationRequest");
proto_name!(RegistrationResponse, "eigr.functions.protocol", "RegistrationResponse");
proto_name!(SpawnRequest, "eigr.functions.protocol", "SpawnRequest");
proto_name!(SpawnResponse, "eigr.functions.protocol", "SpawnResponse");
