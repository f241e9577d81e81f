//! Actor and system definition messages (package `eigr.functions.protocol.actors`).

use std::collections::HashMap;

use crate::proto_name;

/// Unique address of an actor inside a system. `parent` is only set for
/// named instances spawned from an abstract template.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorId {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub system: String,
    #[prost(string, tag = "3")]
    pub parent: String,
}

/// How the proxy hosts instances of an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Kind {
    UnknownKind = 0,
    /// A template actor; concrete instances are spawned with `parent` set.
    Named = 1,
    /// A single instance addressed directly by name.
    Unnamed = 2,
    /// Stateless instances drawn from a bounded pool.
    Pooled = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeoutStrategy {
    #[prost(int64, tag = "1")]
    pub timeout: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorSnapshotStrategy {
    #[prost(oneof = "Strategy", tags = "1")]
    pub strategy: Option<Strategy>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorDeactivationStrategy {
    #[prost(oneof = "Strategy", tags = "1")]
    pub strategy: Option<Strategy>,
}

/// Shared strategy oneof for snapshot and deactivation settings. The proxy
/// currently only defines a timeout-based variant.
#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum Strategy {
    #[prost(message, tag = "1")]
    Timeout(TimeoutStrategy),
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorSettings {
    #[prost(enumeration = "Kind", tag = "1")]
    pub kind: i32,
    #[prost(bool, tag = "2")]
    pub stateful: bool,
    #[prost(message, optional, tag = "3")]
    pub snapshot_strategy: Option<ActorSnapshotStrategy>,
    #[prost(message, optional, tag = "4")]
    pub deactivation_strategy: Option<ActorDeactivationStrategy>,
    #[prost(int32, tag = "5")]
    pub min_pool_size: i32,
    #[prost(int32, tag = "6")]
    pub max_pool_size: i32,
}

/// Opaque actor state plus caller-defined tags, round-tripped through the
/// proxy on every invocation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorState {
    #[prost(map = "string, string", tag = "1")]
    pub tags: HashMap<String, String>,
    #[prost(message, optional, tag = "2")]
    pub state: Option<::prost_types::Any>,
}

/// A broadcast channel subscription.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Channel {
    #[prost(string, tag = "1")]
    pub topic: String,
    #[prost(string, tag = "2")]
    pub action: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Metadata {
    #[prost(message, repeated, tag = "1")]
    pub channel_group: Vec<Channel>,
    #[prost(map = "string, string", tag = "2")]
    pub tags: HashMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Action {
    #[prost(string, tag = "1")]
    pub name: String,
}

/// An action the proxy invokes on a fixed interval.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FixedTimerAction {
    #[prost(int32, tag = "1")]
    pub seconds: i32,
    #[prost(message, optional, tag = "2")]
    pub action: Option<Action>,
}

/// Full definition of one actor as registered with the proxy.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Actor {
    #[prost(message, optional, tag = "1")]
    pub id: Option<ActorId>,
    #[prost(message, optional, tag = "2")]
    pub state: Option<ActorState>,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<Metadata>,
    #[prost(message, optional, tag = "4")]
    pub settings: Option<ActorSettings>,
    #[prost(message, repeated, tag = "5")]
    pub actions: Vec<Action>,
    #[prost(message, repeated, tag = "6")]
    pub timer_actions: Vec<FixedTimerAction>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Registry {
    #[prost(map = "string, message", tag = "1")]
    pub actors: HashMap<String, Actor>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorSystem {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub registry: Option<Registry>,
}

proto_name!(ActorId, "eigr.functions.protocol.actors", "ActorId");
proto_name!(ActorState, "eigr.functions.protocol.actors", "ActorState");
proto_name!(Actor, "eigr.functions.protocol.actors", "Actor");
proto_name!(ActorSystem, "eigr.functions.protocol.actors", "ActorSystem");
