// ============================================================================
// Proxy Wire Schema
// ============================================================================
//
// Hand-maintained prost definitions for the binary protocol spoken by the
// actor runtime proxy. The schema itself is owned by the proxy; these types
// mirror it field-for-field so requests and responses stay interoperable.
//
// Packages:
// - eigr.functions.protocol.actors - actor/system definitions (actors.rs)
// - eigr.functions.protocol        - request/response envelopes (protocol.rs)
//
// ============================================================================

pub mod actors;
pub mod protocol;

pub use actors::{
    Action, Actor, ActorDeactivationStrategy, ActorId, ActorSettings, ActorSnapshotStrategy,
    ActorState, ActorSystem, Channel, FixedTimerAction, Kind, Metadata, Registry, Strategy,
    TimeoutStrategy,
};
pub use protocol::{
    ActorInvocation, ActorInvocationResponse, Broadcast, Context, Forward, InvocationRequest,
    InvocationResponse, JsonType, Noop, Payload, Pipe, ProxyInfo, RegistrationRequest,
    RegistrationResponse, RequestStatus, Routing, ServiceInfo, SideEffect, SpawnRequest,
    SpawnResponse, Status, Workflow,
};

/// Implements `prost::Name` for a hand-maintained message so it can be packed
/// into a `prost_types::Any` with the canonical `type.googleapis.com/` URL the
/// proxy expects.
#[macro_export]
macro_rules! proto_name {
    ($type:ty, $package:literal, $name:literal) => {
        impl ::prost::Name for $type {
            const NAME: &'static str = $name;
            const PACKAGE: &'static str = $package;

            fn full_name() -> String {
                concat!($package, ".", $name).to_string()
            }

            fn type_url() -> String {
                concat!("type.googleapis.com/", $package, ".", $name).to_string()
            }
        }
    };
}
