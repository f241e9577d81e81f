// ============================================================================
// Actor Module
// ============================================================================
//
// Handler-facing types: the execution context passed into action callbacks,
// the options used to declare actors and actions, and the workflow builder a
// callback returns its outcome through.
//
// ============================================================================

mod context;
mod opts;
mod workflow;

pub use context::ActorContext;
pub use opts::{ActionOpts, ActorKind, ActorOpts};
pub use workflow::{Broadcast, Effect, Forward, Pipe, Routing, Value, WorkflowResult};

pub(crate) use opts::build_actor_definition;
pub(crate) use workflow::resolve_scheduled_to;
