use std::collections::HashMap;

use crate::proto::ActorId;

/// Execution context handed to an action callback.
///
/// The state is unpacked from the envelope the proxy round-trips with every
/// invocation; this process holds no actor state between requests. Metadata
/// is echoed back to the proxy unchanged; tags may be replaced wholesale by
/// the handler's workflow result.
#[derive(Clone, Debug)]
pub struct ActorContext<S> {
    /// Current actor state, or the type's zero value when the proxy sent none.
    pub state: S,
    /// The actor (or external client) that triggered this invocation.
    pub caller: Option<ActorId>,
    /// The actor this action is executing on.
    pub self_id: ActorId,
    pub metadata: HashMap<String, String>,
    pub tags: HashMap<String, String>,
}
