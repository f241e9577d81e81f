use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use prost::{Message, Name};

use crate::actor::{ActorContext, Value};
use crate::envelope;
use crate::errors::SystemError;
use crate::proto::{ActorId, Context, Payload};

// ============================================================================
// Action Registry
// ============================================================================
//
// Maps `{system}{actor}{action}` (plain string concatenation) to the
// callback registered for that action. Built while the caller composes actor
// definitions; read-only once the system has registered with the proxy.
// Instances of named templates resolve through a second lookup keyed by the
// template (parent) name.
//
// ============================================================================

/// An inbound callback, reduced to what the erased handler needs.
pub(crate) struct InboundInvocation {
    pub context: Context,
    pub payload: Option<Payload>,
    pub self_id: ActorId,
    pub caller: Option<ActorId>,
}

pub(crate) type ErasedHandler =
    Arc<dyn Fn(InboundInvocation) -> BoxFuture<'static, Result<Value, anyhow::Error>> + Send + Sync>;

/// A registered action callback plus its declared response type. The state
/// and payload types are erased into the handler adapter.
#[derive(Clone)]
pub(crate) struct ActionCallbackConnector {
    pub handler: ErasedHandler,
    pub response_type: Option<String>,
}

#[derive(Default)]
pub(crate) struct ActionRegistry {
    connectors: RwLock<HashMap<String, ActionCallbackConnector>>,
    registered: AtomicBool,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        system: &str,
        actor: &str,
        action: &str,
        connector: ActionCallbackConnector,
    ) -> Result<(), SystemError> {
        if self.is_frozen() {
            return Err(SystemError::SystemAlreadyRegistered(format!(
                "{actor}.{action}"
            )));
        }

        let key = Self::key(system, actor, action);
        self.connectors
            .write()
            .expect("action registry lock poisoned")
            .insert(key, connector);

        Ok(())
    }

    pub fn lookup(
        &self,
        system: &str,
        actor: &str,
        action: &str,
    ) -> Option<ActionCallbackConnector> {
        self.connectors
            .read()
            .expect("action registry lock poisoned")
            .get(&Self::key(system, actor, action))
            .cloned()
    }

    /// Resolve an action against the actor name, falling back to its parent
    /// template for named/pooled instances sharing one action set.
    pub fn resolve(&self, id: &ActorId, action: &str) -> Option<ActionCallbackConnector> {
        self.lookup(&id.system, &id.name, action).or_else(|| {
            if id.parent.is_empty() {
                None
            } else {
                self.lookup(&id.system, &id.parent, action)
            }
        })
    }

    /// Reject any further mutation; called once registration succeeds.
    pub fn freeze(&self) {
        self.registered.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    fn key(system: &str, actor: &str, action: &str) -> String {
        format!("{system}{actor}{action}")
    }
}

/// Erase a typed action callback into a connector.
///
/// The adapter unpacks the inbound state with `S` (zero value when the
/// context carries none) and the payload with `P` (zero value for the
/// no-value marker), builds the handler-visible context, and awaits the
/// callback to completion before the dispatcher proceeds.
pub(crate) fn connect_action<S, P, F, Fut>(
    handler: F,
    response_type: Option<String>,
) -> ActionCallbackConnector
where
    S: Message + Name + Default + 'static,
    P: Message + Name + Default + 'static,
    F: Fn(ActorContext<S>, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, anyhow::Error>> + Send + 'static,
{
    let handler = Arc::new(handler);

    let erased: ErasedHandler = Arc::new(move |invocation: InboundInvocation| {
        let handler = handler.clone();

        async move {
            let state: S = match invocation.context.state.as_ref() {
                Some(any) if !envelope::is_noop(any) => envelope::unpack(any)?,
                _ => S::default(),
            };

            let payload: P = match invocation.payload.as_ref().and_then(Payload::as_value) {
                Some(any) if !envelope::is_noop(any) => envelope::unpack(any)?,
                _ => P::default(),
            };

            let context = ActorContext {
                state,
                caller: invocation.caller,
                self_id: invocation.self_id,
                metadata: invocation.context.metadata,
                tags: invocation.context.tags,
            };

            handler(context, payload).await
        }
        .boxed()
    });

    ActionCallbackConnector {
        handler: erased,
        response_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Noop;

    fn noop_connector() -> ActionCallbackConnector {
        connect_action::<Noop, Noop, _, _>(|_ctx, _payload| async { Ok(Value::of()) }, None)
    }

    fn id(system: &str, name: &str, parent: &str) -> ActorId {
        ActorId {
            name: name.to_string(),
            system: system.to_string(),
            parent: parent.to_string(),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ActionRegistry::new();
        registry
            .register("sys", "userActor", "setName", noop_connector())
            .unwrap();

        assert!(registry.lookup("sys", "userActor", "setName").is_some());
        assert!(registry.lookup("sys", "userActor", "unknown").is_none());
        assert!(registry.lookup("other", "userActor", "setName").is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_parent() {
        let registry = ActionRegistry::new();
        registry
            .register("sys", "template", "setName", noop_connector())
            .unwrap();

        // A named instance spawned from the template resolves through parent.
        let instance = id("sys", "instance-42", "template");
        assert!(registry.resolve(&instance, "setName").is_some());

        // Without a parent there is no fallback.
        let orphan = id("sys", "instance-42", "");
        assert!(registry.resolve(&orphan, "setName").is_none());
    }

    #[test]
    fn test_direct_lookup_wins_over_parent() {
        let registry = ActionRegistry::new();
        registry
            .register("sys", "template", "setName", noop_connector())
            .unwrap();
        registry
            .register(
                "sys",
                "special",
                "setName",
                connect_action::<Noop, Noop, _, _>(
                    |_ctx, _payload| async { Ok(Value::of()) },
                    Some("direct".to_string()),
                ),
            )
            .unwrap();

        let instance = id("sys", "special", "template");
        let connector = registry.resolve(&instance, "setName").unwrap();
        assert_eq!(connector.response_type.as_deref(), Some("direct"));
    }

    #[test]
    fn test_frozen_registry_rejects_mutation() {
        let registry = ActionRegistry::new();
        registry.freeze();

        let result = registry.register("sys", "userActor", "setName", noop_connector());
        assert!(matches!(
            result,
            Err(SystemError::SystemAlreadyRegistered(_))
        ));
    }
}
