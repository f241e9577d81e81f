use std::collections::HashMap;

use prost::{Message, Name};
use prost_types::Any;

use crate::envelope;
use crate::proto::{
    Actor, ActorDeactivationStrategy, ActorId, ActorSettings, ActorSnapshotStrategy, ActorState,
    Channel, JsonType, Kind, Metadata, Strategy, TimeoutStrategy,
};

/// Default broadcast receive action for channel subscriptions declared by
/// topic name only.
const DEFAULT_CHANNEL_ACTION: &str = "receive";

const DEFAULT_SNAPSHOT_TIMEOUT_MS: i64 = 3_000;
const DEFAULT_DEACTIVATE_TIMEOUT_MS: i64 = 10_000;

/// How the proxy should host the actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorKind {
    /// One instance, addressed directly by name. The default.
    Unnamed,
    /// A template; named instances are spawned from it with `parent` set.
    Named,
    /// Stateless instances drawn from a bounded pool.
    Pooled,
}

impl From<ActorKind> for Kind {
    fn from(kind: ActorKind) -> Self {
        match kind {
            ActorKind::Unnamed => Kind::Unnamed,
            ActorKind::Named => Kind::Named,
            ActorKind::Pooled => Kind::Pooled,
        }
    }
}

/// Options for declaring an actor on a system.
///
/// Defaults: unnamed, stateful, JSON state (empty `{}` initial state),
/// 3 s snapshot timeout, 10 s deactivation timeout.
#[derive(Clone, Debug)]
pub struct ActorOpts {
    pub name: String,
    pub kind: ActorKind,
    pub stateful: bool,
    pub snapshot_timeout_ms: i64,
    pub deactivate_timeout_ms: i64,
    pub min_pool_size: i32,
    pub max_pool_size: i32,
    pub channels: Vec<Channel>,
    pub tags: HashMap<String, String>,
    pub initial_state: Option<Any>,
}

impl ActorOpts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActorKind::Unnamed,
            stateful: true,
            snapshot_timeout_ms: DEFAULT_SNAPSHOT_TIMEOUT_MS,
            deactivate_timeout_ms: DEFAULT_DEACTIVATE_TIMEOUT_MS,
            min_pool_size: 1,
            max_pool_size: 0,
            channels: Vec::new(),
            tags: HashMap::new(),
            initial_state: None,
        }
    }

    pub fn kind(mut self, kind: ActorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    pub fn snapshot_timeout_ms(mut self, timeout: i64) -> Self {
        self.snapshot_timeout_ms = timeout;
        self
    }

    pub fn deactivate_timeout_ms(mut self, timeout: i64) -> Self {
        self.deactivate_timeout_ms = timeout;
        self
    }

    pub fn pool_size(mut self, min: i32, max: i32) -> Self {
        self.min_pool_size = min;
        self.max_pool_size = max;
        self
    }

    /// Subscribe the actor to a broadcast topic, invoking the default
    /// `receive` action on delivery.
    pub fn channel(self, topic: impl Into<String>) -> Self {
        self.channel_action(topic, DEFAULT_CHANNEL_ACTION)
    }

    /// Subscribe the actor to a broadcast topic with an explicit action.
    pub fn channel_action(mut self, topic: impl Into<String>, action: impl Into<String>) -> Self {
        self.channels.push(Channel {
            topic: topic.into(),
            action: action.into(),
        });
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Declare a typed initial state: the zero value of `S`. Without this,
    /// stateful actors start from an empty JSON document.
    pub fn initial_state_of<S: Message + Name + Default>(mut self) -> Self {
        self.initial_state = Some(envelope::pack(&S::default()));
        self
    }

    pub fn initial_state(mut self, state: Any) -> Self {
        self.initial_state = Some(state);
        self
    }
}

/// Options for declaring an action on an actor.
#[derive(Clone, Debug)]
pub struct ActionOpts {
    pub name: String,
    /// When set, the proxy invokes the action every `timer_seconds` seconds
    /// instead of exposing it for direct invocation.
    pub timer_seconds: Option<i32>,
    /// Declared response type URL; a handler response of a different type
    /// fails finalization.
    pub response_type: Option<String>,
}

impl ActionOpts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timer_seconds: None,
            response_type: None,
        }
    }

    pub fn timer(mut self, seconds: i32) -> Self {
        self.timer_seconds = Some(seconds);
        self
    }

    pub fn response_of<R: Message + Name>(mut self) -> Self {
        self.response_type = Some(R::type_url());
        self
    }
}

/// Build the serialized actor definition registered with the proxy.
pub(crate) fn build_actor_definition(system: &str, opts: &ActorOpts) -> Actor {
    let mut id = ActorId {
        name: opts.name.clone(),
        system: system.to_string(),
        parent: String::new(),
    };

    // Named actors are templates; instances link back through `parent`.
    if opts.kind == ActorKind::Named {
        id.parent = opts.name.clone();
    }

    let state = if opts.stateful {
        let initial = opts
            .initial_state
            .clone()
            .unwrap_or_else(|| envelope::pack(&JsonType::empty()));

        ActorState {
            tags: opts.tags.clone(),
            state: Some(initial),
        }
    } else {
        ActorState {
            tags: opts.tags.clone(),
            state: None,
        }
    };

    let settings = ActorSettings {
        kind: Kind::from(opts.kind) as i32,
        stateful: opts.stateful,
        snapshot_strategy: Some(ActorSnapshotStrategy {
            strategy: Some(Strategy::Timeout(TimeoutStrategy {
                timeout: opts.snapshot_timeout_ms,
            })),
        }),
        deactivation_strategy: Some(ActorDeactivationStrategy {
            strategy: Some(Strategy::Timeout(TimeoutStrategy {
                timeout: opts.deactivate_timeout_ms,
            })),
        }),
        min_pool_size: opts.min_pool_size,
        max_pool_size: opts.max_pool_size,
    };

    Actor {
        id: Some(id),
        state: Some(state),
        metadata: Some(Metadata {
            channel_group: opts.channels.clone(),
            tags: HashMap::new(),
        }),
        settings: Some(settings),
        actions: Vec::new(),
        timer_actions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stateful_default_gets_empty_json_state() {
        let opts = ActorOpts::new("userActor");
        let actor = build_actor_definition("sys", &opts);

        let state = actor.state.unwrap().state.unwrap();
        assert!(envelope::is_json(&state));
        assert_eq!(
            envelope::unpack_json(&state).unwrap(),
            serde_json::json!({})
        );

        let settings = actor.settings.unwrap();
        assert!(settings.stateful);
        assert_eq!(settings.kind, Kind::Unnamed as i32);
    }

    #[test]
    fn test_stateless_actor_has_no_initial_state() {
        let opts = ActorOpts::new("worker")
            .kind(ActorKind::Pooled)
            .stateful(false)
            .pool_size(2, 8);
        let actor = build_actor_definition("sys", &opts);

        assert!(actor.state.unwrap().state.is_none());

        let settings = actor.settings.unwrap();
        assert!(!settings.stateful);
        assert_eq!(settings.min_pool_size, 2);
        assert_eq!(settings.max_pool_size, 8);
    }

    #[test]
    fn test_named_actor_links_parent() {
        let opts = ActorOpts::new("template").kind(ActorKind::Named);
        let actor = build_actor_definition("sys", &opts);

        let id = actor.id.unwrap();
        assert_eq!(id.parent, "template");
        assert_eq!(id.system, "sys");
    }

    #[test]
    fn test_channel_subscription_defaults_to_receive() {
        let opts = ActorOpts::new("listener")
            .channel("news")
            .channel_action("alerts", "onAlert");
        let actor = build_actor_definition("sys", &opts);

        let channels = actor.metadata.unwrap().channel_group;
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].topic, "news");
        assert_eq!(channels[0].action, "receive");
        assert_eq!(channels[1].action, "onAlert");
    }
}
