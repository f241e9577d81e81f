use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use prost::{Message, Name};
use prost_types::Any;

use crate::actor::{build_actor_definition, resolve_scheduled_to, ActionOpts, ActorContext, ActorOpts};
use crate::config::ProxyConfig;
use crate::errors::{EnvelopeError, InvocationError, RegisterError, SpawnError, SystemError};
use crate::integration::{start_callback_server, CallbackServerHandle, HttpProxyClient, ProxyTransport};
use crate::proto::{
    Action, ActorId, ActorSystem, FixedTimerAction, InvocationRequest, InvocationResponse,
    Payload, Registry, RegistrationRequest, RegistrationResponse, RequestStatus, ServiceInfo,
    SpawnRequest, Status,
};
use crate::registry::{connect_action, ActionRegistry};
use crate::utils::{retry_fixed, RetryConfig, RetryResult};
use crate::{envelope, proto};

// ============================================================================
// Actor System Handle
// ============================================================================
//
// The single entry point of the SDK. A handle owns the callback server, the
// action registry, and the transport to the proxy; actors are declared on it,
// the whole set is registered in one shot, and invocations flow through it
// afterwards. One live handle per process: actor addressing is ambiguous if
// two systems answer on the same callback endpoint.
//
// ============================================================================

static SYSTEM_LIVE: AtomicBool = AtomicBool::new(false);

const REGISTRATION_MAX_ATTEMPTS: u32 = 60;
const REGISTRATION_RETRY_DELAY: Duration = Duration::from_secs(1);

const PROTOCOL_MAJOR_VERSION: i32 = 1;
const PROTOCOL_MINOR_VERSION: i32 = 1;

/// Options for one invocation through the proxy.
///
/// Defaults: synchronous, not pooled, no payload, immediate, no caller
/// timeout.
#[derive(Clone, Debug, Default)]
pub struct InvokeOpts {
    pub action: String,
    pub payload: Option<Any>,
    /// Fire-and-forget on the proxy side: the reply carries no payload.
    pub asynchronous: bool,
    pub pooled: bool,
    pub metadata: HashMap<String, String>,
    /// Template to spawn the target from first, when the instance may not
    /// exist yet.
    pub reference: Option<String>,
    /// Relative schedule; takes precedence over `scheduled_to`.
    pub delay_ms: Option<u64>,
    pub scheduled_to: Option<DateTime<Utc>>,
    /// Caller-side deadline for the proxy round trip.
    pub timeout_ms: Option<u64>,
}

impl InvokeOpts {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn payload(mut self, payload: Any) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    pub fn pooled(mut self, pooled: bool) -> Self {
        self.pooled = pooled;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Spawn the target from this template before invoking.
    pub fn spawn_from(mut self, template: impl Into<String>) -> Self {
        self.reference = Some(template.into());
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

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

pub struct System {
    name: String,
    registry: Arc<ActionRegistry>,
    actors: Mutex<HashMap<String, proto::Actor>>,
    transport: Arc<dyn ProxyTransport>,
    server: CallbackServerHandle,
}

impl System {
    /// Create the process's actor system, reading proxy and callback endpoint
    /// settings from the environment.
    pub fn create(name: impl Into<String>) -> Result<Self, SystemError> {
        Self::create_with_config(name, ProxyConfig::from_env())
    }

    /// Create the process's actor system with explicit settings. Starts the
    /// callback server immediately; fails when a live system already exists.
    pub fn create_with_config(
        name: impl Into<String>,
        config: ProxyConfig,
    ) -> Result<Self, SystemError> {
        if SYSTEM_LIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SystemError::SystemAlreadyCreated);
        }

        let name = name.into();
        let registry = Arc::new(ActionRegistry::new());

        let server = match start_callback_server(
            registry.clone(),
            config.action_host.clone(),
            config.action_port,
        ) {
            Ok(server) => server,
            Err(error) => {
                SYSTEM_LIVE.store(false, Ordering::SeqCst);
                return Err(error);
            }
        };

        tracing::info!(system = %name, proxy = %config.proxy_url, "Actor system created");

        Ok(Self {
            name,
            registry,
            actors: Mutex::new(HashMap::new()),
            transport: Arc::new(HttpProxyClient::new(config.proxy_url)),
            server,
        })
    }

    /// Declare an actor on this system. The returned builder collects its
    /// actions; `done` adds the definition to the registration set.
    pub fn build_actor(&self, opts: ActorOpts) -> ActorBuilder<'_> {
        ActorBuilder {
            system: self,
            definition: build_actor_definition(&self.name, &opts),
        }
    }

    /// Register every declared actor with the proxy.
    ///
    /// Transport failures are retried at a fixed spacing; a structured
    /// rejection from the proxy is final. Success freezes the action
    /// registry: no further actors or actions can be added.
    pub async fn register(&self) -> Result<(), RegisterError> {
        let actors = self
            .actors
            .lock()
            .expect("actor definitions lock poisoned")
            .clone();

        let request = RegistrationRequest {
            service_info: Some(service_info()),
            actor_system: Some(ActorSystem {
                name: self.name.clone(),
                registry: Some(Registry { actors }),
            }),
        };

        let response = register_with_retry(
            self.transport.as_ref(),
            request,
            RetryConfig {
                max_attempts: REGISTRATION_MAX_ATTEMPTS,
                delay: REGISTRATION_RETRY_DELAY,
            },
        )
        .await?;

        self.registry.freeze();

        if let Some(proxy) = response.proxy_info {
            tracing::info!(
                system = %self.name,
                proxy = %proxy.proxy_name,
                proxy_version = %proxy.proxy_version,
                "Actor system registered"
            );
        }

        Ok(())
    }

    /// Fire an action on an actor, discarding any response payload.
    pub async fn invoke(&self, actor: &str, opts: InvokeOpts) -> Result<(), InvocationError> {
        perform_invocation(self.transport.as_ref(), &self.name, actor, &opts).await?;
        Ok(())
    }

    /// Invoke an action and unpack its response payload as `R`.
    pub async fn invoke_for<R: Message + Name + Default>(
        &self,
        actor: &str,
        opts: InvokeOpts,
    ) -> Result<R, InvocationError> {
        let response = perform_invocation(self.transport.as_ref(), &self.name, actor, &opts).await?;
        unpack_response(response.payload)
    }

    /// Stop the callback server and release the process-wide system slot.
    pub async fn teardown(self) {
        tracing::info!(system = %self.name, "Tearing down actor system");
        self.server.stop().await;
        SYSTEM_LIVE.store(false, Ordering::SeqCst);
    }
}

/// Collects the actions of one actor before it joins the registration set.
pub struct ActorBuilder<'a> {
    system: &'a System,
    definition: proto::Actor,
}

impl ActorBuilder<'_> {
    /// Attach an action callback typed over the actor state `S` and the
    /// inbound payload `P`. Timer actions are carried separately so the
    /// proxy schedules them instead of exposing them for direct invocation.
    pub fn add_action<S, P, F, Fut>(
        mut self,
        opts: ActionOpts,
        handler: F,
    ) -> Result<Self, SystemError>
    where
        S: Message + Name + Default + 'static,
        P: Message + Name + Default + 'static,
        F: Fn(ActorContext<S>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<crate::actor::Value, anyhow::Error>> + Send + 'static,
    {
        let actor_name = self
            .definition
            .id
            .as_ref()
            .map(|id| id.name.clone())
            .unwrap_or_default();

        self.system.registry.register(
            &self.system.name,
            &actor_name,
            &opts.name,
            connect_action::<S, P, _, _>(handler, opts.response_type.clone()),
        )?;

        match opts.timer_seconds {
            Some(seconds) => self.definition.timer_actions.push(FixedTimerAction {
                seconds,
                action: Some(Action { name: opts.name }),
            }),
            None => self.definition.actions.push(Action { name: opts.name }),
        }

        Ok(self)
    }

    /// Add the finished definition to the system's registration set.
    pub fn done(self) -> Result<(), SystemError> {
        if self.system.registry.is_frozen() {
            let name = self
                .definition
                .id
                .as_ref()
                .map(|id| id.name.clone())
                .unwrap_or_default();
            return Err(SystemError::SystemAlreadyRegistered(name));
        }

        let name = self
            .definition
            .id
            .as_ref()
            .map(|id| id.name.clone())
            .unwrap_or_default();

        self.system
            .actors
            .lock()
            .expect("actor definitions lock poisoned")
            .insert(name, self.definition);

        Ok(())
    }
}

fn service_info() -> ServiceInfo {
    ServiceInfo {
        service_name: env!("CARGO_PKG_NAME").to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        service_runtime: "rust".to_string(),
        support_library_name: env!("CARGO_PKG_NAME").to_string(),
        support_library_version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_major_version: PROTOCOL_MAJOR_VERSION,
        protocol_minor_version: PROTOCOL_MINOR_VERSION,
    }
}

/// A set status that is neither absent nor OK.
fn failure_status(status: &Option<RequestStatus>) -> Option<&RequestStatus> {
    status
        .as_ref()
        .filter(|s| s.status != Status::Unknown as i32 && s.status != Status::Ok as i32)
}

/// Send a registration, retrying transport failures at a fixed spacing.
/// Structured rejections are permanent and returned immediately.
pub(crate) async fn register_with_retry(
    transport: &dyn ProxyTransport,
    request: RegistrationRequest,
    config: RetryConfig,
) -> Result<RegistrationResponse, RegisterError> {
    let result = retry_fixed(config, |attempt| {
        let request = request.clone();
        async move {
            tracing::debug!(attempt, "Sending registration to proxy");
            let response = transport.register(request).await?;

            if let Some(status) = failure_status(&response.status) {
                return Err(RegisterError::Rejected {
                    message: status.message.clone(),
                    status: status.status,
                });
            }

            Ok(response)
        }
    })
    .await;

    match result {
        RetryResult::Success(response) => Ok(response),
        RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => Err(error),
    }
}

pub(crate) fn build_invocation_request(
    system: &str,
    actor: &str,
    opts: &InvokeOpts,
) -> InvocationRequest {
    InvocationRequest {
        system: Some(ActorSystem {
            name: system.to_string(),
            registry: None,
        }),
        actor: Some(proto::Actor {
            id: Some(ActorId {
                name: actor.to_string(),
                system: system.to_string(),
                parent: opts.reference.clone().unwrap_or_default(),
            }),
            ..Default::default()
        }),
        action_name: opts.action.clone(),
        payload: Some(
            opts.payload
                .clone()
                .map(Payload::Value)
                .unwrap_or_else(Payload::noop),
        ),
        r#async: opts.asynchronous,
        caller: None,
        metadata: opts.metadata.clone(),
        pooled: opts.pooled,
        scheduled_to: resolve_scheduled_to(opts.delay_ms, opts.scheduled_to).unwrap_or(0),
    }
}

/// Spawn a named instance from its template before first use.
async fn spawn_instance(
    transport: &dyn ProxyTransport,
    system: &str,
    actor: &str,
    template: &str,
) -> Result<(), SpawnError> {
    let request = SpawnRequest {
        actors: vec![ActorId {
            name: actor.to_string(),
            system: system.to_string(),
            parent: template.to_string(),
        }],
    };

    let response = transport.spawn(system, request).await?;

    if let Some(status) = failure_status(&response.status) {
        return Err(SpawnError::Rejected {
            message: status.message.clone(),
            status: status.status,
        });
    }

    Ok(())
}

/// Run one invocation: optional prerequisite spawn, then the proxy round
/// trip, raced against the caller timeout when one is set. Expiry abandons
/// the response; the request itself is not cancelled on the proxy.
pub(crate) async fn perform_invocation(
    transport: &dyn ProxyTransport,
    system: &str,
    actor: &str,
    opts: &InvokeOpts,
) -> Result<InvocationResponse, InvocationError> {
    if let Some(template) = &opts.reference {
        spawn_instance(transport, system, actor, template).await?;
    }

    let request = build_invocation_request(system, actor, opts);

    let response = match opts.timeout_ms {
        Some(limit) => tokio::time::timeout(
            Duration::from_millis(limit),
            transport.invoke(request),
        )
        .await
        .map_err(|_| InvocationError::Timeout {
            limit_ms: limit as u128,
        })??,
        None => transport.invoke(request).await?,
    };

    if let Some(status) = failure_status(&response.status) {
        return Err(InvocationError::Rejected {
            message: status.message.clone(),
            status: status.status,
        });
    }

    Ok(response)
}

/// Unpack a remote response payload as `R`. The no-value marker and an
/// absent payload both mean the remote action produced nothing.
pub(crate) fn unpack_response<R: Message + Name + Default>(
    payload: Option<Payload>,
) -> Result<R, InvocationError> {
    match payload {
        Some(Payload::Value(any)) => envelope::unpack(&any).map_err(|error| match error {
            EnvelopeError::TypeMismatch { expected, got } => {
                InvocationError::WrongOutput { expected, got }
            }
            other => InvocationError::Envelope(other),
        }),
        _ => Err(InvocationError::MissingResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::proto::SpawnResponse;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    fn transport_failure() -> TransportError {
        TransportError::Decode(prost::DecodeError::new("simulated transport failure"))
    }

    fn ok_status() -> Option<RequestStatus> {
        Some(RequestStatus {
            status: Status::Ok as i32,
            message: String::new(),
        })
    }

    fn error_status(message: &str) -> Option<RequestStatus> {
        Some(RequestStatus {
            status: Status::Error as i32,
            message: message.to_string(),
        })
    }

    /// Canned transport: `None` responses simulate a transport failure.
    #[derive(Default)]
    struct MockTransport {
        register_attempts: AtomicU32,
        register_response: Option<RegistrationResponse>,
        invoke_response: Option<InvocationResponse>,
        invoke_delay: Option<Duration>,
        spawn_calls: AtomicU32,
        spawn_response: Option<SpawnResponse>,
    }

    #[async_trait]
    impl ProxyTransport for MockTransport {
        async fn register(
            &self,
            _request: RegistrationRequest,
        ) -> Result<RegistrationResponse, TransportError> {
            self.register_attempts.fetch_add(1, Ordering::SeqCst);
            self.register_response.clone().ok_or_else(transport_failure)
        }

        async fn invoke(
            &self,
            _request: InvocationRequest,
        ) -> Result<InvocationResponse, TransportError> {
            if let Some(delay) = self.invoke_delay {
                tokio::time::sleep(delay).await;
            }
            self.invoke_response.clone().ok_or_else(transport_failure)
        }

        async fn spawn(
            &self,
            _system: &str,
            _request: SpawnRequest,
        ) -> Result<SpawnResponse, TransportError> {
            self.spawn_calls.fetch_add(1, Ordering::SeqCst);
            self.spawn_response.clone().ok_or_else(transport_failure)
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct Reply {
        #[prost(string, tag = "1")]
        text: String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    struct Other {
        #[prost(int32, tag = "1")]
        n: i32,
    }

    crate::proto_name!(Reply, "bridge.test", "Reply");
    crate::proto_name!(Other, "bridge.test", "Other");

    fn registration_request() -> RegistrationRequest {
        RegistrationRequest {
            service_info: Some(service_info()),
            actor_system: Some(ActorSystem {
                name: "sys".to_string(),
                registry: Some(Registry {
                    actors: HashMap::new(),
                }),
            }),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_retries_transport_failures_to_the_bound() {
        let transport = MockTransport::default();

        let config = RetryConfig {
            max_attempts: 60,
            delay: Duration::from_secs(1),
        };

        let result = register_with_retry(&transport, registration_request(), config).await;

        assert!(matches!(result, Err(RegisterError::Transport(_))));
        assert_eq!(transport.register_attempts.load(Ordering::SeqCst), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_registration_is_not_retried() {
        let transport = MockTransport {
            register_response: Some(RegistrationResponse {
                status: error_status("registration denied"),
                proxy_info: None,
            }),
            ..Default::default()
        };

        let config = RetryConfig {
            max_attempts: 60,
            delay: Duration::from_secs(1),
        };

        let result = register_with_retry(&transport, registration_request(), config).await;

        assert!(matches!(
            result,
            Err(RegisterError::Rejected { status, .. }) if status == Status::Error as i32
        ));
        assert_eq!(transport.register_attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_successful_registration_returns_response() {
        let transport = MockTransport {
            register_response: Some(RegistrationResponse {
                status: ok_status(),
                proxy_info: None,
            }),
            ..Default::default()
        };

        let result = register_with_retry(
            &transport,
            registration_request(),
            RetryConfig::default(),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(transport.register_attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invocation_request_defaults() {
        let opts = InvokeOpts::new("setName");
        let request = build_invocation_request("sys", "userActor", &opts);

        assert_eq!(request.action_name, "setName");
        assert!(!request.r#async);
        assert!(!request.pooled);
        assert_eq!(request.scheduled_to, 0);
        assert_eq!(request.payload, Some(Payload::noop()));
        assert_eq!(request.actor.unwrap().id.unwrap().parent, "");
    }

    #[test]
    fn test_invocation_request_schedule_and_reference() {
        let before = Utc::now().timestamp_millis();

        let opts = InvokeOpts::new("setName")
            .spawn_from("template")
            .delayed_ms(2_000)
            .at(Utc::now() - chrono::Duration::hours(1));

        let request = build_invocation_request("sys", "instance-1", &opts);

        // Relative delay wins over the stale absolute timestamp.
        assert!(request.scheduled_to >= before + 2_000);
        assert_eq!(request.actor.unwrap().id.unwrap().parent, "template");
    }

    #[tokio::test]
    async fn test_invocation_rejected_by_status() {
        let transport = MockTransport {
            invoke_response: Some(InvocationResponse {
                status: error_status("actor crashed"),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result =
            perform_invocation(&transport, "sys", "userActor", &InvokeOpts::new("boom")).await;

        assert!(matches!(
            result,
            Err(InvocationError::Rejected { message, .. }) if message == "actor crashed"
        ));
    }

    #[tokio::test]
    async fn test_invocation_without_status_is_ok() {
        let transport = MockTransport {
            invoke_response: Some(InvocationResponse::default()),
            ..Default::default()
        };

        let result =
            perform_invocation(&transport, "sys", "userActor", &InvokeOpts::new("get")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_reference_triggers_spawn_first() {
        let transport = MockTransport {
            invoke_response: Some(InvocationResponse::default()),
            spawn_response: Some(SpawnResponse { status: ok_status() }),
            ..Default::default()
        };

        let opts = InvokeOpts::new("setName").spawn_from("template");
        perform_invocation(&transport, "sys", "instance-1", &opts)
            .await
            .unwrap();

        assert_eq!(transport.spawn_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_spawn_aborts_invocation() {
        let transport = MockTransport {
            invoke_response: Some(InvocationResponse::default()),
            spawn_response: Some(SpawnResponse {
                status: error_status("no such template"),
            }),
            ..Default::default()
        };

        let opts = InvokeOpts::new("setName").spawn_from("missing");
        let result = perform_invocation(&transport, "sys", "instance-1", &opts).await;

        assert!(matches!(
            result,
            Err(InvocationError::Spawn(SpawnError::Rejected { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_timeout_races_the_round_trip() {
        let transport = MockTransport {
            invoke_response: Some(InvocationResponse::default()),
            invoke_delay: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let opts = InvokeOpts::new("slow").timeout_ms(500);
        let result = perform_invocation(&transport, "sys", "userActor", &opts).await;

        assert!(matches!(
            result,
            Err(InvocationError::Timeout { limit_ms: 500 })
        ));
    }

    #[test]
    fn test_unpack_response_variants() {
        let reply = Reply {
            text: "done".to_string(),
        };

        let unpacked: Reply =
            unpack_response(Some(Payload::Value(envelope::pack(&reply)))).unwrap();
        assert_eq!(unpacked, reply);

        let result: Result<Other, _> =
            unpack_response(Some(Payload::Value(envelope::pack(&reply))));
        assert!(matches!(result, Err(InvocationError::WrongOutput { .. })));

        let result: Result<Reply, _> = unpack_response(Some(Payload::noop()));
        assert!(matches!(result, Err(InvocationError::MissingResponse)));

        let result: Result<Reply, _> = unpack_response(None);
        assert!(matches!(result, Err(InvocationError::MissingResponse)));
    }

    #[test]
    fn test_service_info_carries_protocol_version() {
        let info = service_info();
        assert_eq!(info.protocol_major_version, 1);
        assert_eq!(info.protocol_minor_version, 1);
        assert!(!info.support_library_name.is_empty());
    }

    // Everything touching the process-wide live-system slot lives in one
    // test; the flag is global and the suite runs in parallel.
    #[tokio::test]
    async fn test_system_lifecycle_and_builder() {
        let config = ProxyConfig {
            action_host: "127.0.0.1".to_string(),
            action_port: 0,
            ..Default::default()
        };

        let system = System::create_with_config("sys-lifecycle", config.clone()).unwrap();

        assert!(matches!(
            System::create_with_config("second", config.clone()),
            Err(SystemError::SystemAlreadyCreated)
        ));

        system.teardown().await;

        // The slot is free again after teardown.
        let system = System::create_with_config("sys-builder", config).unwrap();

        system
            .build_actor(ActorOpts::new("clockActor"))
            .add_action::<Reply, crate::proto::Noop, _, _>(
                ActionOpts::new("tick").timer(10),
                |_ctx, _payload| async { Ok(crate::actor::Value::of()) },
            )
            .unwrap()
            .add_action::<Reply, crate::proto::Noop, _, _>(
                ActionOpts::new("read"),
                |_ctx, _payload| async { Ok(crate::actor::Value::of()) },
            )
            .unwrap()
            .done()
            .unwrap();

        {
            let actors = system.actors.lock().unwrap();
            let actor = actors.get("clockActor").unwrap();

            assert_eq!(actor.actions.len(), 1);
            assert_eq!(actor.actions[0].name, "read");
            assert_eq!(actor.timer_actions.len(), 1);
            assert_eq!(actor.timer_actions[0].seconds, 10);
            assert_eq!(actor.timer_actions[0].action.as_ref().unwrap().name, "tick");
        }

        assert!(system.registry.lookup("sys-builder", "clockActor", "tick").is_some());

        system.teardown().await;
    }
}
