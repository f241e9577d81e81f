//! Client SDK for hosting actors on a remote actor runtime.
//!
//! The runtime proxy owns actor lifecycles, state persistence, and message
//! ordering; this crate supplies the business logic. A process creates one
//! [`System`], declares its actors and action callbacks on it, registers the
//! whole set with the proxy, and then serves callbacks: every invocation
//! arrives over HTTP carrying the actor's current state, the callback
//! returns a [`actor::Value`] describing new state, a response, and any
//! follow-up workflow (broadcasts, side effects, pipe/forward routing).
//!
//! ```no_run
//! use actorbridge::actor::{ActionOpts, ActorOpts, Value};
//! use actorbridge::{InvokeOpts, System};
//! # #[derive(Clone, PartialEq, ::prost::Message)]
//! # struct UserState {
//! #     #[prost(string, tag = "1")]
//! #     name: String,
//! # }
//! # actorbridge::proto_name!(UserState, "example", "UserState");
//! # #[derive(Clone, PartialEq, ::prost::Message)]
//! # struct ChangeUserName {
//! #     #[prost(string, tag = "1")]
//! #     new_name: String,
//! # }
//! # actorbridge::proto_name!(ChangeUserName, "example", "ChangeUserName");
//!
//! # async fn run() -> anyhow::Result<()> {
//! let system = System::create("example-system")?;
//!
//! system
//!     .build_actor(ActorOpts::new("userActor"))
//!     .add_action::<UserState, ChangeUserName, _, _>(
//!         ActionOpts::new("setName"),
//!         |_ctx, command| async move {
//!             Ok(Value::of().state(&UserState {
//!                 name: command.new_name,
//!             }))
//!         },
//!     )?
//!     .done()?;
//!
//! system.register().await?;
//!
//! system
//!     .invoke(
//!         "userActor",
//!         InvokeOpts::new("setName").payload(actorbridge::payload_for(&ChangeUserName {
//!             new_name: "novo_nome".to_string(),
//!         })),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod proto;

mod integration;
mod registry;
mod system;
mod utils;

pub use config::ProxyConfig;
pub use system::{ActorBuilder, InvokeOpts, System};

use prost::{Message, Name};
use prost_types::Any;

/// Pack a typed value into the envelope shape invocation payloads travel in.
pub fn payload_for<T: Message + Name>(value: &T) -> Any {
    envelope::pack(value)
}
