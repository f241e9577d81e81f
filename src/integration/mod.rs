//! Proxy integration: the outbound HTTP transport and the inbound callback
//! endpoint the proxy invokes actions through.

pub(crate) mod client;
pub(crate) mod server;

pub(crate) use client::{HttpProxyClient, ProxyTransport};
pub(crate) use server::{start_callback_server, CallbackServerHandle};
