/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::FtpTlsConfig;
use crate::FtpServerAddr;

/// The transport primitives the session consumes. Implementations decide
/// how sockets are created (bind address, resolver, proxying) and how TLS
/// is performed; the protocol engine never touches the network directly.
#[async_trait]
pub trait FtpTransportProvider<S, E>
where
    S: AsyncRead + AsyncWrite,
    E: Error,
{
    /// Handle to a bound, not yet accepted, active mode data listener.
    type Listener: Send;

    async fn new_control_connection(&mut self, server: &FtpServerAddr) -> Result<S, E>;

    async fn new_data_connection(&mut self, server: &FtpServerAddr) -> Result<S, E>;

    /// Bind a listener for an active mode transfer. Acceptance is deferred
    /// until the server acknowledged the transfer command.
    async fn bind_data_listener(&mut self, local: SocketAddr) -> Result<Self::Listener, E>;

    /// Accept exactly one connection and drop the listener.
    async fn accept_data_connection(&mut self, listener: Self::Listener) -> Result<S, E>;

    /// Upgrade an established stream to TLS.
    async fn start_tls(&mut self, stream: S, tls: &FtpTlsConfig) -> Result<S, E>;
}
