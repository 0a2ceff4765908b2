/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

use crate::config::{FtpDataChannelMode, FtpSessionConfig};
use crate::connection::FtpTransportProvider;
use crate::control::{FtpCommand, FtpControlChannel, FtpSizeOutcome};
use crate::error::{FtpControlError, FtpError};
use crate::facts::{FtpEntryType, FtpFileInfo};
use crate::feature::FtpServerFeature;
use crate::transfer::{FtpLineCollector, FtpLineDataReceiver, FtpLineDataTransfer};
use crate::FtpServerAddr;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum FtpSessionState {
    Initial,
    Ready,
    Closed,
}

/// A data channel that has been negotiated but not yet handed to the
/// transfer: connected upfront in passive mode, a bound listener whose
/// accept is deferred in active mode.
enum FtpPendingData<S, L> {
    Connected(S),
    Listening(L),
}

fn transport_timeout(what: &'static str) -> FtpError {
    FtpError::Transport(Box::new(io::Error::new(io::ErrorKind::TimedOut, what)))
}

struct SessionInner<CP, S, E> {
    server: FtpServerAddr,
    provider: CP,
    config: Arc<FtpSessionConfig>,
    state: FtpSessionState,
    /// True while an operation is between its first and last wire
    /// exchange. Seen set at lock acquisition, it means the previous
    /// holder was cancelled and the control channel state is unknown.
    op_pending: bool,
    control: Option<FtpControlChannel<S>>,
    feature: FtpServerFeature,
    _phantom_e: PhantomData<E>,
}

impl<CP, S, E> SessionInner<CP, S, E> {
    fn control(&mut self) -> Result<&mut FtpControlChannel<S>, FtpError> {
        self.control.as_mut().ok_or(FtpError::SessionNotReady)
    }

    /// Hard session failure: drop the control socket and refuse any
    /// further operation.
    fn abort(&mut self) {
        self.control = None;
        self.state = FtpSessionState::Closed;
        self.op_pending = false;
    }
}

impl<CP, S, E> SessionInner<CP, S, E>
where
    CP: FtpTransportProvider<S, E> + Send,
    S: AsyncRead + AsyncWrite + Send + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    async fn connect_locked(&mut self) -> Result<(), FtpError> {
        let config = self.config.clone();

        let mut stream = match timeout(
            config.connect_timeout,
            self.provider.new_control_connection(&self.server),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(FtpError::transport(e)),
            Err(_) => return Err(transport_timeout("control connect")),
        };

        if let Some(tls) = &config.tls {
            if tls.implicit {
                stream = self
                    .provider
                    .start_tls(stream, tls)
                    .await
                    .map_err(FtpError::transport)?;
            }
        }
        self.control = Some(FtpControlChannel::new(stream, config.control));

        match timeout(config.greeting_timeout, self.control()?.wait_greeting()).await {
            Ok(r) => r?,
            Err(_) => return Err(FtpControlError::ReadTimedOut("greeting").into()),
        }

        self.feature = self.control()?.request_features().await?;

        if let Some(tls) = &config.tls {
            if !tls.implicit {
                if !self.feature.support_auth_tls() {
                    warn!("server did not advertise AUTH TLS, upgrading anyway");
                }
                self.control()?.request_auth_tls().await?;
                let chan = self.control.take().ok_or(FtpError::SessionNotReady)?;
                let stream = self
                    .provider
                    .start_tls(chan.into_stream(), tls)
                    .await
                    .map_err(FtpError::transport)?;
                self.control = Some(FtpControlChannel::new(stream, config.control));
            }
            if !self.feature.support_protection() {
                warn!("server did not advertise PROT, negotiating data protection anyway");
            }
            self.control()?.set_protection_buffer_zero().await?;
            self.control()?.set_private_protection().await?;
        }

        self.control()?
            .login(&config.username, &config.password)
            .await?;

        if self.feature.support_utf8_path() {
            self.control()?.set_use_utf8().await?;
        }

        self.control()?.set_binary_type().await?;

        debug!("ftp session to {} ready", self.server);
        Ok(())
    }

    async fn negotiate_data_channel(
        &mut self,
    ) -> Result<FtpPendingData<S, CP::Listener>, FtpError> {
        match self.config.data_channel {
            FtpDataChannelMode::Passive => {
                let addr = if self.feature.support_extended_passive() {
                    let port = self.control()?.request_extended_passive_port().await?;
                    let mut addr = self.server.clone();
                    addr.set_port(port);
                    addr
                } else {
                    let sa = self.control()?.request_passive_addr().await?;
                    FtpServerAddr::from(sa)
                };

                let stream = match timeout(
                    self.config.connect_timeout,
                    self.provider.new_data_connection(&addr),
                )
                .await
                {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => return Err(FtpError::transport(e)),
                    Err(_) => return Err(transport_timeout("data connect")),
                };
                Ok(FtpPendingData::Connected(stream))
            }
            FtpDataChannelMode::Active => {
                let active = self.config.active.clone();
                let local = SocketAddr::new(active.ip, active.port);

                // nothing goes on the wire if the bind fails
                let listener = self
                    .provider
                    .bind_data_listener(local)
                    .await
                    .map_err(FtpError::transport)?;

                let r = if self.feature.support_extended_active() {
                    self.control()?.request_active_extended(local).await
                } else {
                    match local {
                        SocketAddr::V4(v4) if !active.ipv6 => {
                            self.control()?.request_active_v4(v4).await
                        }
                        _ => Err(FtpError::FeatureUnsupported("EPRT")),
                    }
                };
                match r {
                    Ok(()) => Ok(FtpPendingData::Listening(listener)),
                    Err(e) => {
                        drop(listener);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Turn the negotiated channel into a usable stream once the server
    /// acknowledged the transfer verb: accept the deferred connection in
    /// active mode, then wrap in TLS if the session runs protected.
    async fn finalize_data_channel(
        &mut self,
        pending: FtpPendingData<S, CP::Listener>,
    ) -> Result<S, FtpError> {
        let stream = match pending {
            FtpPendingData::Connected(stream) => stream,
            FtpPendingData::Listening(listener) => {
                match timeout(
                    self.config.connect_timeout,
                    self.provider.accept_data_connection(listener),
                )
                .await
                {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => return Err(FtpError::transport(e)),
                    Err(_) => return Err(transport_timeout("data accept")),
                }
            }
        };

        let config = self.config.clone();
        match &config.tls {
            Some(tls) => self
                .provider
                .start_tls(stream, tls)
                .await
                .map_err(FtpError::transport),
            None => Ok(stream),
        }
    }

    /// The shared transfer prologue: negotiate the data channel, send the
    /// verb, wait for the 150 start mark, finalize. Releases the data
    /// channel on every failure.
    async fn open_transfer(
        &mut self,
        cmd: FtpCommand,
        path: Option<&str>,
    ) -> Result<S, FtpError> {
        let pending = self.negotiate_data_channel().await?;
        if let Err(e) = self.control()?.start_transfer(cmd, path).await {
            drop(pending);
            return Err(e);
        }
        self.finalize_data_channel(pending).await
    }

    async fn wait_transfer_end(&mut self) -> Result<(), FtpError> {
        let end_wait = self.config.transfer.end_wait_timeout;
        self.control()?.wait_transfer_end(end_wait).await
    }

    /// Best-effort read of the trailing reply after a transfer already
    /// failed locally, so the primary error can carry it as auxiliary.
    async fn drain_transfer_end(&mut self) -> Vec<FtpError> {
        match self.wait_transfer_end().await {
            Ok(()) => Vec::new(),
            Err(e) => vec![e],
        }
    }

    async fn retrieve_file_locked(&mut self, path: &str) -> Result<Vec<u8>, FtpError> {
        let mut data = self.open_transfer(FtpCommand::RETR, Some(path)).await?;
        let mut content = Vec::new();
        if let Err(e) = data.read_to_end(&mut content).await {
            drop(data);
            let aux = self.drain_transfer_end().await;
            return Err(FtpError::transport(e).with_auxiliary(aux));
        }
        drop(data);
        self.wait_transfer_end().await?;
        Ok(content)
    }

    async fn store_file_locked(&mut self, path: &str, content: &[u8]) -> Result<(), FtpError> {
        let mut data = self.open_transfer(FtpCommand::STOR, Some(path)).await?;
        if let Err(e) = data.write_all(content).await {
            drop(data);
            let aux = self.drain_transfer_end().await;
            return Err(FtpError::transport(e).with_auxiliary(aux));
        }
        if let Err(e) = data.shutdown().await {
            drop(data);
            let aux = self.drain_transfer_end().await;
            return Err(FtpError::transport(e).with_auxiliary(aux));
        }
        drop(data);
        self.wait_transfer_end().await?;
        Ok(())
    }

    async fn store_start_locked(
        &mut self,
        path: &str,
        allocate: Option<u64>,
    ) -> Result<S, FtpError> {
        if let Some(size) = allocate {
            self.control()?.request_allocate(size).await?;
        }
        self.open_transfer(FtpCommand::STOR, Some(path)).await
    }

    async fn list_directory_locked<R>(
        &mut self,
        cmd: FtpCommand,
        path: Option<&str>,
        receiver: &mut R,
    ) -> Result<(), FtpError>
    where
        R: FtpLineDataReceiver,
    {
        let data = self.open_transfer(cmd, path).await?;
        let transfer = FtpLineDataTransfer::new(data, &self.config.transfer);
        match timeout(
            self.config.transfer.list_all_timeout,
            transfer.read_to_end(receiver),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let aux = self.drain_transfer_end().await;
                return Err(e.with_auxiliary(aux));
            }
            Err(_) => {
                let aux = self.drain_transfer_end().await;
                return Err(transport_timeout("list data").with_auxiliary(aux));
            }
        }
        self.wait_transfer_end().await?;
        Ok(())
    }

    async fn list_machine_locked(
        &mut self,
        path: Option<&str>,
    ) -> Result<Vec<FtpFileInfo>, FtpError> {
        if !self.feature.support_machine_list_dir() {
            return Err(FtpError::FeatureUnsupported("MLSD"));
        }

        let mut collector = FtpLineCollector::default();
        self.list_directory_locked(FtpCommand::MLSD, path, &mut collector)
            .await?;

        let mut entries = Vec::with_capacity(collector.lines.len());
        for line in &collector.lines {
            if line.is_empty() {
                continue;
            }
            entries.push(FtpFileInfo::parse_entry(line)?);
        }
        Ok(entries)
    }

    async fn fetch_file_facts_locked(&mut self, path: &str) -> Result<FtpFileInfo, FtpError> {
        if self.feature.support_machine_list() {
            return self.control()?.request_facts(path).await;
        }

        // no MLST: infer what SIZE and MDTM can tell
        let mut info = FtpFileInfo::new(path);
        if self.feature.support_file_size() {
            match self.control()?.request_size(path).await? {
                FtpSizeOutcome::Size(size) => info.set_size(size),
                FtpSizeOutcome::NotAFile => {
                    info.set_entry_type(FtpEntryType::Dir);
                    return Ok(info);
                }
            }
        }
        if self.feature.support_file_mtime() {
            let mtime = self.control()?.request_mtime(path).await?;
            info.set_mtime(mtime);
        }
        Ok(info)
    }

    async fn file_size_locked(&mut self, path: &str) -> Result<u64, FtpError> {
        match self.control()?.request_size(path).await? {
            FtpSizeOutcome::Size(size) => Ok(size),
            FtpSizeOutcome::NotAFile => Err(FtpError::unexpected_status(
                213,
                550,
                "not a regular file".to_string(),
            )),
        }
    }

    async fn file_mtime_locked(&mut self, path: &str) -> Result<DateTime<Utc>, FtpError> {
        if !self.feature.support_file_mtime() {
            return Err(FtpError::FeatureUnsupported("MDTM"));
        }
        self.control()?.request_mtime(path).await
    }

    async fn rename_locked(&mut self, from: &str, to: &str) -> Result<(), FtpError> {
        self.control()?.rename_from(from).await?;
        self.control()?.rename_to(to).await
    }
}

/// One logical FTP session: a control connection plus short-lived data
/// connections, driven through a transport provider.
///
/// All operations take `&self`; concurrent callers are serialized by an
/// internal async mutex in lock acquisition order. Cloning is shallow,
/// clones share the same session.
pub struct FtpSession<CP, S, E> {
    inner: Arc<Mutex<SessionInner<CP, S, E>>>,
}

impl<CP, S, E> Clone for FtpSession<CP, S, E> {
    fn clone(&self) -> Self {
        FtpSession {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<CP, S, E> FtpSession<CP, S, E>
where
    CP: FtpTransportProvider<S, E> + Send,
    S: AsyncRead + AsyncWrite + Send + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    pub fn new(server: FtpServerAddr, provider: CP, config: FtpSessionConfig) -> Self {
        FtpSession {
            inner: Arc::new(Mutex::new(SessionInner {
                server,
                provider,
                config: Arc::new(config),
                state: FtpSessionState::Initial,
                op_pending: false,
                control: None,
                feature: FtpServerFeature::default(),
                _phantom_e: PhantomData,
            })),
        }
    }

    /// Establish the session: control connection, greeting, feature
    /// negotiation, optional TLS upgrade with `PBSZ 0`/`PROT P`, login,
    /// binary transfer type. Must be called exactly once; any failure
    /// closes the session for good.
    pub async fn connect(&self) -> Result<(), FtpError> {
        let mut guard = self.inner.clone().lock_owned().await;
        if guard.op_pending {
            guard.abort();
            return Err(FtpError::SessionNotReady);
        }
        if guard.state != FtpSessionState::Initial {
            return Err(FtpError::SessionNotReady);
        }
        guard.op_pending = true;
        let r = guard.connect_locked().await;
        guard.op_pending = false;
        match r {
            Ok(()) => {
                guard.state = FtpSessionState::Ready;
                Ok(())
            }
            Err(e) => {
                guard.abort();
                Err(e)
            }
        }
    }

    async fn begin_op(&self) -> Result<OwnedMutexGuard<SessionInner<CP, S, E>>, FtpError> {
        let mut guard = self.inner.clone().lock_owned().await;
        if guard.op_pending {
            // the previous holder was cancelled between exchanges, the
            // control channel may hold a half-read reply
            guard.abort();
            return Err(FtpError::SessionNotReady);
        }
        if guard.state != FtpSessionState::Ready {
            return Err(FtpError::SessionNotReady);
        }
        guard.op_pending = true;
        Ok(guard)
    }

    fn finish_op<T>(
        mut guard: OwnedMutexGuard<SessionInner<CP, S, E>>,
        r: Result<T, FtpError>,
    ) -> Result<T, FtpError> {
        guard.op_pending = false;
        if let Err(e) = &r {
            if e.closes_session() {
                guard.abort();
            }
        }
        r
    }

    /// A snapshot of what the server advertised via FEAT.
    pub async fn server_feature(&self) -> FtpServerFeature {
        self.inner.lock().await.feature.clone()
    }

    pub async fn current_dir(&self) -> Result<String, FtpError> {
        let mut guard = self.begin_op().await?;
        let r = match guard.control() {
            Ok(control) => control.request_current_dir().await,
            Err(e) => Err(e),
        };
        Self::finish_op(guard, r)
    }

    pub async fn change_dir(&self, path: &str) -> Result<(), FtpError> {
        let mut guard = self.begin_op().await?;
        let r = match guard.control() {
            Ok(control) => control.change_dir(path).await,
            Err(e) => Err(e),
        };
        Self::finish_op(guard, r)
    }

    pub async fn change_dir_up(&self) -> Result<(), FtpError> {
        let mut guard = self.begin_op().await?;
        let r = match guard.control() {
            Ok(control) => control.change_dir_up().await,
            Err(e) => Err(e),
        };
        Self::finish_op(guard, r)
    }

    pub async fn make_dir(&self, path: &str) -> Result<(), FtpError> {
        let mut guard = self.begin_op().await?;
        let r = match guard.control() {
            Ok(control) => control.make_dir(path).await,
            Err(e) => Err(e),
        };
        Self::finish_op(guard, r)
    }

    pub async fn remove_dir(&self, path: &str) -> Result<(), FtpError> {
        let mut guard = self.begin_op().await?;
        let r = match guard.control() {
            Ok(control) => control.remove_dir(path).await,
            Err(e) => Err(e),
        };
        Self::finish_op(guard, r)
    }

    pub async fn delete_file(&self, path: &str) -> Result<(), FtpError> {
        let mut guard = self.begin_op().await?;
        let r = match guard.control() {
            Ok(control) => control.delete_file(path).await,
            Err(e) => Err(e),
        };
        Self::finish_op(guard, r)
    }

    /// RNFR + RNTO under one lock acquisition. If RNFR is refused, RNTO
    /// is never sent.
    pub async fn rename_file(&self, from: &str, to: &str) -> Result<(), FtpError> {
        let mut guard = self.begin_op().await?;
        let r = guard.rename_locked(from, to).await;
        Self::finish_op(guard, r)
    }

    pub async fn file_size(&self, path: &str) -> Result<u64, FtpError> {
        let mut guard = self.begin_op().await?;
        let r = guard.file_size_locked(path).await;
        Self::finish_op(guard, r)
    }

    pub async fn file_mtime(&self, path: &str) -> Result<DateTime<Utc>, FtpError> {
        let mut guard = self.begin_op().await?;
        let r = guard.file_mtime_locked(path).await;
        Self::finish_op(guard, r)
    }

    /// Metadata of one path: MLST when advertised, otherwise assembled
    /// from SIZE (550 meaning "this is a directory") and MDTM.
    pub async fn fetch_file_facts(&self, path: &str) -> Result<FtpFileInfo, FtpError> {
        let mut guard = self.begin_op().await?;
        let r = guard.fetch_file_facts_locked(path).await;
        Self::finish_op(guard, r)
    }

    /// LIST. Returns the raw listing lines.
    pub async fn list_directory(&self, path: Option<&str>) -> Result<Vec<String>, FtpError> {
        let mut guard = self.begin_op().await?;
        let mut collector = FtpLineCollector::default();
        let r = guard
            .list_directory_locked(FtpCommand::LIST, path, &mut collector)
            .await;
        Self::finish_op(guard, r.map(|_| collector.lines))
    }

    /// LIST, feeding each line to the caller's receiver as it arrives.
    pub async fn list_directory_with<R>(
        &self,
        path: Option<&str>,
        receiver: &mut R,
    ) -> Result<(), FtpError>
    where
        R: FtpLineDataReceiver,
    {
        let mut guard = self.begin_op().await?;
        let r = guard
            .list_directory_locked(FtpCommand::LIST, path, receiver)
            .await;
        Self::finish_op(guard, r)
    }

    /// MLSD. Returns one parsed entry per listing line.
    pub async fn list_directory_machine(
        &self,
        path: Option<&str>,
    ) -> Result<Vec<FtpFileInfo>, FtpError> {
        let mut guard = self.begin_op().await?;
        let r = guard.list_machine_locked(path).await;
        Self::finish_op(guard, r)
    }

    /// RETR, buffered: drain the data channel to EOF and return the bytes.
    pub async fn retrieve_file(&self, path: &str) -> Result<Vec<u8>, FtpError> {
        let mut guard = self.begin_op().await?;
        let r = guard.retrieve_file_locked(path).await;
        Self::finish_op(guard, r)
    }

    /// STOR, buffered: write all bytes, close the data channel, wait for
    /// the trailing reply.
    pub async fn store_file(&self, path: &str, content: &[u8]) -> Result<(), FtpError> {
        let mut guard = self.begin_op().await?;
        let r = guard.store_file_locked(path, content).await;
        Self::finish_op(guard, r)
    }

    /// RETR, streaming. The returned handle keeps the session locked;
    /// the caller must call [`FtpDataStream::finalize`] when done.
    /// Dropping the handle unfinalized closes the whole session.
    pub async fn retrieve_file_stream(
        &self,
        path: &str,
    ) -> Result<FtpDataStream<CP, S, E>, FtpError> {
        let mut guard = self.begin_op().await?;
        match guard.open_transfer(FtpCommand::RETR, Some(path)).await {
            Ok(data) => Ok(FtpDataStream {
                guard: Some(guard),
                data: Some(data),
            }),
            Err(e) => Self::finish_op(guard, Err(e)),
        }
    }

    /// STOR, streaming, with optional ALLO preallocation. Same finalize
    /// obligation as [`FtpSession::retrieve_file_stream`].
    pub async fn store_file_stream(
        &self,
        path: &str,
        allocate: Option<u64>,
    ) -> Result<FtpDataStream<CP, S, E>, FtpError> {
        let mut guard = self.begin_op().await?;
        match guard.store_start_locked(path, allocate).await {
            Ok(data) => Ok(FtpDataStream {
                guard: Some(guard),
                data: Some(data),
            }),
            Err(e) => Self::finish_op(guard, Err(e)),
        }
    }

    /// Release the session. QUIT is sent when the control channel is
    /// still usable, but nothing depends on its outcome. Idempotent.
    pub async fn quit_and_close(&self) {
        let mut guard = self.inner.clone().lock_owned().await;
        if guard.state == FtpSessionState::Closed {
            return;
        }
        if !guard.op_pending {
            if let Some(control) = guard.control.as_mut() {
                control.send_quit().await;
            }
        }
        guard.abort();
    }
}

/// An open data channel for one streaming transfer. Implements
/// [`AsyncRead`] for downloads and [`AsyncWrite`] for uploads.
///
/// The handle owns the session lock. `finalize` closes the data channel,
/// reads the trailing transfer reply and releases the lock; dropping the
/// handle without finalizing is treated as a cancellation and closes the
/// session.
pub struct FtpDataStream<CP, S, E> {
    guard: Option<OwnedMutexGuard<SessionInner<CP, S, E>>>,
    data: Option<S>,
}

impl<CP, S, E> FtpDataStream<CP, S, E>
where
    CP: FtpTransportProvider<S, E> + Send,
    S: AsyncRead + AsyncWrite + Send + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    pub async fn finalize(mut self) -> Result<(), FtpError> {
        let shutdown_err = match self.data.take() {
            Some(mut data) => data.shutdown().await.err(),
            None => None,
        };
        let Some(mut guard) = self.guard.take() else {
            return Err(FtpError::SessionNotReady);
        };
        guard.op_pending = false;

        let end = guard.wait_transfer_end().await;
        let r = match (shutdown_err, end) {
            (None, Ok(())) => Ok(()),
            (None, Err(e)) => Err(e),
            (Some(e), Ok(())) => Err(FtpError::transport(e)),
            (Some(e), Err(end_err)) => {
                Err(FtpError::transport(e).with_auxiliary(vec![end_err]))
            }
        };
        if let Err(e) = &r {
            if e.closes_session() {
                guard.abort();
            }
        }
        r
    }
}

impl<CP, S, E> Drop for FtpDataStream<CP, S, E> {
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            // dropped without finalize: the trailing reply was never
            // consumed, the session cannot be trusted any more
            guard.abort();
        }
    }
}

impl<CP, S, E> AsyncRead for FtpDataStream<CP, S, E>
where
    S: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().data.as_mut() {
            Some(data) => Pin::new(data).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl<CP, S, E> AsyncWrite for FtpDataStream<CP, S, E>
where
    S: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut().data.as_mut() {
            Some(data) => Pin::new(data).poll_write(cx, buf),
            None => Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().data.as_mut() {
            Some(data) => Pin::new(data).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().data.as_mut() {
            Some(data) => Pin::new(data).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}
