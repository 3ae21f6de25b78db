//! JT/T 809 dual-link session
//!
//! The subordinate platform dials the superior platform's main link, logs
//! in and announces where the sub link should be dialed back. Both links
//! then carry traffic until either one drops or [`Jt809Server::shutdown`]
//! is called.
//!
//! # Tasks
//! - one receive loop per link, feeding a bounded mailbox
//! - one dispatcher draining the mailbox, spawning a task per packet
//! - one sub-link accept task
//! - one keepalive task, started on the first successful login
//!
//! Every outbound frame goes through [`Jt809Server::send`], which holds the
//! link mutex for the whole encode-and-write so frames never interleave.

use crate::config::ServerConfig;
use crate::listener::SubLinkListener;
use crate::task::spawn_supervised;
use jt809_application::message_type::UP_CONNECT_REQ;
use jt809_application::{
    encode_packet, login_result, LinkType, Packet, PacketBody, PacketReader, RealLocation,
    ResultCode, SerialNoGenerator, SubPacket, UpConnectReq, UpConnectRsp, UpDisconnectReq,
    UpExgMsg, PROTOCOL_VERSION,
};
use jt809_core::datatypes::PlateColor;
use jt809_core::{Jt809Error, Jt809Result};
use jt809_session::{LinkStatistics, SessionState};
use jt809_transport::{StreamWriter, TcpReader, TcpSettings, TcpTransport};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One of the two links of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Link {
    /// Dialed by this platform
    Main,
    /// Dialed back by the superior platform
    Sub,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Main => f.write_str("main"),
            Link::Sub => f.write_str("sub"),
        }
    }
}

/// Frame counters of both links
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    pub main: LinkStatistics,
    pub sub: LinkStatistics,
}

impl SessionStatistics {
    pub fn link(&self, link: Link) -> &LinkStatistics {
        match link {
            Link::Main => &self.main,
            Link::Sub => &self.sub,
        }
    }

    fn link_mut(&mut self, link: Link) -> &mut LinkStatistics {
        match link {
            Link::Main => &mut self.main,
            Link::Sub => &mut self.sub,
        }
    }
}

type ConnectCallback = Box<dyn FnOnce() + Send + 'static>;

/// A decoded packet waiting for dispatch
struct Inbound {
    link: Link,
    packet: Packet,
}

/// Write halves of both links plus the serial numbers stamped on them
struct Links {
    main: Option<Box<dyn StreamWriter>>,
    sub: Option<Box<dyn StreamWriter>>,
    serials: SerialNoGenerator,
}

impl Links {
    fn available(writer: &Option<Box<dyn StreamWriter>>) -> bool {
        writer.as_ref().is_some_and(|w| !w.is_closed())
    }

    /// Pick a link for `link_type`, falling back where allowed
    fn select(&self, link_type: LinkType) -> Option<Link> {
        let main = Self::available(&self.main);
        let sub = Self::available(&self.sub);
        match link_type {
            LinkType::MainOnly => main.then_some(Link::Main),
            LinkType::SubOnly => sub.then_some(Link::Sub),
            LinkType::MainPreferred if main => Some(Link::Main),
            LinkType::MainPreferred => sub.then_some(Link::Sub),
            LinkType::SubPreferred if sub => Some(Link::Sub),
            LinkType::SubPreferred => main.then_some(Link::Main),
        }
    }

    fn writer_mut(&mut self, link: Link) -> Option<&mut Box<dyn StreamWriter>> {
        match link {
            Link::Main => self.main.as_mut(),
            Link::Sub => self.sub.as_mut(),
        }
    }
}

struct Inner {
    config: ServerConfig,
    state: Mutex<SessionState>,
    links: tokio::sync::Mutex<Links>,
    stats: Mutex<SessionStatistics>,
    on_connect: Mutex<Option<ConnectCallback>>,
    /// First error that ended the session
    fatal: Mutex<Option<Jt809Error>>,
    /// Cancelled when shutdown begins
    cancel: CancellationToken,
    /// Cancelled when shutdown has finished
    closed: CancellationToken,
    shutting_down: AtomicBool,
    login_acked: AtomicBool,
    sub_connected: AtomicBool,
    keepalive_started: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn shut_down(packet: &Packet) -> Jt809Error {
    Jt809Error::LinkUnavailable(format!(
        "session is shut down, {} not sent",
        packet.description()
    ))
}

/// JT/T 809 gateway session
///
/// Cheap to clone; clones share one session.
///
/// # Usage Example
/// ```rust,no_run
/// use jt809_server::{Jt809Server, ServerConfig};
///
/// # async fn demo() -> jt809_core::Jt809Result<()> {
/// let config = ServerConfig::new()
///     .with_user(20180920, "20180920")
///     .with_gnss_center_id(20180920)
///     .with_main_link_address("10.0.0.8:8090")
///     .with_down_link("10.0.0.20", 8091);
/// let server = Jt809Server::new(config);
/// server.on_connect(|| log::info!("both links up"));
/// server.run().await
/// # }
/// ```
#[derive(Clone)]
pub struct Jt809Server {
    inner: Arc<Inner>,
}

impl Jt809Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(SessionState::Idle),
                links: tokio::sync::Mutex::new(Links {
                    main: None,
                    sub: None,
                    serials: SerialNoGenerator::new(),
                }),
                stats: Mutex::new(SessionStatistics::default()),
                on_connect: Mutex::new(None),
                fatal: Mutex::new(None),
                cancel: CancellationToken::new(),
                closed: CancellationToken::new(),
                shutting_down: AtomicBool::new(false),
                login_acked: AtomicBool::new(false),
                sub_connected: AtomicBool::new(false),
                keepalive_started: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *lock(&self.inner.state)
    }

    /// Snapshot of the per-link counters
    pub fn statistics(&self) -> SessionStatistics {
        lock(&self.inner.stats).clone()
    }

    /// Register a callback run once both links are up and login succeeded
    ///
    /// Runs immediately if the session is already established. A later
    /// registration replaces one that has not run yet.
    pub fn on_connect<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let state = lock(&self.inner.state);
            if !state.is_established() {
                *lock(&self.inner.on_connect) = Some(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Run the session until it shuts down
    ///
    /// # Errors
    /// - `Jt809Error::Configuration` if the configuration is invalid
    /// - `Jt809Error::Protocol` if the session was already started, or the
    ///   login was rejected
    /// - `Jt809Error::Connection` / `Jt809Error::Timeout` if the sub-link
    ///   listener cannot bind, the main link cannot be dialed, or accepting
    ///   the sub link fails
    ///
    /// Returns `Ok(())` after an orderly shutdown, including one caused by
    /// a peer closing a link.
    pub async fn run(&self) -> Jt809Result<()> {
        let config = &self.inner.config;
        config.validate()?;
        if !self.transition(SessionState::DialingMain) {
            return Err(Jt809Error::Protocol(format!(
                "session cannot start from state {}",
                self.state()
            )));
        }

        let listener = match SubLinkListener::bind(&config.listen_address()).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("{}", e);
                self.shutdown().await;
                return Err(e);
            }
        };
        let down_link_port = listener.local_addr().port();

        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        self.spawn_accept(listener, tx.clone());
        self.spawn_dispatcher(rx);

        log::info!("Dialing main link {}", config.main_link_address);
        let transport = TcpTransport::new(TcpSettings::with_timeout(
            config.main_link_address.clone(),
            config.connect_timeout(),
        ));
        let opened = tokio::select! {
            _ = self.inner.cancel.cancelled() => {
                self.inner.closed.cancelled().await;
                return self.take_fatal();
            }
            r = transport.open() => r,
        };
        let (reader, writer, peer) = match opened {
            Ok(link) => link,
            Err(e) => {
                log::error!("Failed to dial main link {}: {}", config.main_link_address, e);
                self.shutdown().await;
                return Err(e);
            }
        };
        log::info!("Main link connected to {}", peer);
        self.inner.links.lock().await.main = Some(Box::new(writer));
        self.spawn_receiver(Link::Main, reader, tx);

        let login = Packet::new(PacketBody::UpConnectReq(UpConnectReq {
            user_id: config.user_id,
            password: config.password.clone(),
            down_link_ip: config.down_link_ip.clone(),
            down_link_port,
        }));
        if let Err(e) = self.send(login).await {
            log::error!("Failed to send login: {}", e);
            self.shutdown().await;
            return Err(e);
        }
        if self.transition(SessionState::AwaitingSubLink) {
            self.progress();
        }

        self.inner.closed.cancelled().await;
        self.take_fatal()
    }

    /// Close both links and stop all tasks
    ///
    /// Safe to call repeatedly and concurrently; the closing pass runs once
    /// and every caller returns after it has finished.
    pub async fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            self.inner.closed.cancelled().await;
            return;
        }

        log::info!("Shutting down session");
        self.transition(SessionState::ShuttingDown);
        self.inner.cancel.cancel();

        // Senders release the lock once `cancel` fires.
        let (main, sub) = {
            let mut links = self.inner.links.lock().await;
            (links.main.take(), links.sub.take())
        };
        for (link, writer) in [(Link::Main, main), (Link::Sub, sub)] {
            if let Some(mut writer) = writer {
                if let Err(e) = writer.close().await {
                    log::debug!("Closing {} link: {}", link, e);
                }
            }
        }

        self.transition(SessionState::Closed);
        self.inner.closed.cancel();
    }

    /// Send a packet on the link its type calls for
    ///
    /// Stamps the serial number (per type), centre id and protocol version.
    /// Only the login request is enciphered, and only when a login key is
    /// configured.
    ///
    /// # Errors
    /// - `Jt809Error::LinkUnavailable` if no suitable link is connected, or
    ///   the session shuts down before the frame is written
    /// - `Jt809Error::Connection` if the write fails
    /// - encoding errors for bodies that do not fit their fields
    pub async fn send(&self, mut packet: Packet) -> Jt809Result<()> {
        let cancel = &self.inner.cancel;
        if cancel.is_cancelled() {
            return Err(shut_down(&packet));
        }

        let link_type = packet.link_type();
        let mut links = tokio::select! {
            _ = cancel.cancelled() => return Err(shut_down(&packet)),
            guard = self.inner.links.lock() => guard,
        };
        let link = links.select(link_type).ok_or_else(|| {
            Jt809Error::LinkUnavailable(format!(
                "no {} link for {}",
                link_type,
                packet.description()
            ))
        })?;

        let msg_type = packet.msg_type();
        packet.header.serial_no = links.serials.next_for_type(msg_type);
        packet.header.gnss_center_id = self.inner.config.gnss_center_id;
        packet.header.version = PROTOCOL_VERSION;
        packet.header.clear_encryption();
        if msg_type == UP_CONNECT_REQ {
            if let Some(key) = self.inner.config.login_encrypt_key {
                packet.header.set_encryption(key);
            }
        }
        let frame = encode_packet(&mut packet)?;

        let writer = links
            .writer_mut(link)
            .ok_or_else(|| Jt809Error::LinkUnavailable(format!("{} link not connected", link)))?;
        let written = tokio::select! {
            _ = cancel.cancelled() => None,
            r = async {
                writer.write_all(&frame).await?;
                writer.flush().await?;
                Ok::<(), Jt809Error>(())
            } => Some(r),
        };
        drop(links);
        match written {
            Some(result) => result?,
            None => return Err(shut_down(&packet)),
        }

        self.update_stats(link, |s| s.increment_frames_sent());
        log::debug!("Sent on {} link: {}", link, packet);
        Ok(())
    }

    /// Report a real-time vehicle fix
    pub async fn send_real_location(
        &self,
        plate: &str,
        color: PlateColor,
        location: RealLocation,
    ) -> Jt809Result<()> {
        let msg = UpExgMsg::new(plate, color, SubPacket::RealLocation(location))?;
        self.send(Packet::new(PacketBody::UpExgMsg(msg))).await
    }

    /// Ask the superior platform to end the session
    pub async fn logout(&self) -> Jt809Result<()> {
        let config = &self.inner.config;
        self.send(Packet::new(PacketBody::UpDisconnectReq(UpDisconnectReq {
            user_id: config.user_id,
            password: config.password.clone(),
        })))
        .await
    }

    fn transition(&self, new_state: SessionState) -> bool {
        let mut state = lock(&self.inner.state);
        Self::step(&mut state, new_state)
    }

    fn step(state: &mut SessionState, new_state: SessionState) -> bool {
        match state.validate_transition(new_state) {
            Ok(()) => {
                if *state != new_state {
                    log::info!("Session state {} -> {}", state, new_state);
                    *state = new_state;
                }
                true
            }
            Err(e) => {
                log::debug!("{}", e);
                false
            }
        }
    }

    /// Move towards `Established` as the sub link and login ack arrive
    fn progress(&self) {
        let sub_connected = self.inner.sub_connected.load(Ordering::SeqCst);
        let login_acked = self.inner.login_acked.load(Ordering::SeqCst);

        let established = {
            let mut state = lock(&self.inner.state);
            if *state == SessionState::AwaitingSubLink && (sub_connected || login_acked) {
                Self::step(&mut state, SessionState::LoggingIn);
            }
            *state == SessionState::LoggingIn
                && sub_connected
                && login_acked
                && Self::step(&mut state, SessionState::Established)
        };

        if established {
            log::info!("Session established");
            let callback = lock(&self.inner.on_connect).take();
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    /// Record `error` as the reason the session ended, then shut down
    async fn fail(&self, error: Jt809Error) {
        {
            let mut fatal = lock(&self.inner.fatal);
            if fatal.is_none() {
                *fatal = Some(error);
            }
        }
        self.shutdown().await;
    }

    fn take_fatal(&self) -> Jt809Result<()> {
        match lock(&self.inner.fatal).take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn update_stats<F: FnOnce(&mut LinkStatistics)>(&self, link: Link, f: F) {
        f(lock(&self.inner.stats).link_mut(link));
    }

    fn spawn_accept(&self, listener: SubLinkListener, tx: mpsc::Sender<Inbound>) {
        let server = self.clone();
        spawn_supervised("sub-link accept", async move {
            let (stream, peer) = match listener.accept(&server.inner.cancel).await {
                Ok(Some(accepted)) => accepted,
                Ok(None) => return,
                Err(e) => {
                    server.fail(e).await;
                    return;
                }
            };
            drop(listener);

            let (reader, writer) = TcpTransport::from_connected_stream(stream);
            {
                let mut links = server.inner.links.lock().await;
                if server.inner.cancel.is_cancelled() {
                    return;
                }
                links.sub = Some(Box::new(writer));
            }
            log::info!("Sub link connected from {}", peer);
            server.inner.sub_connected.store(true, Ordering::SeqCst);
            server.spawn_receiver(Link::Sub, reader, tx);
            server.progress();
        });
    }

    fn spawn_receiver(&self, link: Link, reader: TcpReader, tx: mpsc::Sender<Inbound>) {
        let name = match link {
            Link::Main => "main-link receive",
            Link::Sub => "sub-link receive",
        };
        let server = self.clone();
        spawn_supervised(name, async move {
            server.receive_loop(link, reader, tx).await;
        });
    }

    async fn receive_loop(&self, link: Link, reader: TcpReader, tx: mpsc::Sender<Inbound>) {
        let cancel = self.inner.cancel.clone();
        let mut reader = PacketReader::new(reader);

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                r = reader.read_packet() => r,
            };
            let discarded = reader.discarded();
            self.update_stats(link, |s| s.bytes_discarded = discarded);

            match result {
                Ok(packet) => {
                    self.update_stats(link, |s| s.increment_frames_received());
                    log::debug!("Received on {} link: {}", link, packet);
                    let inbound = Inbound { link, packet };
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        r = tx.send(inbound) => {
                            if r.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) if e.is_recoverable() => {
                    self.update_stats(link, |s| s.record_error(&e));
                    log::warn!("Dropped frame on {} link: {}", link, e);
                }
                Err(e) => {
                    self.update_stats(link, |s| s.record_error(&e));
                    if !cancel.is_cancelled() {
                        if e.is_eof() {
                            log::info!("{} link closed by peer", link);
                        } else {
                            log::error!("{} link receive error: {}", link, e);
                        }
                    }
                    break;
                }
            }
        }

        if !cancel.is_cancelled() {
            self.shutdown().await;
        }
    }

    fn spawn_dispatcher(&self, mut rx: mpsc::Receiver<Inbound>) {
        let server = self.clone();
        spawn_supervised("dispatcher", async move {
            loop {
                let inbound = tokio::select! {
                    _ = server.inner.cancel.cancelled() => break,
                    m = rx.recv() => match m {
                        Some(inbound) => inbound,
                        None => break,
                    },
                };
                let handler = server.clone();
                spawn_supervised("packet handler", async move {
                    let description = inbound.packet.description();
                    if let Err(e) = handler.handle_packet(inbound).await {
                        log::error!("Handling {} failed: {}", description, e);
                    }
                });
            }
        });
    }

    async fn handle_packet(&self, inbound: Inbound) -> Jt809Result<()> {
        let Inbound { link, packet } = inbound;
        match packet.body {
            PacketBody::UpConnectRsp(rsp) => self.on_login_response(rsp).await,
            PacketBody::DownConnectReq(req) => {
                log::info!(
                    "Sub-link connect request on {} link, verify code {}",
                    link,
                    req.verify_code
                );
                self.send(Packet::new(PacketBody::DownConnectRsp(ResultCode::new(0))))
                    .await
            }
            PacketBody::DownLinkTestReq => {
                self.send(Packet::new(PacketBody::DownLinkTestRsp)).await
            }
            PacketBody::DownDisconnectReq(req) => {
                log::info!("Sub-link disconnect request, verify code {}", req.verify_code);
                self.send(Packet::new(PacketBody::DownDisconnectRsp)).await
            }
            PacketBody::DownDisconnectInform(code) => {
                log::warn!(
                    "Superior platform reports the main link broken, error code {}",
                    code.code
                );
                Ok(())
            }
            PacketBody::DownCloseLinkInform(code) => {
                log::warn!(
                    "Superior platform is closing the links, reason code {}",
                    code.code
                );
                Ok(())
            }
            PacketBody::DownTotalRecvBackMsg(msg) => {
                log::info!(
                    "Superior platform received {} dynamic packets between {} and {}",
                    msg.dynamic_info_total,
                    msg.start_time,
                    msg.end_time
                );
                Ok(())
            }
            PacketBody::UpLinkTestRsp | PacketBody::UpDisconnectRsp => {
                log::debug!("{} on {} link", packet.header, link);
                Ok(())
            }
            other => {
                log::info!("Unhandled {} on {} link, dropped", other.description(), link);
                Ok(())
            }
        }
    }

    async fn on_login_response(&self, rsp: UpConnectRsp) -> Jt809Result<()> {
        if rsp.is_success() {
            log::info!("Login accepted, verify code {}", rsp.verify_code);
            self.inner.login_acked.store(true, Ordering::SeqCst);
            self.start_keepalive();
            self.progress();
        } else {
            let reason = format!(
                "login rejected with result {} ({})",
                rsp.result,
                login_result::describe(rsp.result)
            );
            log::error!("{}", reason);
            self.fail(Jt809Error::Protocol(reason)).await;
        }
        Ok(())
    }

    fn start_keepalive(&self) {
        if self.inner.keepalive_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let server = self.clone();
        let period = self.inner.config.keepalive_interval();
        spawn_supervised("keepalive", async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                tokio::select! {
                    _ = server.inner.cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if let Err(e) = server.send(Packet::new(PacketBody::UpLinkTestReq)).await {
                    log::error!("Keepalive not sent: {}", e);
                }
            }
        });
    }
}

impl fmt::Debug for Jt809Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jt809Server")
            .field("main_link_address", &self.inner.config.main_link_address)
            .field("state", &self.state())
            .finish()
    }
}
