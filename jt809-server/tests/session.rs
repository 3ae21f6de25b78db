//! Session tests against a scripted superior platform on loopback

use chrono::NaiveDate;
use jt809_application::message_type::{UP_EXG_MSG, UP_LINKTEST_REQ};
use jt809_application::{
    encode_packet, Header, Packet, PacketBody, PacketReader, RealLocation, ResultCode,
    SubPacket, UpConnectReq, UpConnectRsp, VerifyCode, HEADER_LENGTH,
};
use jt809_core::datatypes::PlateColor;
use jt809_core::Jt809Error;
use jt809_session::{framed_length, seal_frame, SessionState};
use jt809_server::{Jt809Server, ServerConfig};
use jt809_transport::{StreamWriter, TcpReader, TcpTransport, TcpWriter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// One link as seen from the superior platform
struct Peer {
    reader: PacketReader<TcpReader>,
    writer: TcpWriter,
}

impl Peer {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = TcpTransport::from_connected_stream(stream);
        Self {
            reader: PacketReader::new(reader),
            writer,
        }
    }

    async fn send(&mut self, body: PacketBody) {
        let frame = encode_packet(&mut Packet::new(body)).unwrap();
        self.send_raw(&frame).await;
    }

    async fn send_raw(&mut self, frame: &[u8]) {
        self.writer.write_all(frame).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> Packet {
        timeout(WAIT, self.reader.read_packet())
            .await
            .expect("timed out waiting for a packet")
            .unwrap()
    }

    /// Next packet of `msg_type`, skipping keepalives and the like
    async fn recv_type(&mut self, msg_type: u16) -> Packet {
        loop {
            let packet = self.recv().await;
            if packet.msg_type() == msg_type {
                return packet;
            }
        }
    }
}

struct Platform {
    listener: TcpListener,
}

impl Platform {
    async fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    fn config(&self) -> ServerConfig {
        ServerConfig::new()
            .with_user(20180920, "20180920")
            .with_gnss_center_id(20180920)
            .with_main_link_address(self.listener.local_addr().unwrap().to_string())
            .with_down_link("127.0.0.1", 0)
            .with_listen_ip("127.0.0.1")
            .with_keepalive_interval_secs(1)
            .with_connect_timeout_secs(2)
    }

    /// Accept the main link and read the login request
    async fn accept_login(&self) -> (Peer, Packet) {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("main link never dialed")
            .unwrap();
        let mut main = Peer::new(stream);
        let login = main.recv().await;
        (main, login)
    }
}

fn start(server: &Jt809Server) -> JoinHandle<Result<(), Jt809Error>> {
    let server = server.clone();
    tokio::spawn(async move { server.run().await })
}

fn login_request(packet: &Packet) -> &UpConnectReq {
    match &packet.body {
        PacketBody::UpConnectReq(req) => req,
        other => panic!("expected login request, got {}", other),
    }
}

async fn dial_sub_link(login: &Packet) -> Peer {
    let port = login_request(login).down_link_port;
    Peer::new(TcpStream::connect(("127.0.0.1", port)).await.unwrap())
}

fn unknown_type_frame() -> Vec<u8> {
    let mut header = Header::new(0x1300);
    header.length = framed_length(HEADER_LENGTH) as u32;
    let mut content = Vec::new();
    header.encode(&mut content);
    seal_frame(&content)
}

#[tokio::test]
async fn test_full_session() {
    let platform = Platform::bind().await;
    let server = Jt809Server::new(platform.config());

    let connects = Arc::new(AtomicUsize::new(0));
    let (connected_tx, connected_rx) = tokio::sync::oneshot::channel();
    let counter = Arc::clone(&connects);
    server.on_connect(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = connected_tx.send(());
    });
    let run = start(&server);

    let (mut main, login) = platform.accept_login().await;
    let req = login_request(&login);
    assert_eq!(req.user_id, 20180920);
    assert_eq!(req.password, "20180920");
    assert_eq!(req.down_link_ip, "127.0.0.1");
    assert_ne!(req.down_link_port, 0);
    assert_eq!(login.header.gnss_center_id, 20180920);
    assert!(!login.header.is_encrypted());

    let mut sub = dial_sub_link(&login).await;
    sub.send(PacketBody::DownConnectReq(VerifyCode { verify_code: 7 }))
        .await;
    let rsp = sub.recv().await;
    assert_eq!(rsp.body, PacketBody::DownConnectRsp(ResultCode::new(0)));

    sub.send_raw(&unknown_type_frame()).await;
    sub.send(PacketBody::DownLinkTestReq).await;
    assert_eq!(sub.recv().await.body, PacketBody::DownLinkTestRsp);

    main.send(PacketBody::UpConnectRsp(UpConnectRsp {
        result: 0,
        verify_code: 7,
    }))
    .await;
    timeout(WAIT, connected_rx)
        .await
        .expect("on_connect never fired")
        .unwrap();
    assert_eq!(server.state(), SessionState::Established);

    let keepalive = main.recv_type(UP_LINKTEST_REQ).await;
    assert_eq!(keepalive.body, PacketBody::UpLinkTestReq);

    let at = NaiveDate::from_ymd_opt(2018, 9, 20)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let mut location = RealLocation::at(&at);
    location.lon = 116_397_128;
    location.lat = 39_916_527;
    server
        .send_real_location("TEST123", PlateColor::Yellow, location.clone())
        .await
        .unwrap();
    let report = main.recv_type(UP_EXG_MSG).await;
    match report.body {
        PacketBody::UpExgMsg(msg) => {
            assert_eq!(msg.plate().unwrap(), "TEST123");
            assert_eq!(msg.vehicle_color, PlateColor::Yellow);
            assert_eq!(msg.sub_packet, SubPacket::RealLocation(location));
        }
        other => panic!("expected location report, got {}", other),
    }

    drop(main);
    let result = timeout(WAIT, run).await.expect("run did not return").unwrap();
    assert!(result.is_ok());
    assert_eq!(server.state(), SessionState::Closed);
    assert_eq!(connects.load(Ordering::SeqCst), 1);

    let stats = server.statistics();
    assert_eq!(stats.sub.unsupported_packets, 1);
    assert!(stats.sub.frames_received >= 2);
    assert!(stats.sub.frames_sent >= 2);
    assert!(stats.main.frames_sent >= 3);

    assert!(matches!(
        server.send_real_location("TEST123", PlateColor::Yellow, RealLocation::at(&at)).await,
        Err(Jt809Error::LinkUnavailable(_))
    ));
}

#[tokio::test]
async fn test_encrypted_login() {
    let platform = Platform::bind().await;
    let server = Jt809Server::new(platform.config().with_login_encrypt_key(Some(256178)));
    let run = start(&server);

    let (_main, login) = platform.accept_login().await;
    assert!(login.header.is_encrypted());
    assert_eq!(login.header.encrypt_key, 256178);
    assert_eq!(login_request(&login).user_id, 20180920);

    server.shutdown().await;
    assert!(timeout(WAIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn test_login_rejected() {
    let platform = Platform::bind().await;
    let server = Jt809Server::new(platform.config());
    let run = start(&server);

    let (mut main, _login) = platform.accept_login().await;
    main.send(PacketBody::UpConnectRsp(UpConnectRsp {
        result: 4,
        verify_code: 0,
    }))
    .await;

    let result = timeout(WAIT, run).await.unwrap().unwrap();
    match result {
        Err(Jt809Error::Protocol(msg)) => assert!(msg.contains("rejected")),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(server.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_dial_refused() {
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let config = ServerConfig::new()
        .with_user(1, "pw")
        .with_main_link_address(address)
        .with_listen_ip("127.0.0.1")
        .with_connect_timeout_secs(2);
    let server = Jt809Server::new(config);

    let result = timeout(WAIT, server.run()).await.unwrap();
    assert!(result.is_err());
    assert_eq!(server.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_concurrent_shutdown() {
    let platform = Platform::bind().await;
    let server = Jt809Server::new(platform.config());
    let run = start(&server);
    let (_main, login) = platform.accept_login().await;
    let _sub = dial_sub_link(&login).await;

    let (a, b) = (server.clone(), server.clone());
    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.shutdown().await }),
        tokio::spawn(async move { b.shutdown().await }),
    );
    first.unwrap();
    second.unwrap();
    server.shutdown().await;

    assert!(timeout(WAIT, run).await.unwrap().unwrap().is_ok());
    assert_eq!(server.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_sub_link_disconnect_request() {
    let platform = Platform::bind().await;
    let server = Jt809Server::new(platform.config());
    let run = start(&server);
    let (_main, login) = platform.accept_login().await;
    let mut sub = dial_sub_link(&login).await;

    sub.send(PacketBody::DownDisconnectReq(VerifyCode { verify_code: 7 }))
        .await;
    assert_eq!(sub.recv().await.body, PacketBody::DownDisconnectRsp);

    server.shutdown().await;
    assert!(timeout(WAIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn test_concurrent_sends_keep_frames_whole() {
    const SENDERS: usize = 16;
    const PER_SENDER: usize = 8;

    let platform = Platform::bind().await;
    let server = Jt809Server::new(platform.config());
    let run = start(&server);
    let (mut main, _login) = platform.accept_login().await;

    let senders: Vec<_> = (0..SENDERS)
        .map(|i| {
            let server = server.clone();
            tokio::spawn(async move {
                for _ in 0..PER_SENDER {
                    server
                        .send_real_location(&format!("CAR{}", i), PlateColor::Blue, RealLocation::now())
                        .await
                        .unwrap();
                }
            })
        })
        .collect();

    let mut serials = Vec::new();
    for _ in 0..SENDERS * PER_SENDER {
        let packet = main.recv_type(UP_EXG_MSG).await;
        serials.push(packet.header.serial_no);
    }
    for sender in senders {
        sender.await.unwrap();
    }
    assert_eq!(main.reader.discarded(), 0);
    serials.sort_unstable();
    let expected: Vec<u32> = (0..(SENDERS * PER_SENDER) as u32).collect();
    assert_eq!(serials, expected);

    server.shutdown().await;
    assert!(timeout(WAIT, run).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn test_shutdown_with_stalled_peer() {
    let platform = Platform::bind().await;
    let server = Jt809Server::new(platform.config());
    let run = start(&server);
    // Kept open but never read again
    let (_main, _login) = platform.accept_login().await;

    let sent = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&sent);
    let flooder = server.clone();
    let flood = tokio::spawn(async move {
        loop {
            let result = flooder
                .send_real_location("TEST123", PlateColor::Yellow, RealLocation::now())
                .await;
            if result.is_err() {
                return result;
            }
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Wait for the socket buffers to fill and the sender to block
    let mut last = usize::MAX;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let now = sent.load(Ordering::SeqCst);
        if now == last {
            break;
        }
        last = now;
    }
    assert!(!flood.is_finished());

    timeout(Duration::from_secs(3), server.shutdown())
        .await
        .expect("shutdown waited behind a blocked send");
    let flooded = timeout(WAIT, flood).await.unwrap().unwrap();
    assert!(matches!(flooded, Err(Jt809Error::LinkUnavailable(_))));
    assert!(timeout(WAIT, run).await.unwrap().unwrap().is_ok());
    assert_eq!(server.state(), SessionState::Closed);
}
