/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};

use ftp_session::{
    FtpDataChannelMode, FtpError, FtpServerAddr, FtpSession, FtpSessionConfig, FtpTlsConfig,
    FtpTransportProvider,
};

#[derive(Default)]
struct MockTransport {
    control: Option<DuplexStream>,
    data: Vec<DuplexStream>,
    listeners: Vec<DuplexStream>,
    data_addrs: Arc<Mutex<Vec<String>>>,
    tls_upgrades: Arc<AtomicUsize>,
}

#[async_trait]
impl FtpTransportProvider<DuplexStream, io::Error> for MockTransport {
    type Listener = DuplexStream;

    async fn new_control_connection(
        &mut self,
        _server: &FtpServerAddr,
    ) -> io::Result<DuplexStream> {
        self.control
            .take()
            .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))
    }

    async fn new_data_connection(&mut self, server: &FtpServerAddr) -> io::Result<DuplexStream> {
        self.data_addrs.lock().unwrap().push(server.to_string());
        if self.data.is_empty() {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        Ok(self.data.remove(0))
    }

    async fn bind_data_listener(&mut self, _local: SocketAddr) -> io::Result<DuplexStream> {
        if self.listeners.is_empty() {
            return Err(io::Error::from(io::ErrorKind::AddrInUse));
        }
        Ok(self.listeners.remove(0))
    }

    async fn accept_data_connection(
        &mut self,
        listener: DuplexStream,
    ) -> io::Result<DuplexStream> {
        Ok(listener)
    }

    async fn start_tls(
        &mut self,
        stream: DuplexStream,
        _tls: &FtpTlsConfig,
    ) -> io::Result<DuplexStream> {
        self.tls_upgrades.fetch_add(1, Ordering::SeqCst);
        Ok(stream)
    }
}

type MockSession = FtpSession<MockTransport, DuplexStream, io::Error>;

fn new_session(config: FtpSessionConfig, provider: MockTransport) -> MockSession {
    let server = FtpServerAddr::from_str("ftp.example.net").unwrap();
    FtpSession::new(server, provider, config)
}

type ServerEnd = BufReader<DuplexStream>;

async fn expect_cmd(server: &mut ServerEnd, want: &str) {
    let mut line = String::new();
    server.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), want);
}

async fn send(server: &mut ServerEnd, reply: &str) {
    server.write_all(reply.as_bytes()).await.unwrap();
}

/// Greeting, FEAT, anonymous login, TYPE I.
async fn serve_connect(server: &mut ServerEnd, feat: &str, utf8: bool) {
    send(server, "220 Welcome\r\n").await;
    expect_cmd(server, "FEAT").await;
    send(server, feat).await;
    expect_cmd(server, "USER anonymous").await;
    send(server, "331 Need password\r\n").await;
    expect_cmd(server, "PASS anonymous").await;
    send(server, "230 Logged in\r\n").await;
    if utf8 {
        expect_cmd(server, "OPTS UTF8 ON").await;
        send(server, "200 Always in UTF8 mode\r\n").await;
    }
    expect_cmd(server, "TYPE I").await;
    send(server, "200 Switching to Binary mode\r\n").await;
}

const FEAT_BASIC: &str = "211-Features:\r\n SIZE\r\n211 End\r\n";
const FEAT_EPSV: &str = "211-Features:\r\n EPSV\r\n SIZE\r\n211 End\r\n";

#[tokio::test]
async fn connect_builds_feature_matrix() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(
            &mut s,
            "211-Features:\r\n MLST type*;size*;modify*;\r\n EPSV\r\n UTF8\r\n211 End\r\n",
            true,
        )
        .await;
    });

    session.connect().await.unwrap();
    server.await.unwrap();

    let feat = session.server_feature().await;
    assert_eq!(
        feat.mlst_facts(),
        Some(&["type".to_string(), "size".to_string(), "modify".to_string()][..])
    );
    assert!(feat.support_machine_list());
    assert!(feat.support_extended_passive());
    assert!(feat.support_utf8_path());
    assert!(!feat.support_file_mtime());
    assert!(!feat.support_file_size());

    // a second connect on an established session is refused
    assert!(matches!(
        session.connect().await,
        Err(FtpError::SessionNotReady)
    ));
}

#[tokio::test]
async fn operations_before_connect_are_refused() {
    let session = new_session(FtpSessionConfig::default(), MockTransport::default());
    assert!(matches!(
        session.current_dir().await,
        Err(FtpError::SessionNotReady)
    ));
    assert!(matches!(
        session.retrieve_file("a").await,
        Err(FtpError::SessionNotReady)
    ));
}

#[tokio::test]
async fn passive_download_over_epsv() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let data_addrs = Arc::new(Mutex::new(Vec::new()));
    let provider = MockTransport {
        control: Some(ctrl),
        data: vec![data],
        data_addrs: data_addrs.clone(),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_EPSV, false).await;

        expect_cmd(&mut s, "EPSV").await;
        send(&mut s, "229 Entering Extended Passive Mode (|||51234|)\r\n").await;
        expect_cmd(&mut s, "RETR a.bin").await;
        send(&mut s, "150 Opening BINARY mode data connection\r\n").await;

        let mut d = server_data;
        d.write_all(b"hello world").await.unwrap();
        d.shutdown().await.unwrap();
        drop(d);

        send(&mut s, "226 Transfer complete\r\n").await;

        // the lock is free again for the next operation
        expect_cmd(&mut s, "PWD").await;
        send(&mut s, "257 \"/\" is the current directory\r\n").await;
    });

    session.connect().await.unwrap();
    let content = session.retrieve_file("a.bin").await.unwrap();
    assert_eq!(content, b"hello world");
    assert_eq!(
        data_addrs.lock().unwrap().as_slice(),
        &["ftp.example.net:51234".to_string()]
    );

    assert_eq!(session.current_dir().await.unwrap(), "/");
    server.await.unwrap();
}

#[tokio::test]
async fn passive_list_over_pasv() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let data_addrs = Arc::new(Mutex::new(Vec::new()));
    let provider = MockTransport {
        control: Some(ctrl),
        data: vec![data],
        data_addrs: data_addrs.clone(),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        // no EPSV advertised, the client must fall back to PASV
        serve_connect(&mut s, FEAT_BASIC, false).await;

        expect_cmd(&mut s, "PASV").await;
        send(&mut s, "227 Entering Passive Mode (192,168,1,9,200,10)\r\n").await;
        expect_cmd(&mut s, "LIST").await;
        send(&mut s, "150 Here comes the directory listing\r\n").await;

        let mut d = server_data;
        d.write_all(b"drwxr-xr-x 2 ftp ftp 4096 May 15 12:13 pub\r\n-rw-r--r-- 1 ftp ftp 42 May 15 12:13 report.txt\r\n")
            .await
            .unwrap();
        d.shutdown().await.unwrap();
        drop(d);

        send(&mut s, "226 Directory send OK\r\n").await;
    });

    session.connect().await.unwrap();
    let lines = session.list_directory(None).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("pub"));
    assert!(lines[1].ends_with("report.txt"));
    assert_eq!(
        data_addrs.lock().unwrap().as_slice(),
        &["192.168.1.9:51210".to_string()]
    );
    server.await.unwrap();
}

#[tokio::test]
async fn active_upload_over_port() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        listeners: vec![data],
        ..Default::default()
    };
    let mut config = FtpSessionConfig::default();
    config.data_channel = FtpDataChannelMode::Active;
    config.active.ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5));
    config.active.port = 2020;
    let session = new_session(config, provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_BASIC, false).await;

        expect_cmd(&mut s, "PORT 192,168,1,5,7,228").await;
        send(&mut s, "200 PORT command successful\r\n").await;
        expect_cmd(&mut s, "STOR x").await;
        send(&mut s, "150 Ok to send data\r\n").await;

        let mut received = Vec::new();
        let mut d = server_data;
        d.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello");

        send(&mut s, "226 Transfer complete\r\n").await;
    });

    session.connect().await.unwrap();
    session.store_file("x", b"hello").await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn active_upload_over_eprt() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        listeners: vec![data],
        ..Default::default()
    };
    let mut config = FtpSessionConfig::default();
    config.data_channel = FtpDataChannelMode::Active;
    config.active.ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5));
    config.active.port = 2020;
    let session = new_session(config, provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, "211-Features:\r\n EPRT\r\n211 End\r\n", false).await;

        expect_cmd(&mut s, "EPRT |1|192.168.1.5|2020|").await;
        send(&mut s, "200 EPRT command successful\r\n").await;
        expect_cmd(&mut s, "STOR x").await;
        send(&mut s, "150 Ok to send data\r\n").await;

        let mut received = Vec::new();
        let mut d = server_data;
        d.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello");

        send(&mut s, "226 Transfer complete\r\n").await;
    });

    session.connect().await.unwrap();
    session.store_file("x", b"hello").await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn rename_failure_releases_lock_without_rnto() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_BASIC, false).await;

        expect_cmd(&mut s, "RNFR a").await;
        send(&mut s, "550 No such file or directory\r\n").await;

        // next command must be PWD, not RNTO
        expect_cmd(&mut s, "PWD").await;
        send(&mut s, "257 \"/\" is the current directory\r\n").await;
    });

    session.connect().await.unwrap();
    match session.rename_file("a", "b").await {
        Err(FtpError::UnexpectedStatus { expected, got, .. }) => {
            assert_eq!(expected, 350);
            assert_eq!(got, 550);
        }
        r => panic!("unexpected result {r:?}"),
    }
    assert_eq!(session.current_dir().await.unwrap(), "/");
    server.await.unwrap();
}

#[tokio::test]
async fn rename_success() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_BASIC, false).await;

        expect_cmd(&mut s, "RNFR a").await;
        send(&mut s, "350 Ready for RNTO\r\n").await;
        expect_cmd(&mut s, "RNTO b").await;
        send(&mut s, "250 Rename successful\r\n").await;
    });

    session.connect().await.unwrap();
    session.rename_file("a", "b").await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn stat_with_mlst() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(
            &mut s,
            "211-Features:\r\n MLST type*;size*;modify*;\r\n211 End\r\n",
            false,
        )
        .await;

        expect_cmd(&mut s, "MLST report.txt").await;
        send(
            &mut s,
            "250-Listing report.txt\r\n type=file;size=42;modify=20230515T121314.500; report.txt\r\n250 End\r\n",
        )
        .await;
    });

    session.connect().await.unwrap();
    let info = session.fetch_file_facts("report.txt").await.unwrap();
    assert_eq!(info.path(), "report.txt");
    assert!(info.is_file());
    assert_eq!(info.size(), 42);
    let expected = chrono::Utc.with_ymd_and_hms(2023, 5, 15, 12, 13, 14).unwrap()
        + chrono::Duration::milliseconds(500);
    assert_eq!(info.mtime(), Some(&expected));
    server.await.unwrap();
}

#[tokio::test]
async fn stat_fallback_on_file() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, "211-Features:\r\n SIZE\r\n MDTM\r\n211 End\r\n", false).await;

        expect_cmd(&mut s, "SIZE notes.txt").await;
        send(&mut s, "213 42\r\n").await;
        expect_cmd(&mut s, "MDTM notes.txt").await;
        send(&mut s, "213 20230515121314\r\n").await;
    });

    session.connect().await.unwrap();
    let info = session.fetch_file_facts("notes.txt").await.unwrap();
    assert!(info.is_file());
    assert_eq!(info.size(), 42);
    let expected = chrono::Utc.with_ymd_and_hms(2023, 5, 15, 12, 13, 14).unwrap();
    assert_eq!(info.mtime(), Some(&expected));
    server.await.unwrap();
}

#[tokio::test]
async fn stat_fallback_on_directory() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, "211-Features:\r\n SIZE\r\n MDTM\r\n211 End\r\n", false).await;

        expect_cmd(&mut s, "SIZE logs").await;
        send(&mut s, "550 Could not get file size.\r\n").await;

        // no MDTM may follow for a directory
        expect_cmd(&mut s, "PWD").await;
        send(&mut s, "257 \"/\" is the current directory\r\n").await;
    });

    session.connect().await.unwrap();
    let info = session.fetch_file_facts("logs").await.unwrap();
    assert!(info.is_dir());
    assert!(!info.is_file());
    assert_eq!(session.current_dir().await.unwrap(), "/");
    server.await.unwrap();
}

#[tokio::test]
async fn mtime_without_mdtm_is_refused_locally() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_BASIC, false).await;

        // nothing hits the wire for the refused MDTM
        expect_cmd(&mut s, "PWD").await;
        send(&mut s, "257 \"/\" is the current directory\r\n").await;
    });

    session.connect().await.unwrap();
    assert!(matches!(
        session.file_mtime("a").await,
        Err(FtpError::FeatureUnsupported("MDTM"))
    ));
    assert_eq!(session.current_dir().await.unwrap(), "/");
    server.await.unwrap();
}

#[tokio::test]
async fn machine_listing_parses_entries() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        data: vec![data],
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(
            &mut s,
            "211-Features:\r\n MLST type*;size*;modify*;\r\n EPSV\r\n211 End\r\n",
            false,
        )
        .await;

        expect_cmd(&mut s, "EPSV").await;
        send(&mut s, "229 Entering Extended Passive Mode (|||40001|)\r\n").await;
        expect_cmd(&mut s, "MLSD pub").await;
        send(&mut s, "150 Here comes the directory listing\r\n").await;

        let mut d = server_data;
        d.write_all(
            b"type=dir;modify=20210525083610; sub\r\ntype=file;size=42;modify=20230515121314; report.txt\r\n",
        )
        .await
        .unwrap();
        d.shutdown().await.unwrap();
        drop(d);

        send(&mut s, "226 Directory send OK\r\n").await;
    });

    session.connect().await.unwrap();
    let entries = session.list_directory_machine(Some("pub")).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path(), "sub");
    assert!(entries[0].is_dir());
    assert_eq!(entries[1].path(), "report.txt");
    assert!(entries[1].is_file());
    assert_eq!(entries[1].size(), 42);
    server.await.unwrap();
}

#[tokio::test]
async fn streaming_download_and_finalize() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        data: vec![data],
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_EPSV, false).await;

        expect_cmd(&mut s, "EPSV").await;
        send(&mut s, "229 Entering Extended Passive Mode (|||51234|)\r\n").await;
        expect_cmd(&mut s, "RETR a.bin").await;
        send(&mut s, "150 Opening BINARY mode data connection\r\n").await;

        let mut d = server_data;
        d.write_all(b"streamed").await.unwrap();
        d.shutdown().await.unwrap();
        drop(d);

        send(&mut s, "226 Transfer complete\r\n").await;

        expect_cmd(&mut s, "PWD").await;
        send(&mut s, "257 \"/\" is the current directory\r\n").await;
    });

    session.connect().await.unwrap();
    let mut stream = session.retrieve_file_stream("a.bin").await.unwrap();
    let mut content = Vec::new();
    stream.read_to_end(&mut content).await.unwrap();
    assert_eq!(content, b"streamed");
    stream.finalize().await.unwrap();

    assert_eq!(session.current_dir().await.unwrap(), "/");
    server.await.unwrap();
}

#[tokio::test]
async fn streaming_upload_with_allocate() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        data: vec![data],
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_EPSV, false).await;

        expect_cmd(&mut s, "ALLO 5").await;
        send(&mut s, "202 No storage allocation necessary\r\n").await;
        expect_cmd(&mut s, "EPSV").await;
        send(&mut s, "229 Entering Extended Passive Mode (|||51234|)\r\n").await;
        expect_cmd(&mut s, "STOR x").await;
        send(&mut s, "150 Ok to send data\r\n").await;

        let mut received = Vec::new();
        let mut d = server_data;
        d.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"hello");

        send(&mut s, "226 Transfer complete\r\n").await;
    });

    session.connect().await.unwrap();
    let mut stream = session.store_file_stream("x", Some(5)).await.unwrap();
    stream.write_all(b"hello").await.unwrap();
    stream.finalize().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn dropped_stream_closes_the_session() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, _server_data) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        data: vec![data],
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_EPSV, false).await;

        expect_cmd(&mut s, "EPSV").await;
        send(&mut s, "229 Entering Extended Passive Mode (|||51234|)\r\n").await;
        expect_cmd(&mut s, "RETR a.bin").await;
        send(&mut s, "150 Opening BINARY mode data connection\r\n").await;
    });

    session.connect().await.unwrap();
    let stream = session.retrieve_file_stream("a.bin").await.unwrap();
    drop(stream);

    assert!(matches!(
        session.current_dir().await,
        Err(FtpError::SessionNotReady)
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn cancelled_operation_fails_the_session() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_BASIC, false).await;

        // the command arrives but is never answered
        expect_cmd(&mut s, "PWD").await;
    });

    session.connect().await.unwrap();
    // cancel the operation between its request and the reply
    let r = tokio::time::timeout(Duration::ZERO, session.current_dir()).await;
    assert!(r.is_err());

    assert!(matches!(
        session.current_dir().await,
        Err(FtpError::SessionNotReady)
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn concurrent_operations_are_serialized() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_BASIC, false).await;

        for _ in 0..2 {
            expect_cmd(&mut s, "PWD").await;
            send(&mut s, "257 \"/\" is the current directory\r\n").await;
        }
    });

    session.connect().await.unwrap();
    let a = {
        let session = session.clone();
        tokio::spawn(async move { session.current_dir().await })
    };
    let b = {
        let session = session.clone();
        tokio::spawn(async move { session.current_dir().await })
    };
    assert_eq!(a.await.unwrap().unwrap(), "/");
    assert_eq!(b.await.unwrap().unwrap(), "/");
    server.await.unwrap();
}

#[tokio::test]
async fn explicit_tls_upgrade() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let (data, server_data) = tokio::io::duplex(16384);
    let tls_upgrades = Arc::new(AtomicUsize::new(0));
    let provider = MockTransport {
        control: Some(ctrl),
        data: vec![data],
        tls_upgrades: tls_upgrades.clone(),
        ..Default::default()
    };
    let mut config = FtpSessionConfig::default();
    config.tls = Some(FtpTlsConfig::default());
    let session = new_session(config, provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        send(&mut s, "220 Welcome\r\n").await;
        expect_cmd(&mut s, "FEAT").await;
        send(
            &mut s,
            "211-Features:\r\n AUTH TLS\r\n PBSZ\r\n PROT\r\n EPSV\r\n211 End\r\n",
        )
        .await;
        expect_cmd(&mut s, "AUTH TLS").await;
        send(&mut s, "234 Proceed with negotiation\r\n").await;
        expect_cmd(&mut s, "PBSZ 0").await;
        send(&mut s, "200 PBSZ=0\r\n").await;
        expect_cmd(&mut s, "PROT P").await;
        send(&mut s, "200 Protection set to Private\r\n").await;
        expect_cmd(&mut s, "USER anonymous").await;
        send(&mut s, "331 Need password\r\n").await;
        expect_cmd(&mut s, "PASS anonymous").await;
        send(&mut s, "230 Logged in\r\n").await;
        expect_cmd(&mut s, "TYPE I").await;
        send(&mut s, "200 Switching to Binary mode\r\n").await;

        expect_cmd(&mut s, "EPSV").await;
        send(&mut s, "229 Entering Extended Passive Mode (|||51234|)\r\n").await;
        expect_cmd(&mut s, "RETR a.bin").await;
        send(&mut s, "150 Opening BINARY mode data connection\r\n").await;

        let mut d = server_data;
        d.write_all(b"secret").await.unwrap();
        d.shutdown().await.unwrap();
        drop(d);

        send(&mut s, "226 Transfer complete\r\n").await;
    });

    session.connect().await.unwrap();
    // control channel upgraded once
    assert_eq!(tls_upgrades.load(Ordering::SeqCst), 1);

    let content = session.retrieve_file("a.bin").await.unwrap();
    assert_eq!(content, b"secret");
    // and the data channel once more
    assert_eq!(tls_upgrades.load(Ordering::SeqCst), 2);
    server.await.unwrap();
}

#[tokio::test]
async fn quit_closes_the_session() {
    let (ctrl, server_ctrl) = tokio::io::duplex(16384);
    let provider = MockTransport {
        control: Some(ctrl),
        ..Default::default()
    };
    let session = new_session(FtpSessionConfig::default(), provider);

    let server = tokio::spawn(async move {
        let mut s = BufReader::new(server_ctrl);
        serve_connect(&mut s, FEAT_BASIC, false).await;

        expect_cmd(&mut s, "QUIT").await;
        send(&mut s, "221 Goodbye\r\n").await;
    });

    session.connect().await.unwrap();
    session.quit_and_close().await;
    server.await.unwrap();

    assert!(matches!(
        session.current_dir().await,
        Err(FtpError::SessionNotReady)
    ));
    // idempotent
    session.quit_and_close().await;
}
