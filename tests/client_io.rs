//! The tokio driver against a scripted transport.

#![cfg(feature = "tokio")]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio::time::timeout;

use slirc_session::config::TlsOptions;
use slirc_session::error::TransportError;
use slirc_session::{Actor, Client, ClientHandle, EventContext, EventHandler, Session, SessionConfig, Transport};

/// Server side of a [`Scripted`] transport.
struct Script {
    incoming: mpsc::UnboundedSender<Vec<u8>>,
    written: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
}

impl Script {
    fn send(&self, data: &str) {
        self.incoming.send(data.as_bytes().to_vec()).unwrap();
    }

    /// An empty chunk reads as end of stream.
    fn hang_up(&self) {
        self.incoming.send(Vec::new()).unwrap();
    }

    fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }
}

struct Scripted {
    incoming: mpsc::UnboundedReceiver<Vec<u8>>,
    written: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    failures: usize,
    hang_on_connect: bool,
}

fn scripted(failures: usize) -> (Scripted, Script) {
    let (tx, rx) = mpsc::unbounded_channel();
    let written = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(AtomicUsize::new(0));
    let transport = Scripted {
        incoming: rx,
        written: Arc::clone(&written),
        attempts: Arc::clone(&attempts),
        failures,
        hang_on_connect: false,
    };
    let script = Script {
        incoming: tx,
        written,
        attempts,
    };
    (transport, script)
}

#[async_trait]
impl Transport for Scripted {
    async fn connect(&mut self, _host: &str, _port: u16, _tls: &TlsOptions) -> Result<(), TransportError> {
        if self.hang_on_connect {
            std::future::pending::<()>().await;
        }
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(TransportError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")));
        }
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.written
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    async fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<usize, TransportError> {
        match self.incoming.recv().await {
            Some(chunk) => {
                buf.extend_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Forwards events to the test body.
struct Forward(mpsc::UnboundedSender<String>);

impl Forward {
    fn push(&self, event: String) {
        let _ = self.0.send(event);
    }
}

impl EventHandler for Forward {
    fn on_connect(&mut self, _: &mut EventContext<'_>) {
        self.push("connect".into());
    }

    fn on_connect_failed(&mut self, _: &mut EventContext<'_>, reason: &str, retry_in: Option<Duration>) {
        self.push(format!("connect_failed {} {:?}", reason, retry_in));
    }

    fn on_disconnect(&mut self, _: &mut EventContext<'_>, reason: &str, retry_in: Option<Duration>) {
        self.push(format!("disconnect {} {:?}", reason, retry_in));
    }

    fn on_welcome(&mut self, _: &mut EventContext<'_>, _: &Actor<'_>, nick: &str, _: Option<&str>) {
        self.push(format!("welcome {}", nick));
    }

    fn on_channel_message(&mut self, _: &mut EventContext<'_>, actor: &Actor<'_>, channel: &str, text: &str) {
        self.push(format!("chanmsg {} {} {}", actor.name, channel, text));
    }
}

type Events = mpsc::UnboundedReceiver<String>;

fn start(transport: Scripted) -> (tokio::task::JoinHandle<Forward>, ClientHandle, Events) {
    let (tx, events) = mpsc::unbounded_channel();
    let session = Session::new(SessionConfig::new("irc.test", 6667, "me"), Forward(tx));
    let (client, handle) = Client::new(session, transport).unwrap();
    (tokio::spawn(client.run()), handle, events)
}

async fn next(events: &mut Events) -> String {
    timeout(Duration::from_secs(120), events.recv())
        .await
        .expect("event in time")
        .expect("client alive")
}

#[tokio::test]
async fn registers_chats_and_quits() {
    let (transport, script) = scripted(0);
    let (task, handle, mut events) = start(transport);

    handle.connect().unwrap();
    assert_eq!(next(&mut events).await, "connect");

    script.send(":irc.test 001 me :Welcome\r\n:bob!b@h PRIVMSG #c :hi\r\n");
    assert_eq!(next(&mut events).await, "welcome me");
    assert_eq!(next(&mut events).await, "chanmsg bob #c hi");

    handle.privmsg("#c", "yo").unwrap();
    handle.quit(Some("bye")).unwrap();
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

    let written = script.written();
    assert_eq!(
        &written[..4],
        &["CAP LS 302\r\n", "NICK me\r\n", "USER me 0 * :me\r\n", "PRIVMSG #c :yo\r\n"][..],
        "{:?}",
        written
    );
    assert_eq!(written.last().map(String::as_str), Some("QUIT :bye\r\n"));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn answers_ping_split_across_reads() {
    let (transport, script) = scripted(0);
    let (task, handle, mut events) = start(transport);

    handle.connect().unwrap();
    assert_eq!(next(&mut events).await, "connect");

    script.send("PI");
    script.send("NG :split\r");
    script.send("\n:irc.test 001 me :Welcome\r\n");
    assert_eq!(next(&mut events).await, "welcome me");

    handle.quit(None).unwrap();
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert!(script.written().contains(&"PONG :split\r\n".to_owned()));
}

#[tokio::test(start_paused = true)]
async fn failed_connect_retries_after_backoff() {
    let (transport, script) = scripted(1);
    let (task, handle, mut events) = start(transport);

    handle.connect().unwrap();
    assert_eq!(next(&mut events).await, "connect_failed io error: refused Some(10s)");
    assert_eq!(next(&mut events).await, "connect");
    assert_eq!(script.attempts.load(Ordering::SeqCst), 2);

    handle.quit(None).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn peer_hangup_reconnects() {
    let (transport, script) = scripted(0);
    let (task, handle, mut events) = start(transport);

    handle.connect().unwrap();
    assert_eq!(next(&mut events).await, "connect");

    script.hang_up();
    assert_eq!(
        next(&mut events).await,
        "disconnect Connection closed by peer Some(5s)"
    );
    assert_eq!(next(&mut events).await, "connect");
    assert_eq!(script.attempts.load(Ordering::SeqCst), 2);

    handle.quit(None).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn disconnect_cancels_pending_connect() {
    let (mut transport, _script) = scripted(0);
    transport.hang_on_connect = true;
    let (task, handle, mut events) = start(transport);

    handle.connect().unwrap();
    handle.disconnect().unwrap();
    assert_eq!(next(&mut events).await, "connect_failed Connection cancelled None");

    handle.quit(None).unwrap();
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn dropping_every_handle_stops_the_client() {
    let (transport, _script) = scripted(0);
    let (task, handle, _events) = start(transport);

    drop(handle);
    timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}
