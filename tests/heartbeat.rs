use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, UNIX_EPOCH};

use rpcx::{
    Client, Error, MethodSet, PingArgs, PingReply, Server, ServerDelegate, ServerStatus, Service,
    TickArgs, TickReply,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

#[derive(Default)]
struct CountingDelegate {
    pings: AtomicUsize,
    ticks: AtomicUsize,
}

impl ServerDelegate for CountingDelegate {
    fn ping(&self, _args: &PingArgs, _reply: &mut PingReply) -> rpcx::Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn tick(&self, _args: &TickArgs, _reply: &mut TickReply) -> rpcx::Result<()> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Delegate that refuses every ping
struct Refusing;

impl ServerDelegate for Refusing {
    fn ping(&self, _args: &PingArgs, _reply: &mut PingReply) -> rpcx::Result<()> {
        Err(Error::service("not today"))
    }

    fn tick(&self, _args: &TickArgs, _reply: &mut TickReply) -> rpcx::Result<()> {
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Greeting {
    name: String,
}

struct Greeter;

impl Service for Greeter {
    fn methods(self: Arc<Self>) -> MethodSet {
        MethodSet::new().method("Hello", |args: &Greeting, reply: &mut String| {
            *reply = format!("hello, {}", args.name);
            Ok(())
        })
    }
}

async fn start(server: &Server) -> (SocketAddr, JoinHandle<rpcx::Result<()>>) {
    server.register_internal_services().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let running = server.clone();
    let handle = tokio::spawn(async move { running.serve(listener).await });

    timeout(Duration::from_secs(2), async {
        while server.status() != ServerStatus::Running {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("server did not start");

    (addr, handle)
}

async fn shutdown(server: Server, handle: JoinHandle<rpcx::Result<()>>) {
    server.stop();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("accept loop did not exit")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn ping_populates_timestamps_and_calls_only_ping_handler() {
    let delegate = Arc::new(CountingDelegate::default());
    let server = Server::with_delegate(ForwardTo(delegate.clone()));
    let (addr, handle) = start(&server).await;

    let observed: Arc<Mutex<Vec<(PingArgs, PingReply, bool)>>> = Arc::default();
    let errors = Arc::new(AtomicUsize::new(0));
    let (seen, seen_errors) = (observed.clone(), errors.clone());

    let client = Client::new(addr.to_string())
        .with_ping_handler(move |_, ping, pong, err| {
            seen.lock().unwrap().push((*ping, *pong, err.is_some()));
        })
        .with_error_handler(move |_, _, _| {
            seen_errors.fetch_add(1, Ordering::SeqCst);
        });

    client.ping().await;

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    let (ping, pong, failed) = observed[0];
    assert!(!failed);
    assert!(ping.delivered_at > UNIX_EPOCH);
    assert!(pong.received_at > UNIX_EPOCH);
    assert!(pong.delivered_at > UNIX_EPOCH);
    assert!(pong.received_at >= ping.delivered_at);
    assert!(pong.delivered_at >= ping.delivered_at);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(delegate.pings.load(Ordering::SeqCst), 1);

    shutdown(server, handle).await;
}

#[tokio::test]
async fn ping_delegate_error_reaches_error_handler_verbatim() {
    let server = Server::with_delegate(Refusing);
    let (addr, handle) = start(&server).await;

    let messages: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen = messages.clone();
    let client = Client::new(addr.to_string()).with_error_handler(move |_, _, err| {
        seen.lock().unwrap().push(err.to_string());
    });

    client.ping().await;
    assert_eq!(*messages.lock().unwrap(), vec!["not today".to_string()]);

    shutdown(server, handle).await;
}

#[tokio::test]
async fn each_start_tick_fires_exactly_once() {
    let delegate = Arc::new(CountingDelegate::default());
    let server = Server::with_delegate(ForwardTo(delegate.clone()));
    let (addr, handle) = start(&server).await;

    let ticks = Arc::new(AtomicUsize::new(0));
    let seen = ticks.clone();
    let client = Client::new(addr.to_string()).with_tick_handler(move |_, args, reply, err| {
        assert!(err.is_none());
        assert!(reply.received_at >= args.delivered_at);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let interval = Duration::from_millis(100);
    for round in 1..=2 {
        let started = Instant::now();
        client.start_tick(interval).await.unwrap();
        assert!(started.elapsed() >= interval);
        assert_eq!(ticks.load(Ordering::SeqCst), round);
    }

    // Nothing more arrives without another start_tick
    sleep(interval * 3).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    assert_eq!(delegate.ticks.load(Ordering::SeqCst), 2);

    client.stop_tick();
    shutdown(server, handle).await;
}

#[tokio::test]
async fn tick_handler_can_stop_server_and_ticker() {
    let server = Server::new();
    let (addr, handle) = start(&server).await;

    let stopper = server.clone();
    let client = Client::new(addr.to_string()).with_tick_handler(move |client, _, _, _| {
        stopper.stop();
        client.stop_tick();
    });

    client.start_tick(Duration::from_millis(20)).await.unwrap();

    timeout(Duration::from_secs(2), handle)
        .await
        .expect("accept loop did not exit")
        .unwrap()
        .unwrap();
    assert_eq!(server.status(), ServerStatus::Stopped);
}

#[tokio::test]
async fn call_to_closed_port_is_refused_with_address() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = Client::new(addr.clone());
    let args = PingArgs::now();
    let mut reply = PingReply::default();

    match client.call("RPCX.PING", Some(&args), Some(&mut reply)).await {
        Err(Error::ConnectionRefused { address }) => assert_eq!(address, addr),
        other => panic!("expected refusal, got {:?}", other),
    }
}

#[tokio::test]
async fn paused_server_accepts_nothing_until_resumed() {
    let server = Server::new();
    let (addr, handle) = start(&server).await;

    server.pause();
    sleep(Duration::from_millis(50)).await;

    let client = Arc::new(Client::new(addr.to_string()));
    let args = PingArgs::now();
    let mut reply = PingReply::default();
    let attempt = timeout(
        Duration::from_millis(300),
        client.call("RPCX.PING", Some(&args), Some(&mut reply)),
    )
    .await;
    assert!(attempt.is_err(), "call completed while paused");

    server.resume();
    let mut reply = PingReply::default();
    let resumed = timeout(
        Duration::from_secs(2),
        client.call("RPCX.PING", Some(&args), Some(&mut reply)),
    )
    .await;
    assert!(matches!(resumed, Ok(Ok(()))));
    assert!(reply.received_at >= args.delivered_at);

    shutdown(server, handle).await;
}

#[tokio::test]
async fn registered_services_are_callable() {
    let server = Server::new();
    server.register_services("", Greeter).unwrap();
    server.register_services("Greetings", Greeter).unwrap();
    let (addr, handle) = start(&server).await;

    let client = Client::new(addr.to_string());
    let args = Greeting {
        name: "rpcx".to_string(),
    };

    let mut reply = String::new();
    client
        .call("Greeter.Hello", Some(&args), Some(&mut reply))
        .await
        .unwrap();
    assert_eq!(reply, "hello, rpcx");

    let mut reply = String::new();
    client
        .call("Greetings.Hello", Some(&args), Some(&mut reply))
        .await
        .unwrap();
    assert_eq!(reply, "hello, rpcx");

    let err = client
        .call("Greeter.Goodbye", Some(&args), Some(&mut reply))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote(ref msg) if msg == "rpc: can't find method Greeter.Goodbye"));

    shutdown(server, handle).await;
}

#[tokio::test]
async fn concurrent_calls_share_one_connection() {
    let server = Server::new();
    let (addr, handle) = start(&server).await;

    let client = Arc::new(Client::new(addr.to_string()));
    let mut calls = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        calls.push(tokio::spawn(async move {
            let args = PingArgs::now();
            let mut reply = PingReply::default();
            client.call("RPCX.PING", Some(&args), Some(&mut reply)).await?;
            assert!(reply.received_at >= args.delivered_at);
            Ok::<_, Error>(())
        }));
    }

    for call in calls {
        call.await.unwrap().unwrap();
    }
    assert!(client.is_connected());

    shutdown(server, handle).await;
}

/// Lets a test keep a handle on the delegate it installs
struct ForwardTo(Arc<CountingDelegate>);

impl ServerDelegate for ForwardTo {
    fn ping(&self, args: &PingArgs, reply: &mut PingReply) -> rpcx::Result<()> {
        self.0.ping(args, reply)
    }

    fn tick(&self, args: &TickArgs, reply: &mut TickReply) -> rpcx::Result<()> {
        self.0.tick(args, reply)
    }
}
