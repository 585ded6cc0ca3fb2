//! End-to-end tests driving a real `EventLoop` over loopback TCP.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use slircd::event_loop::EventLoop;

struct TestServer {
    addr: std::net::SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    fn spawn(password: &str) -> TestServer {
        let stop = Arc::new(AtomicBool::new(false));
        let mut event_loop = EventLoop::bind(0, password.to_string(), Arc::clone(&stop)).expect("bind");
        let addr = event_loop.local_addr().expect("local_addr");
        let handle = thread::spawn(move || event_loop.run());
        // Give the background thread a moment to enter its poll loop.
        thread::sleep(Duration::from_millis(50));
        TestServer { addr, stop, handle: Some(handle) }
    }

    fn connect(&self) -> BufReader<TcpStream> {
        let stream = TcpStream::connect(self.addr).expect("connect");
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        BufReader::new(stream)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn send_line(stream: &mut BufReader<TcpStream>, line: &str) {
    stream.get_mut().write_all(line.as_bytes()).unwrap();
    stream.get_mut().write_all(b"\r\n").unwrap();
}

fn read_line(stream: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    stream.read_line(&mut line).expect("read_line");
    line.trim_end().to_string()
}

fn register(stream: &mut BufReader<TcpStream>, password: &str, nick: &str) {
    send_line(stream, &format!("PASS {password}"));
    send_line(stream, &format!("NICK {nick}"));
    send_line(stream, &format!("USER {nick} 0 * :{nick} Realname"));
    for _ in 0..4 {
        read_line(stream); // 001..004 welcome burst
    }
}

#[test]
fn full_registration_handshake_over_real_socket() {
    let server = TestServer::spawn("hunter2");
    let mut client = server.connect();
    send_line(&mut client, "PASS hunter2");
    send_line(&mut client, "NICK alice");
    send_line(&mut client, "USER a 0 * :Alice");

    let welcome = read_line(&mut client);
    assert!(welcome.contains("001"), "expected 001 welcome, got {welcome}");
    assert!(welcome.contains("alice"));
}

#[test]
fn wrong_password_gets_464_and_connection_closes() {
    let server = TestServer::spawn("hunter2");
    let mut client = server.connect();
    send_line(&mut client, "PASS wrong");

    let reply = read_line(&mut client);
    assert!(reply.contains("464"), "expected 464, got {reply}");

    // The connection should be closed by the server after flushing; a
    // subsequent read should see EOF rather than hang.
    let mut buf = [0u8; 16];
    use std::io::Read;
    let n = client.get_mut().read(&mut buf).unwrap_or(0);
    assert_eq!(n, 0, "expected EOF after deferred close");
}

#[test]
fn join_and_privmsg_fan_out_to_channel_members() {
    let server = TestServer::spawn("pw");
    let mut alice = server.connect();
    let mut bob = server.connect();
    register(&mut alice, "pw", "alice");
    register(&mut bob, "pw", "bob");

    send_line(&mut alice, "JOIN #dev");
    // own JOIN echo, notopic, names, endofnames
    for _ in 0..4 {
        read_line(&mut alice);
    }

    send_line(&mut bob, "JOIN #dev");
    // bob sees his own JOIN echo, notopic, names, endofnames
    read_line(&mut bob);
    for _ in 0..3 {
        read_line(&mut bob);
    }
    // alice sees bob's JOIN
    let join_seen = read_line(&mut alice);
    assert!(join_seen.contains("JOIN #dev"));

    send_line(&mut alice, "PRIVMSG #dev :hello there");
    let msg = read_line(&mut bob);
    assert!(msg.contains("PRIVMSG #dev :hello there"));
}

#[test]
fn ping_gets_pong() {
    let server = TestServer::spawn("pw");
    let mut client = server.connect();
    register(&mut client, "pw", "carol");
    send_line(&mut client, "PING :abc123");
    let reply = read_line(&mut client);
    assert!(reply.contains("PONG"));
    assert!(reply.contains("abc123"));
}

#[test]
fn second_connection_same_nick_is_rejected() {
    let server = TestServer::spawn("pw");
    let mut alice = server.connect();
    register(&mut alice, "pw", "dave");

    let mut impostor = server.connect();
    send_line(&mut impostor, "PASS pw");
    send_line(&mut impostor, "NICK dave");
    let reply = read_line(&mut impostor);
    assert!(reply.contains("433"), "expected 433, got {reply}");
}

#[test]
fn quit_disconnects_and_frees_nick_for_reuse() {
    let server = TestServer::spawn("pw");
    let mut alice = server.connect();
    register(&mut alice, "pw", "erin");
    send_line(&mut alice, "QUIT");

    // give the server a beat to process the deferred close
    thread::sleep(Duration::from_millis(100));

    let mut newcomer = server.connect();
    register(&mut newcomer, "pw", "erin");
    // reaching this point without a 433 confirms the nick was freed
}

#[test]
fn invite_only_channel_rejects_then_admits_after_invite() {
    let server = TestServer::spawn("pw");
    let mut alice = server.connect();
    let mut bob = server.connect();
    register(&mut alice, "pw", "alice");
    register(&mut bob, "pw", "bob");

    send_line(&mut alice, "JOIN #dev");
    for _ in 0..4 {
        read_line(&mut alice); // own JOIN, notopic, names, endofnames
    }

    send_line(&mut alice, "MODE #dev +i");
    let mode_echo = read_line(&mut alice);
    assert!(mode_echo.contains("MODE #dev +i"));

    send_line(&mut bob, "JOIN #dev");
    let reply = read_line(&mut bob);
    assert!(reply.contains("473"), "expected 473 invite-only rejection, got {reply}");

    send_line(&mut alice, "INVITE bob #dev");
    let inviting = read_line(&mut alice);
    assert!(inviting.contains("341"));
    let invite_notice = read_line(&mut bob);
    assert!(invite_notice.contains("INVITE bob #dev"));

    send_line(&mut bob, "JOIN #dev");
    let joined = read_line(&mut bob);
    assert!(joined.contains("JOIN #dev"), "expected JOIN to succeed after invite, got {joined}");
}

#[test]
fn mode_change_broadcast_groups_applied_letters_and_suppresses_noop() {
    let server = TestServer::spawn("pw");
    let mut alice = server.connect();
    register(&mut alice, "pw", "alice");
    send_line(&mut alice, "JOIN #dev");
    for _ in 0..4 {
        read_line(&mut alice);
    }

    // channel has no key set, so -k is a no-op and should not appear
    send_line(&mut alice, "MODE #dev +i+t-k");
    let broadcast = read_line(&mut alice);
    assert!(broadcast.contains("MODE #dev +it"), "got {broadcast}");
    assert!(!broadcast.contains('k'), "suppressed -k leaked into broadcast: {broadcast}");
}

#[test]
fn disconnecting_operator_promotes_smallest_handle_member() {
    let server = TestServer::spawn("pw");
    let mut alice = server.connect();
    let mut bob = server.connect();
    let mut carol = server.connect();
    register(&mut alice, "pw", "alice");
    register(&mut bob, "pw", "bob");
    register(&mut carol, "pw", "carol");

    send_line(&mut alice, "JOIN #dev");
    for _ in 0..4 {
        read_line(&mut alice);
    }
    send_line(&mut bob, "JOIN #dev");
    read_line(&mut bob);
    for _ in 0..3 {
        read_line(&mut bob);
    }
    read_line(&mut alice); // alice sees bob's JOIN
    send_line(&mut carol, "JOIN #dev");
    read_line(&mut carol);
    for _ in 0..3 {
        read_line(&mut carol);
    }
    read_line(&mut alice); // alice sees carol's JOIN
    read_line(&mut bob); // bob sees carol's JOIN

    // alice (the operator, and the smallest handle among the three) quits
    send_line(&mut alice, "QUIT");

    let bob_quit = read_line(&mut bob);
    assert!(bob_quit.contains("QUIT"), "expected QUIT notice, got {bob_quit}");
    let bob_promo = read_line(&mut bob);
    assert!(bob_promo.contains("MODE #dev +o"), "expected operator promotion, got {bob_promo}");
}
