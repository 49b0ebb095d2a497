//! Loopback integration tests: real sockets, real workers, real frames.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use trading_core::Side;
use trading_protocol::{
    decode_frame, encode_frame, encode_handshake, OrderFrame, FRAME_LEN,
};
use trading_server::config::Config;
use trading_server::server::Server;

/// Bind an ephemeral port, run the server on a background thread, and
/// return the address to dial.
fn start_server(nreaders: usize, nprocessors: usize) -> SocketAddr {
    let mut config = Config::new(0, nreaders, nprocessors);
    config.bind_addr = "127.0.0.1".to_string();
    let server = Server::bind(config).expect("bind loopback");
    let addr = server.local_addr().expect("bound address");
    thread::spawn(move || {
        let _ = server.run();
    });
    addr
}

fn connect(addr: SocketAddr, trader_id: i32) -> TcpStream {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    let handshake = encode_handshake(trader_id).unwrap();
    stream.write_all(&handshake).expect("send handshake");
    stream
}

fn send_order(
    stream: &mut TcpStream,
    stock: &str,
    trader: &str,
    trader_id: i32,
    quantity: i32,
    side: Side,
) {
    let frame = OrderFrame {
        stock: stock.to_string(),
        trader: trader.to_string(),
        trader_id,
        quantity,
        balance: quantity,
        side,
    };
    let bytes = encode_frame(&frame).unwrap();
    stream.write_all(&bytes).expect("send order");
}

fn read_fill(stream: &mut TcpStream) -> OrderFrame {
    let mut buf = [0u8; FRAME_LEN];
    stream.read_exact(&mut buf).expect("read fill");
    decode_frame(&buf).expect("decode fill")
}

/// Give in-flight orders time to cross the queues and the book.
fn settle() {
    thread::sleep(Duration::from_millis(100));
}

#[test]
fn exact_fill_notifies_both_traders() {
    let addr = start_server(2, 1);
    let mut buyer = connect(addr, 1);
    let mut seller = connect(addr, 2);

    send_order(&mut buyer, "IBM", "alice", 1, 100, Side::Buy);
    settle();
    send_order(&mut seller, "IBM", "bob", 2, 100, Side::Sell);

    let fill = read_fill(&mut buyer);
    assert_eq!(fill.stock, "IBM");
    assert_eq!(fill.trader, "alice");
    assert_eq!(fill.quantity, 100);
    assert_eq!(fill.balance, 0);
    assert_eq!(fill.side, Side::Buy);

    let fill = read_fill(&mut seller);
    assert_eq!(fill.trader, "bob");
    assert_eq!(fill.balance, 0);
    assert_eq!(fill.side, Side::Sell);
}

#[test]
fn partial_fill_notifies_only_the_completed_side() {
    let addr = start_server(2, 1);
    let mut buyer = connect(addr, 10);
    let mut seller = connect(addr, 11);

    send_order(&mut buyer, "DEL", "carol", 10, 100, Side::Buy);
    settle();
    send_order(&mut seller, "DEL", "dan", 11, 40, Side::Sell);

    // The aggressor completed and hears about it.
    let fill = read_fill(&mut seller);
    assert_eq!(fill.trader, "dan");
    assert_eq!(fill.quantity, 40);
    assert_eq!(fill.balance, 0);

    // The partially consumed resting order stays silent.
    buyer
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut buf = [0u8; FRAME_LEN];
    let err = buyer.read_exact(&mut buf).expect_err("no fill expected yet");
    assert!(
        matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut),
        "unexpected read result: {err:?}"
    );

    // A second sell finishes the buyer off; now it hears exactly once.
    buyer
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    send_order(&mut seller, "DEL", "dan", 11, 60, Side::Sell);
    let fill = read_fill(&mut buyer);
    assert_eq!(fill.trader, "carol");
    assert_eq!(fill.quantity, 100);
    assert_eq!(fill.balance, 0);
    let fill = read_fill(&mut seller);
    assert_eq!(fill.quantity, 60);
}

#[test]
fn fills_for_disconnected_traders_are_dropped() {
    let addr = start_server(2, 1);

    {
        let mut ghost = connect(addr, 20);
        send_order(&mut ghost, "SNY", "eve", 20, 100, Side::Buy);
        settle();
        ghost.shutdown(Shutdown::Both).unwrap();
    }
    settle();

    // Crossing the departed trader's order must not disturb the server;
    // the survivor still gets its own fill.
    let mut seller = connect(addr, 21);
    send_order(&mut seller, "SNY", "frank", 21, 100, Side::Sell);
    let fill = read_fill(&mut seller);
    assert_eq!(fill.trader, "frank");
    assert_eq!(fill.balance, 0);

    // And the server keeps serving afterwards.
    let mut buyer = connect(addr, 22);
    send_order(&mut buyer, "SNY", "gina", 22, 10, Side::Buy);
    settle();
    send_order(&mut seller, "SNY", "frank", 21, 10, Side::Sell);
    let fill = read_fill(&mut buyer);
    assert_eq!(fill.trader, "gina");
}

#[test]
fn duplicate_trader_id_connection_is_closed() {
    let addr = start_server(2, 1);
    let _first = connect(addr, 30);
    settle();

    let mut second = connect(addr, 30);
    // The server rejects the handshake and closes; the read observes EOF.
    let mut buf = [0u8; 1];
    let n = second.read(&mut buf).expect("read on rejected connection");
    assert_eq!(n, 0, "expected EOF on duplicate trader connection");
}

#[test]
fn bad_frame_drops_only_the_offending_connection() {
    let addr = start_server(2, 1);
    let mut good = connect(addr, 40);
    let mut bad = connect(addr, 41);
    settle();

    // An 88-byte frame whose side field is nonsense.
    let mut garbage = encode_frame(&OrderFrame {
        stock: "BBG".to_string(),
        trader: "mallory".to_string(),
        trader_id: 41,
        quantity: 5,
        balance: 5,
        side: Side::Buy,
    })
    .unwrap();
    garbage[FRAME_LEN - 4..].copy_from_slice(&9i32.to_ne_bytes());
    bad.write_all(&garbage).unwrap();

    let mut buf = [0u8; 1];
    let n = bad.read(&mut buf).expect("read on dropped connection");
    assert_eq!(n, 0, "expected EOF after protocol violation");

    // The well-behaved connection is unaffected.
    send_order(&mut good, "BBG", "grace", 40, 10, Side::Buy);
    settle();
    let mut seller = connect(addr, 42);
    send_order(&mut seller, "BBG", "heidi", 42, 10, Side::Sell);
    let fill = read_fill(&mut good);
    assert_eq!(fill.trader, "grace");
}

#[test]
fn trader_id_can_reconnect_after_disconnect() {
    let addr = start_server(2, 1);
    {
        let first = connect(addr, 50);
        drop(first);
    }
    settle();

    let mut again = connect(addr, 50);
    send_order(&mut again, "MSN", "ivan", 50, 10, Side::Buy);
    settle();
    let mut seller = connect(addr, 51);
    send_order(&mut seller, "MSN", "judy", 51, 10, Side::Sell);
    let fill = read_fill(&mut again);
    assert_eq!(fill.trader, "ivan");
}

/// Balanced concurrent load: every order is for the same stock and the
/// same quantity, with equal buy and sell counts, so the book drains and
/// every order fully fills. Each client therefore receives exactly one
/// fill per order it sent, and matched volume balances across sides.
#[test]
fn concurrent_clients_conserve_matched_volume() {
    const CLIENTS: usize = 4;
    const ORDERS_PER_CLIENT: usize = 50; // even, so sides balance

    let addr = start_server(CLIENTS, 2);

    let mut handles = Vec::new();
    for i in 0..CLIENTS {
        handles.push(thread::spawn(move || {
            let trader_id = 60 + i as i32;
            let mut stream = connect(addr, trader_id);
            let name = format!("trader{trader_id}");

            let mut side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            for _ in 0..ORDERS_PER_CLIENT {
                send_order(&mut stream, "IBM", &name, trader_id, 100, side);
                side = side.opposite();
            }

            let mut fills = Vec::new();
            for _ in 0..ORDERS_PER_CLIENT {
                fills.push(read_fill(&mut stream));
            }
            fills
        }));
    }

    let mut bought: i64 = 0;
    let mut sold: i64 = 0;
    for handle in handles {
        let fills = handle.join().expect("client thread");
        assert_eq!(fills.len(), ORDERS_PER_CLIENT);
        for fill in fills {
            assert_eq!(fill.stock, "IBM");
            assert_eq!(fill.balance, 0, "only full fills are notified");
            match fill.side {
                Side::Buy => bought += i64::from(fill.quantity),
                Side::Sell => sold += i64::from(fill.quantity),
            }
        }
    }

    assert_eq!(
        bought,
        (CLIENTS * ORDERS_PER_CLIENT / 2) as i64 * 100,
        "every buy order fully filled"
    );
    assert_eq!(bought, sold, "matched volume must balance");
}
