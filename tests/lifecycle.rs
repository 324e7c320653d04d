//! Integration tests for the inbound router, the setup-deferral path,
//! and the lifecycle coordinator (spec §4.2, §4.5, §4.6). Scenario
//! numbers in comments refer to spec §8's literal end-to-end scenarios.

extern crate futures;
extern crate h2mux;
extern crate http;

mod support;

use std::cell::RefCell;
use std::rc::Rc;

use futures::{Async, Future};

use h2mux::frame::{Data, Headers, Ping};
use h2mux::{Child, Error, Frame, Initializer, Lifecycle, Reason, StreamId};

use support::{assert_not_ready, assert_ready, poll_in_task, poll_stream_in_task, MockIo};

fn headers(id: u32, end_stream: bool) -> Frame {
    Frame::from(Headers::new(StreamId::new(id), http::HeaderMap::new(), end_stream))
}

fn data(id: u32, payload: &'static str) -> Frame {
    Frame::from(Data::new(StreamId::new(id), payload.as_bytes().into(), false))
}

/// S1: 50 peer-opened streams, none closing early, then all torn down
/// cleanly by `StreamClosed(reason=None)`, with no outbound frames ever
/// emitted.
#[test]
fn s1_fifty_streams_open_and_close_cleanly() {
    let mock = MockIo::new();
    let captured: Rc<RefCell<Vec<Child>>> = Rc::new(RefCell::new(Vec::new()));
    let captured2 = captured.clone();

    let mut mux = h2mux::server::new(
        mock.clone(),
        move |child: Child| {
            captured2.borrow_mut().push(child.clone());
            Box::new(futures::future::ok(())) as Initializer
        },
        h2mux::server::options().build(),
    );

    for i in 0..50u32 {
        mock.push_frame(headers(1 + 2 * i, false));
    }
    assert_not_ready(poll_stream_in_task(&mut mux));
    assert_eq!(captured.borrow().len(), 50);

    for child in captured.borrow().iter() {
        assert!(child.is_active());
    }

    for i in 0..50u32 {
        mock.push_lifecycle(Lifecycle::StreamClosed { id: StreamId::new(1 + 2 * i), reason: None });
    }
    assert_not_ready(poll_stream_in_task(&mut mux));

    for child in captured.borrow().iter() {
        let mut fut = child.close_future();
        assert_ready(poll_in_task(&mut fut));
    }
    assert!(mock.take_outbound().is_empty());
}

/// S2: a stream closes, then a DATA frame for its (now-stale) id must
/// surface `NoSuchStream` rather than silently reopening it, and no
/// frame reaches any child.
#[test]
fn s2_data_after_close_is_no_such_stream() {
    let mock = MockIo::new();
    let mut mux = h2mux::server::new(
        mock.clone(),
        |_child: Child| Box::new(futures::future::ok(())) as Initializer,
        h2mux::server::options().build(),
    );

    mock.push_frame(headers(5, false));
    assert_not_ready(poll_stream_in_task(&mut mux));

    mock.push_lifecycle(Lifecycle::StreamClosed { id: StreamId::new(5), reason: None });
    assert_not_ready(poll_stream_in_task(&mut mux));

    mock.push_frame(data(5, "Hello, world!"));
    match poll_stream_in_task(&mut mux) {
        Err(Error::NoSuchStream(id)) => assert_eq!(id, StreamId::new(5)),
        other => panic!("expected NoSuchStream, got {:?}", other),
    }
}

/// S3 / invariant 1: while the inbound initializer hasn't resolved,
/// frames queue but never reach the child; once it resolves, every
/// queued frame is delivered to the child in original arrival order.
#[test]
fn s3_frames_deferred_until_initializer_completes() {
    let mock = MockIo::new();
    let captured: Rc<RefCell<Option<Child>>> = Rc::new(RefCell::new(None));
    let captured2 = captured.clone();

    let (tx, rx) = futures::sync::oneshot::channel::<()>();
    let mut rx_opt = Some(rx);

    let mut mux = h2mux::server::new(
        mock.clone(),
        move |child: Child| {
            *captured2.borrow_mut() = Some(child.clone());
            let rx = rx_opt.take().expect("initializer invoked once in this test");
            Box::new(rx.then(|_| -> Result<(), Error> { Ok(()) })) as Initializer
        },
        h2mux::server::options().build(),
    );

    mock.push_frame(headers(1, false));
    for _ in 0..5 {
        mock.push_frame(data(1, "Hello, world!"));
    }
    mock.push_frame(Frame::Ping(Ping { payload: *b"abcdefgh", ack: false }));

    // Drain: the PING passes through; nothing is delivered to the child
    // while the initializer is still pending.
    let mut saw_ping = false;
    loop {
        match poll_stream_in_task(&mut mux) {
            Ok(Async::Ready(Some(Frame::Ping(_)))) => saw_ping = true,
            Ok(Async::NotReady) => break,
            other => panic!("unexpected poll result: {:?}", other),
        }
    }
    assert!(saw_ping);

    let mut child = captured.borrow().clone().unwrap();
    assert!(!child.is_active());
    assert_not_ready(poll_stream_in_task(&mut child));

    tx.send(()).unwrap();
    assert_not_ready(poll_stream_in_task(&mut mux));
    assert!(child.is_active());

    for i in 0..6 {
        let frame = assert_ready(poll_stream_in_task(&mut child)).expect("frame expected");
        if i == 0 {
            assert!(matches!(frame, Frame::Headers(_)), "first frame must be HEADERS");
        } else {
            match frame {
                Frame::Data(d) => assert_eq!(&d.payload[..], &b"Hello, world!"[..]),
                f => panic!("expected DATA at index {}, got {:?}", i, f),
            }
        }
    }
}

/// S5: an inbound setup initializer fails after frames have already
/// arrived. Exactly one `RST_STREAM(CANCEL)` is emitted; the stream only
/// fully closes once the connection layer reports the matching
/// `StreamClosed`, at which point its handlers are torn down.
#[test]
fn s5_setup_failure_emits_single_reset_then_closes_on_stream_closed() {
    let mock = MockIo::new();
    let captured: Rc<RefCell<Option<Child>>> = Rc::new(RefCell::new(None));
    let captured2 = captured.clone();

    let mut mux = h2mux::server::new(
        mock.clone(),
        move |child: Child| {
            *captured2.borrow_mut() = Some(child.clone());
            Box::new(futures::future::err(Error::Connection(Reason::ProtocolError))) as Initializer
        },
        h2mux::server::options().build(),
    );

    mock.push_frame(headers(1, false));
    for _ in 0..5 {
        mock.push_frame(data(1, "Hello, world!"));
    }
    assert_not_ready(poll_stream_in_task(&mut mux));

    let outbound = mock.take_outbound();
    assert_eq!(outbound.len(), 1);
    match &outbound[0] {
        Frame::Reset(r) => {
            assert_eq!(r.stream_id, StreamId::new(1));
            assert_eq!(r.reason, Reason::Cancel);
        }
        f => panic!("expected RST_STREAM, got {:?}", f),
    }

    let child = captured.borrow().clone().unwrap();
    assert!(!child.is_active());

    mock.push_lifecycle(Lifecycle::StreamClosed { id: StreamId::new(1), reason: Some(Reason::Cancel) });
    let before = mux.run_pending_teardown();
    assert_not_ready(poll_stream_in_task(&mut mux));
    let after_poll_teardown = mux.run_pending_teardown();
    assert_eq!(before, 0, "nothing pending before the StreamClosed event lands");
    assert_eq!(after_poll_teardown, 0, "poll() already drained teardown for this tick");

    let mut close_sig = child.close_future();
    assert_ready(poll_in_task(&mut close_sig));
}

/// Invariant 4: however many `close()` callers a stream has, exactly one
/// `RST_STREAM(CANCEL)` is emitted, and every caller's completion is
/// satisfied by the subsequent `StreamClosed` event.
#[test]
fn local_close_is_idempotent_across_multiple_callers() {
    let mock = MockIo::new();
    let captured: Rc<RefCell<Option<Child>>> = Rc::new(RefCell::new(None));
    let captured2 = captured.clone();

    let mut mux = h2mux::server::new(
        mock.clone(),
        move |child: Child| {
            *captured2.borrow_mut() = Some(child.clone());
            Box::new(futures::future::ok(())) as Initializer
        },
        h2mux::server::options().build(),
    );

    mock.push_frame(headers(7, false));
    assert_not_ready(poll_stream_in_task(&mut mux));

    let child = captured.borrow().clone().unwrap();
    let mut close1 = child.close();
    let mut close2 = child.close();
    let mut close3 = child.close();

    assert_not_ready(poll_in_task(&mut close1));
    assert_not_ready(poll_in_task(&mut close2));
    assert_not_ready(poll_in_task(&mut close3));

    let outbound = mock.take_outbound();
    assert_eq!(outbound.len(), 1, "exactly one RST_STREAM regardless of close() caller count");

    mock.push_lifecycle(Lifecycle::StreamClosed { id: StreamId::new(7), reason: None });
    assert_not_ready(poll_stream_in_task(&mut mux));

    assert_ready(poll_in_task(&mut close1));
    assert_ready(poll_in_task(&mut close2));
    assert_ready(poll_in_task(&mut close3));
}
