//! Integration tests for writability watermarks and inbound-window
//! accounting (spec §4.7, §4.6), and for the locally-initiated stream id
//! allocator's lazy, first-flush-ordered assignment (spec §4.1).

extern crate futures;
extern crate h2mux;
extern crate http;

mod support;

use h2mux::frame::{Data, Headers};
use h2mux::{Child, Initializer, Lifecycle, StreamId};

use support::{assert_not_ready, poll_stream_in_task, MockIo};

fn ok_initializer(_child: Child) -> Initializer {
    Box::new(futures::future::ok(()))
}

fn data_of_len(n: usize) -> Data {
    Data::new(StreamId::ZERO, vec![0u8; n].into(), false)
}

/// S4: writability flips downward when buffered DATA bytes cross the
/// high watermark, stays flipped while more unwritable writes queue, and
/// flips back upward only once a flush brings the count to/under low.
#[test]
fn s4_writability_flips_on_watermark_crossing() {
    let mock = MockIo::new();
    let options = h2mux::client::options().high_watermark(100).low_watermark(50).build();
    let mut mux = h2mux::client::new(mock.clone(), ok_initializer, options);

    let (child, _completion) = mux.create_stream(ok_initializer);
    // One poll resolves the outbound setup initializer (it's `future::ok`
    // and ready immediately) so `flush()` below will actually release.
    assert_not_ready(poll_stream_in_task(&mut mux));
    assert!(child.is_writable());

    let _h1 = child.write(Headers::new(StreamId::ZERO, http::HeaderMap::new(), false).into());
    assert!(child.is_writable());

    let _d1 = child.write(data_of_len(90).into());
    assert!(child.is_writable(), "90 buffered bytes is still at/under the 100-byte high watermark");

    let _d2 = child.write(data_of_len(20).into());
    assert!(!child.is_writable(), "110 buffered bytes crosses the 100-byte high watermark");

    let _h2 = child.write(Headers::trailers(StreamId::ZERO, http::HeaderMap::new()).into());
    assert!(!child.is_writable(), "a zero-cost trailers write must not re-trigger or clear the flip");

    child.flush();
    assert!(child.is_writable(), "flushing releases all 110 buffered bytes, crossing back under the 50-byte low watermark");
}

/// Invariant 2/3: a locally-created stream's id is assigned exactly on
/// its first flushed write, and two streams created in order receive
/// ids in flush order, not creation order.
#[test]
fn stream_ids_assigned_lazily_in_flush_order() {
    let mock = MockIo::new();
    let options = h2mux::client::options().build();
    let mut mux = h2mux::client::new(mock.clone(), ok_initializer, options);

    let (a, _) = mux.create_stream(ok_initializer);
    let (b, _) = mux.create_stream(ok_initializer);
    assert_not_ready(poll_stream_in_task(&mut mux));

    assert!(a.stream_id().is_err(), "no id before any flush");
    assert!(b.stream_id().is_err(), "no id before any flush");

    // B flushes first, despite being created second.
    let _ = b.write(Headers::new(StreamId::ZERO, http::HeaderMap::new(), true).into());
    b.flush();
    let b_id = b.stream_id().expect("flushed stream has an id");

    let _ = a.write(Headers::new(StreamId::ZERO, http::HeaderMap::new(), true).into());
    a.flush();
    let a_id = a.stream_id().expect("flushed stream has an id");

    assert!(b_id < a_id, "first-to-flush gets the lower id, regardless of creation order");
    assert_eq!(b_id.as_u32() % 2, a_id.as_u32() % 2, "both ids share the client parity");
    assert_eq!(b_id.as_u32() % 2, 1, "client-initiated ids are odd");
}

/// S6: a WINDOW_UPDATE is emitted once the reported inbound window
/// drains to at most half the configured target, and not before.
#[test]
fn s6_window_update_emitted_at_half_target() {
    let mock = MockIo::new();
    let options = h2mux::client::options().target_window_size(1024).build();
    let mut mux = h2mux::client::new(mock.clone(), ok_initializer, options);

    // "Open stream 1": the first locally-created stream in client mode
    // gets id 1 on its first flush (spec §4.1).
    let (child, _completion) = mux.create_stream(ok_initializer);
    assert_not_ready(poll_stream_in_task(&mut mux));
    let _ = child.write(Headers::new(StreamId::ZERO, http::HeaderMap::new(), true).into());
    child.flush();
    assert_eq!(child.stream_id().unwrap(), StreamId::new(1));
    mock.take_outbound();

    mock.push_lifecycle(Lifecycle::WindowUpdated {
        id: StreamId::new(1),
        inbound_window_size: Some(513),
        outbound_window_size: None,
    });
    assert_not_ready(poll_stream_in_task(&mut mux));
    assert!(mock.take_outbound().is_empty(), "513 > 1024/2, no WINDOW_UPDATE yet");

    mock.push_lifecycle(Lifecycle::WindowUpdated {
        id: StreamId::new(1),
        inbound_window_size: Some(512),
        outbound_window_size: None,
    });
    assert_not_ready(poll_stream_in_task(&mut mux));

    let outbound = mock.take_outbound();
    assert_eq!(outbound.len(), 1);
    match &outbound[0] {
        h2mux::Frame::WindowUpdate(w) => {
            assert_eq!(w.stream_id, StreamId::new(1));
            assert_eq!(w.increment, 512);
        }
        f => panic!("expected WINDOW_UPDATE, got {:?}", f),
    }
}

/// Open question (spec §9): a `WindowUpdated` event with both fields
/// absent is a documented no-op, not a panic or a spurious WINDOW_UPDATE.
#[test]
fn window_updated_with_no_fields_is_a_no_op() {
    let mock = MockIo::new();
    let options = h2mux::client::options().target_window_size(1024).build();
    let mut mux = h2mux::client::new(mock.clone(), ok_initializer, options);

    let (child, _completion) = mux.create_stream(ok_initializer);
    assert_not_ready(poll_stream_in_task(&mut mux));
    let _ = child.write(Headers::new(StreamId::ZERO, http::HeaderMap::new(), true).into());
    child.flush();
    mock.take_outbound();

    mock.push_lifecycle(Lifecycle::WindowUpdated {
        id: StreamId::new(1),
        inbound_window_size: None,
        outbound_window_size: None,
    });
    assert_not_ready(poll_stream_in_task(&mut mux));
    assert!(mock.take_outbound().is_empty());
}
