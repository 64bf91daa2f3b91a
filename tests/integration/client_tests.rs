//! Integration tests for the high-level-core client.
//!
//! Covers request/response pairing, error propagation, timeouts and the
//! drop paths for stale, malformed and misdirected frames.

use sdbridge::config::BridgeConfig;
use sdbridge::error::{ChannelFault, Error, RequestError, StorageFault};
use sdbridge::protocol::client::BlockClient;
use sdbridge::protocol::codec::{BLOCK_SIZE, Message, RESULT_IO_ERROR, RESULT_OK};
use sdbridge::protocol::pending::Completion;

use crate::mock_channel::MockChannel;

fn config(timeout_ms: u32) -> BridgeConfig {
    BridgeConfig {
        response_timeout_ms: timeout_ms,
        ..BridgeConfig::default()
    }
}

fn client(ch: MockChannel) -> BlockClient<MockChannel> {
    BlockClient::new(ch, &config(50))
}

// ── Pairing ───────────────────────────────────────────────────

#[test]
fn result_for_other_block_does_not_unblock_reader() {
    let mut c = client(MockChannel::with_replies(&[
        Message::ReadResult {
            block: 7,
            data: [0x07; BLOCK_SIZE],
        },
        Message::ReadResult {
            block: 42,
            data: [0x42; BLOCK_SIZE],
        },
    ]));

    assert_eq!(c.read_block(42).unwrap(), [0x42; BLOCK_SIZE]);
    assert_eq!(c.stats().stale_dropped, 1, "block 7 result must be discarded");
    assert_eq!(c.stats().completed, 1);
    assert_eq!(c.in_flight(), 0);
}

#[test]
fn out_of_order_results_reach_their_own_waiters() {
    let mut c = client(MockChannel::with_replies(&[
        Message::ReadResult {
            block: 2,
            data: [2; BLOCK_SIZE],
        },
        Message::WriteResult {
            block: 1,
            result: RESULT_OK,
        },
    ]));

    c.submit_write(1, &[1; BLOCK_SIZE]).unwrap();
    c.submit_read(2).unwrap();
    assert_eq!(c.in_flight(), 2);

    // Waiting on 1 parks the block-2 result on its entry.
    assert_eq!(c.wait(1).unwrap(), Completion::Written);
    assert_eq!(c.channel_mut().pending_inbound(), 0);
    assert_eq!(c.wait(2).unwrap(), Completion::Read([2; BLOCK_SIZE]));
    assert_eq!(c.stats().stale_dropped, 0);
}

#[test]
fn result_of_wrong_operation_is_stale() {
    let mut c = client(MockChannel::with_replies(&[
        Message::ReadResult {
            block: 9,
            data: [0; BLOCK_SIZE],
        },
        Message::WriteResult {
            block: 9,
            result: RESULT_OK,
        },
    ]));

    c.write_block(9, &[0x99; BLOCK_SIZE]).unwrap();
    assert_eq!(c.stats().stale_dropped, 1);
}

#[test]
fn each_call_sends_exactly_one_request() {
    let mut c = client(MockChannel::with_replies(&[Message::WriteResult {
        block: 100,
        result: RESULT_OK,
    }]));
    c.write_block(100, &[0xAB; BLOCK_SIZE]).unwrap();

    let sent = c.into_channel().sent_messages();
    assert_eq!(
        sent,
        vec![Message::WriteRequest {
            block: 100,
            data: [0xAB; BLOCK_SIZE]
        }]
    );
}

// ── Error propagation ─────────────────────────────────────────

#[test]
fn negative_write_result_is_storage_fault() {
    let mut c = client(MockChannel::with_replies(&[Message::WriteResult {
        block: 5,
        result: RESULT_IO_ERROR,
    }]));

    assert_eq!(
        c.write_block(5, &[0; BLOCK_SIZE]),
        Err(Error::Storage(StorageFault {
            block: 5,
            code: RESULT_IO_ERROR
        }))
    );
    assert_eq!(c.stats().storage_faults, 1);
    assert_eq!(c.in_flight(), 0);
}

#[test]
fn failed_read_carries_code() {
    let mut c = client(MockChannel::with_replies(&[Message::ReadFailed {
        block: 11,
        result: -7,
    }]));
    assert_eq!(
        c.read_block(11),
        Err(Error::Storage(StorageFault {
            block: 11,
            code: -7
        }))
    );
}

#[test]
fn send_failure_leaves_no_entry() {
    let mut ch = MockChannel::new();
    ch.send_fault = Some(ChannelFault::Transport);
    let mut c = client(ch);

    assert_eq!(
        c.read_block(1),
        Err(Error::Channel(ChannelFault::Transport))
    );
    assert_eq!(c.in_flight(), 0);
    assert_eq!(c.stats().requests_sent, 0);
}

#[test]
fn disconnect_while_waiting_is_fatal() {
    let mut ch = MockChannel::new();
    ch.hang_up_when_drained = true;
    let mut c = client(ch);

    assert_eq!(
        c.read_block(3),
        Err(Error::Channel(ChannelFault::Disconnected))
    );
    assert_eq!(c.in_flight(), 0);
}

// ── Timeouts ──────────────────────────────────────────────────

#[test]
fn timeout_then_late_result_is_discarded() {
    let mut c = BlockClient::new(MockChannel::new(), &config(10));

    assert_eq!(c.read_block(3), Err(Error::Timeout { block: 3 }));
    assert_eq!(c.in_flight(), 0);

    c.channel_mut().push(&Message::ReadResult {
        block: 3,
        data: [0xEE; BLOCK_SIZE],
    });
    assert!(c.pump(core::time::Duration::ZERO).unwrap());
    assert_eq!(c.stats().stale_dropped, 1);
    assert_eq!(c.stats().completed, 0);
    assert_eq!(c.in_flight(), 0);
}

#[test]
fn timed_out_address_can_be_reused() {
    let mut c = BlockClient::new(MockChannel::new(), &config(10));
    assert_eq!(
        c.write_block(4, &[1; BLOCK_SIZE]),
        Err(Error::Timeout { block: 4 })
    );

    c.submit_write(4, &[2; BLOCK_SIZE]).unwrap();
    c.channel_mut().push(&Message::WriteResult {
        block: 4,
        result: RESULT_OK,
    });
    assert_eq!(c.wait(4).unwrap(), Completion::Written);
    assert_eq!(c.stats().timeouts, 1);
    assert_eq!(c.channel_mut().sent.len(), 2);
}

#[test]
fn unwaited_requests_expire_and_free_the_table() {
    let cfg = BridgeConfig {
        max_in_flight: 2,
        ..config(5)
    };
    let mut c = BlockClient::new(MockChannel::new(), &cfg);
    c.submit_read(1).unwrap();
    c.submit_read(2).unwrap();
    std::thread::sleep(core::time::Duration::from_millis(20));

    c.channel_mut().push(&Message::ReadResult {
        block: 3,
        data: [3; BLOCK_SIZE],
    });
    assert_eq!(c.read_block(3).unwrap(), [3; BLOCK_SIZE]);
    assert_eq!(c.stats().timeouts, 2);
    assert_eq!(c.in_flight(), 0);

    // Their late results no longer match anything.
    c.channel_mut().push(&Message::ReadResult {
        block: 1,
        data: [1; BLOCK_SIZE],
    });
    assert!(c.pump(core::time::Duration::ZERO).unwrap());
    assert_eq!(c.stats().stale_dropped, 1);
}

#[test]
fn cancelled_request_frees_its_slot() {
    let cfg = BridgeConfig {
        max_in_flight: 1,
        ..config(50)
    };
    let mut c = BlockClient::new(MockChannel::new(), &cfg);
    c.submit_read(1).unwrap();
    assert!(c.cancel(1));
    assert!(!c.cancel(1));
    c.submit_read(2).unwrap();
    assert_eq!(
        c.wait(1),
        Err(Error::Request(RequestError::NotPending { block: 1 }))
    );
}

// ── Table limits ──────────────────────────────────────────────

#[test]
fn same_address_twice_is_busy() {
    let mut c = client(MockChannel::new());
    c.submit_read(6).unwrap();
    assert_eq!(
        c.submit_write(6, &[0; BLOCK_SIZE]),
        Err(Error::Request(RequestError::AddressBusy { block: 6 }))
    );
    assert_eq!(c.channel_mut().sent.len(), 1);
}

#[test]
fn table_limit_comes_from_config() {
    let cfg = BridgeConfig {
        max_in_flight: 2,
        ..config(50)
    };
    let mut c = BlockClient::new(MockChannel::new(), &cfg);
    c.submit_read(0).unwrap();
    c.submit_read(1).unwrap();
    assert_eq!(
        c.submit_read(2),
        Err(Error::Request(RequestError::TableFull))
    );
}

// ── Drop paths ────────────────────────────────────────────────

#[test]
fn garbage_and_requests_are_dropped_not_fatal() {
    let mut ch = MockChannel::new();
    ch.push_raw(&[0xFF, 1, 2]);
    ch.push_raw(&[3, 0, 0]);
    ch.push(&Message::ReadRequest { block: 8 });
    ch.push(&Message::ReadResult {
        block: 8,
        data: [8; BLOCK_SIZE],
    });
    let mut c = client(ch);

    assert_eq!(c.read_block(8).unwrap(), [8; BLOCK_SIZE]);
    assert_eq!(c.stats().malformed_dropped, 2);
    assert_eq!(c.stats().unexpected_dropped, 1);
}
