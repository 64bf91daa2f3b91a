//! Integration tests for the real-time-core server.
//!
//! Drives `BlockServer` through a mock channel: one reply per request,
//! bounds checked before the medium is touched, and the run loop's two
//! exit paths.

use core::time::Duration;
use std::sync::atomic::AtomicBool;

use sdbridge::adapters::file_disk::FileDisk;
use sdbridge::adapters::mem_disk::MemDisk;
use sdbridge::error::{ChannelFault, Error};
use sdbridge::protocol::codec::{
    BLOCK_SIZE, Message, RESULT_IO_ERROR, RESULT_OK, RESULT_OUT_OF_RANGE, decode,
};
use sdbridge::protocol::server::BlockServer;

use crate::mock_channel::{FailingDisk, MockChannel};

fn served(server_blocks: u32, requests: &[Message]) -> (Vec<Message>, BlockServer<MemDisk>) {
    let mut ch = MockChannel::with_replies(requests);
    let mut server = BlockServer::new(MemDisk::new(server_blocks));
    for _ in requests {
        assert!(server.serve_next(&mut ch, Duration::ZERO).unwrap());
    }
    (ch.sent_messages(), server)
}

#[test]
fn one_reply_per_request_in_order() {
    let (replies, server) = served(
        128,
        &[
            Message::WriteRequest {
                block: 100,
                data: [0xAB; BLOCK_SIZE],
            },
            Message::ReadRequest { block: 100 },
            Message::ReadRequest { block: 101 },
        ],
    );

    assert_eq!(
        replies,
        vec![
            Message::WriteResult {
                block: 100,
                result: RESULT_OK
            },
            Message::ReadResult {
                block: 100,
                data: [0xAB; BLOCK_SIZE]
            },
            Message::ReadResult {
                block: 101,
                data: [0; BLOCK_SIZE]
            },
        ]
    );
    assert_eq!(server.stats().reads, 2);
    assert_eq!(server.stats().writes, 1);
}

#[test]
fn out_of_range_is_rejected_before_the_medium() {
    let (replies, server) = served(
        8,
        &[
            Message::WriteRequest {
                block: 8,
                data: [1; BLOCK_SIZE],
            },
            Message::ReadRequest { block: 9 },
        ],
    );

    assert_eq!(
        replies,
        vec![
            Message::WriteResult {
                block: 8,
                result: RESULT_OUT_OF_RANGE
            },
            Message::ReadFailed {
                block: 9,
                result: RESULT_OUT_OF_RANGE
            },
        ]
    );
    assert_eq!(server.device().writes(), 0);
    assert_eq!(server.device().reads(), 0);
}

#[test]
fn failing_medium_reports_io_error() {
    let mut ch = MockChannel::with_replies(&[
        Message::ReadRequest { block: 0 },
        Message::WriteRequest {
            block: 1,
            data: [0; BLOCK_SIZE],
        },
    ]);
    let mut server = BlockServer::new(FailingDisk::new(4));
    server.serve_next(&mut ch, Duration::ZERO).unwrap();
    server.serve_next(&mut ch, Duration::ZERO).unwrap();

    assert_eq!(
        ch.sent_messages(),
        vec![
            Message::ReadFailed {
                block: 0,
                result: RESULT_IO_ERROR
            },
            Message::WriteResult {
                block: 1,
                result: RESULT_IO_ERROR
            },
        ]
    );
    assert_eq!(server.device().attempts, 2);
    assert_eq!(server.stats().io_failures, 2);
}

#[test]
fn malformed_frames_get_no_reply() {
    let mut ch = MockChannel::new();
    ch.push_raw(&[1, 0, 0, 0, 0, 0xAA]);
    ch.push_raw(&[0x42; 9]);
    let mut server = BlockServer::new(MemDisk::new(4));

    assert!(server.serve_next(&mut ch, Duration::ZERO).unwrap());
    assert!(server.serve_next(&mut ch, Duration::ZERO).unwrap());
    assert!(ch.sent.is_empty());
    assert_eq!(server.stats().malformed_dropped, 2);
    assert_eq!(server.device().writes(), 0);
}

#[test]
fn idle_channel_returns_false() {
    let mut ch = MockChannel::new();
    let mut server = BlockServer::new(MemDisk::new(4));
    assert!(!server.serve_next(&mut ch, Duration::from_millis(1)).unwrap());
}

#[test]
fn run_exits_on_disconnect_after_draining() {
    let mut ch = MockChannel::with_replies(&[Message::ReadRequest { block: 2 }]);
    ch.hang_up_when_drained = true;
    let mut server = BlockServer::new(MemDisk::new(4));
    let stop = AtomicBool::new(false);

    server.run(&mut ch, &stop).unwrap();
    assert_eq!(ch.sent.len(), 1);
    assert_eq!(server.stats().reads, 1);
}

#[test]
fn run_returns_immediately_when_stopped() {
    let mut ch = MockChannel::with_replies(&[Message::ReadRequest { block: 2 }]);
    let mut server = BlockServer::new(MemDisk::new(4));
    let stop = AtomicBool::new(true);

    server.run(&mut ch, &stop).unwrap();
    assert_eq!(ch.pending_inbound(), 1, "no frame may be consumed");
}

#[test]
fn send_fault_propagates_from_serve_next() {
    let mut ch = MockChannel::with_replies(&[Message::ReadRequest { block: 0 }]);
    ch.send_fault = Some(ChannelFault::QueueFull);
    let mut server = BlockServer::new(MemDisk::new(4));

    assert_eq!(
        server.serve_next(&mut ch, Duration::ZERO),
        Err(Error::Channel(ChannelFault::QueueFull))
    );
}

#[test]
fn serves_a_disk_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("card.img");
    let disk = FileDisk::create(&path, 32).unwrap();
    let mut server = BlockServer::new(disk);

    let reply = server
        .handle_frame(
            &Message::WriteRequest {
                block: 31,
                data: [0x31; BLOCK_SIZE],
            }
            .encode(),
        )
        .unwrap();
    assert_eq!(
        decode(&reply),
        Ok(Message::WriteResult {
            block: 31,
            result: RESULT_OK
        })
    );
    drop(server);

    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[31 * BLOCK_SIZE..], &[0x31; BLOCK_SIZE][..]);
}
