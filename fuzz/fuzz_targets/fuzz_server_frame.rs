//! Fuzz target: `BlockServer::handle_frame`
//!
//! Feeds arbitrary frames to a server over a small RAM disk. The server
//! must never panic, must answer only well-formed requests, and every
//! reply must be a result for the requested block.
//!
//! cargo fuzz run fuzz_server_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use sdbridge::adapters::mem_disk::MemDisk;
use sdbridge::protocol::codec::decode;
use sdbridge::protocol::server::BlockServer;

fuzz_target!(|data: &[u8]| {
    let mut server = BlockServer::new(MemDisk::new(64));
    let request = decode(data).ok();

    match (request, server.handle_frame(data)) {
        (Some(req), Some(reply)) => {
            assert!(req.kind().is_request());
            let reply = decode(&reply).expect("server reply must decode");
            assert!(!reply.kind().is_request());
            assert_eq!(reply.block(), req.block());
        }
        (Some(req), None) => assert!(!req.kind().is_request()),
        (None, reply) => assert!(reply.is_none()),
    }
});
