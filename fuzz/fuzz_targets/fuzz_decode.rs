//! Fuzz target: `codec::decode`
//!
//! Arbitrary bytes must either be rejected or decode to a message that
//! re-encodes to its own shape and decodes back to itself.
//!
//! cargo fuzz run fuzz_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use sdbridge::protocol::codec::{Message, decode};

fuzz_target!(|data: &[u8]| {
    let Ok(msg) = decode(data) else {
        return;
    };

    let frame = msg.encode();
    assert_eq!(frame.len(), msg.frame_len());
    assert!(frame.len() <= data.len(), "decoded past the input");
    assert_eq!(decode(&frame).as_ref(), Ok(&msg));

    // Everything but the ignored request result word is carried verbatim.
    if !matches!(msg, Message::ReadRequest { .. }) {
        assert_eq!(&frame[..], &data[..frame.len()]);
    }
});
