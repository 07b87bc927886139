#![no_main]

use dlock_proto::{Frame, decode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok((event, payload)) = decode(data) else {
        return;
    };

    // Anything that decodes must re-encode to a prefix of the input
    let frame = match payload {
        Some(payload) => Frame::new(event, payload).expect("decoded payload is encodable"),
        None => Frame::control(event),
    };
    let encoded = frame.to_bytes();
    assert!(data.starts_with(&encoded[..1]));
    if frame.payload().is_some() {
        assert_eq!(&data[..encoded.len()], &encoded[..]);
    }
});
