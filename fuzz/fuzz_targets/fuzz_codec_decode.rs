#![no_main]

use libfuzzer_sys::fuzz_target;

use serde::de::IgnoredAny;

use ringchain_protocol::{decode, encode, Header};

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes never panics, whatever the target type.
    let _ = decode::<Header>(data);
    let _ = decode::<Vec<u8>>(data);
    let _ = decode::<Option<[u8; 32]>>(data);

    // A decoded record never claims more bytes than it was given.
    if let Ok(Some((_, used))) = decode::<IgnoredAny>(data) {
        assert!(used <= data.len());
    }

    // Records encoded back to back split where they were joined.
    if data.len() >= 8 {
        let val = u64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]);
        let mut bytes = encode(&val).unwrap();
        let first_len = bytes.len();
        bytes.extend(encode(&val).unwrap());

        let (decoded, used) = decode::<u64>(&bytes).unwrap().unwrap();
        assert_eq!(decoded, val);
        assert!(used <= first_len);
    }
});

