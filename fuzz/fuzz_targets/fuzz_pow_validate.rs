#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 32 bytes of hash followed by a 4-byte difficulty.
    if data.len() >= 36 {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&data[..32]);
        let difficulty = u32::from_le_bytes([data[32], data[33], data[34], data[35]]);

        let ok = ringchain_work::validate_work(&hash, difficulty);
        let zeros = ringchain_work::leading_zero_bits(&hash);
        assert_eq!(ok, difficulty <= zeros);

        // Monotonic: an easier target accepts whatever a harder one does.
        if ok && difficulty > 0 {
            assert!(ringchain_work::validate_work(&hash, difficulty - 1));
        }
    }
});
