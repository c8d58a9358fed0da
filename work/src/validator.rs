//! PoW validation.

/// Hashes are 256 bits wide; no hash can have more leading zeros.
pub const MAX_DIFFICULTY: u32 = 256;

/// Number of leading zero bits in a 32-byte hash.
pub fn leading_zero_bits(hash: &[u8; 32]) -> u32 {
    let mut bits = 0;
    for byte in hash {
        if *byte == 0 {
            bits += 8;
            continue;
        }
        return bits + byte.leading_zeros();
    }
    bits
}

/// Whether `hash` satisfies `difficulty` (leading zero bits).
///
/// Difficulty 0 accepts every hash. Monotonic: anything accepted at `d` is
/// accepted at every `d' < d`.
pub fn validate_work(hash: &[u8; 32], difficulty: u32) -> bool {
    leading_zero_bits(hash) >= difficulty
}
