#![no_main]

use libfuzzer_sys::fuzz_target;

use ringchain_ledger::{Block, Transaction};
use ringchain_protocol::decode;

fuzz_target!(|data: &[u8]| {
    // Whatever a peer sends, decoding and verifying never panic.
    if let Ok(Some((block, _))) = decode::<Block>(data) {
        let _ = block.verify(0);
        let _ = block.generate_merkle_root();
    }
    if let Ok(Some((tx, _))) = decode::<Transaction>(data) {
        let _ = tx.verify(0);
    }
    let _ = decode::<ringchain_types::BlockHash>(data);
});
