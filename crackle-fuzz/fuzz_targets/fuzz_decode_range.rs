#![no_main]

use libfuzzer_sys::fuzz_target;

// Header layout (4 bytes):
// [0..2]  z_start (i16 LE)
// [2..4]  z_end (i16 LE)
// [4..]   compressed volume

const HEADER_SIZE: usize = 4;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER_SIZE {
        return;
    }

    let z_start = i16::from_le_bytes([data[0], data[1]]) as i64;
    let z_end = i16::from_le_bytes([data[2], data[3]]) as i64;

    let _ = crackle::decode_range(&data[HEADER_SIZE..], z_start, z_end);
});
