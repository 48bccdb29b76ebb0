//! The CRC32 variant the NRPE v2 packet format uses for its integrity field.

use once_cell::sync::Lazy;

/// The reflected IEEE polynomial, as used by the reference agent.
const POLY: u32 = 0xEDB8_8320;

static CRC32_TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0_u32; 256];

    for (i, slot) in table.iter_mut().enumerate() {
        let mut crc = i as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
        }
        *slot = crc;
    }

    table
});

/// Computes the CRC32 of `buf` (init `0xFFFFFFFF`, final XOR `0xFFFFFFFF`,
/// right-shifting table variant).
///
/// Packets store the checksum of their entire 1036 bytes, computed with the
/// 4-byte CRC field itself zeroed.
pub(crate) fn checksum(buf: &[u8]) -> u32 {
    let mut crc = u32::MAX;

    for &byte in buf {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }

    crc ^ u32::MAX
}
