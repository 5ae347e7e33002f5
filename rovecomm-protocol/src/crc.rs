//! Payload checksum
//!
//! RoveComm-Serial frames carry a 16-bit checksum computed over the payload
//! bytes only. The rolling function below is the table-free byte-wise form
//! of CRC-16/IBM-3740 (poly 0x1021, init 0xFFFF, no reflection, no final
//! XOR). Deployed boards compute exactly this, so it must not change.

/// Initial accumulator value
pub const CRC_INIT: u16 = 0xFFFF;

/// Compute the checksum of `data`
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(CRC_INIT, |crc, &byte| crc16_update(crc, byte))
}

/// Fold one byte into a running checksum
#[inline]
pub fn crc16_update(crc: u16, byte: u8) -> u16 {
    let mut x = (crc >> 8) as u8 ^ byte;
    x ^= x >> 4;
    let x = x as u16;
    (crc << 8) ^ (x << 12) ^ (x << 5) ^ x
}
