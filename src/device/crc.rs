//! Packet CRC used by CryptoAuthentication devices.
//!
//! CRC-16 with polynomial 0x8005 and a zero seed, data bits fed LSB first
//! into an MSB-first register. The result is appended little endian.

use crc::{Algorithm, Crc};

const CRC_16_ATCA: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x8005,
    init: 0x0000,
    refin: true,
    refout: false,
    xorout: 0x0000,
    check: 0xBCDD,
    residue: 0x0000,
};

const ATCA_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_ATCA);

/// Size of the CRC trailer on every command and response packet.
pub const CRC_SIZE: usize = 2;

/// CRC of `data` in wire order.
pub fn crc(data: &[u8]) -> [u8; CRC_SIZE] {
    ATCA_CRC.checksum(data).to_le_bytes()
}

/// Check the CRC trailer of a counted packet (`packet[0]` is the count).
pub fn check_packet(packet: &[u8]) -> bool {
    let Some(&count) = packet.first() else {
        return false;
    };
    let count = count as usize;
    if count < 1 + CRC_SIZE || count > packet.len() {
        return false;
    }
    let (body, trailer) = packet[..count].split_at(count - CRC_SIZE);
    crc(body) == trailer
}
