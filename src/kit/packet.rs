//! Kit protocol packet framing.
//!
//! Responses travel as `<status>(<data>)\n`, every byte written as two
//! upper-case hex digits. Framing runs in place and back to front: the
//! caller places the status byte and binary payload at the start of a buffer
//! and [`build_response_packet`] expands them into ASCII in the same buffer.
//!
//! ```text
//!  binary   [ st | d0 | d1 ]
//!  ascii    [ S  S  (  D  0  D  1  )  \n ]
//! ```

use super::error::KitStatus;
use super::hex::{ascii_to_binary, byte_to_ascii};

/// End-of-packet character for commands and responses.
pub const KIT_EOP: u8 = b'\n';

/// Characters in a response besides the hex payload: two status digits,
/// `(`, `)` and the terminator.
pub const KIT_RESPONSE_COUNT_NO_DATA: usize = 5;

/// Every binary byte becomes two ASCII characters.
pub const KIT_CHARS_PER_BYTE: usize = 2;

/// Size of the engine's transmit buffer.
pub const TX_BUFFER_SIZE: usize = 2300;

/// Largest binary length (status byte included) whose framed form still
/// fits into [`TX_BUFFER_SIZE`].
pub const MAX_RESPONSE_PAYLOAD: usize =
    (TX_BUFFER_SIZE - KIT_RESPONSE_COUNT_NO_DATA) / KIT_CHARS_PER_BYTE;

/// Number of ASCII bytes a binary response of `length` bytes (status byte
/// included) occupies once framed.
pub const fn framed_len(length: usize) -> usize {
    KIT_CHARS_PER_BYTE * (length - 1) + KIT_RESPONSE_COUNT_NO_DATA
}

/// Frame `buffer[..length]` in place.
///
/// `buffer[0]` is the status byte, `buffer[1..length]` the payload. The
/// buffer needs room for [`framed_len`]`(length)` bytes. Returns the ASCII
/// length, or 0 if `length` is 0 or the buffer is too small.
///
/// # Examples
///
/// ```rust
/// use cryptoauth_kit::kit::packet::build_response_packet;
///
/// let mut buf = [0u8; 16];
/// buf[..3].copy_from_slice(&[0x00, 0xAB, 0xCD]);
/// let len = build_response_packet(&mut buf, 3);
/// assert_eq!(&buf[..len], b"00(ABCD)\n");
/// ```
pub fn build_response_packet(buffer: &mut [u8], length: usize) -> usize {
    if length == 0 {
        return 0;
    }
    let ascii_length = framed_len(length);
    if ascii_length > buffer.len() {
        return 0;
    }

    let mut ascii_index = ascii_length - 1;

    buffer[ascii_index] = KIT_EOP;
    ascii_index -= 1;
    buffer[ascii_index] = b')';

    // Byte i lands at 2i + 1 and 2i + 2, so walking backwards never
    // overwrites a byte that is still to be read.
    for bin_index in (1..length).rev() {
        let [high, low] = byte_to_ascii(buffer[bin_index]);
        ascii_index -= 1;
        buffer[ascii_index] = low;
        ascii_index -= 1;
        buffer[ascii_index] = high;
    }

    ascii_index -= 1;
    buffer[ascii_index] = b'(';

    let [high, low] = byte_to_ascii(buffer[0]);
    buffer[1] = low;
    buffer[0] = high;

    ascii_length
}

/// Frame a binary response for transmission, truncating it when it would
/// overflow the transmit buffer.
///
/// An oversized response is cut to [`MAX_RESPONSE_PAYLOAD`] bytes and its
/// status byte replaced with [`KitStatus::TxOverflow`]; the host still gets a
/// well-formed packet.
pub fn convert_for_transmit(buffer: &mut [u8], length: usize) -> usize {
    let mut length = length;
    if length > MAX_RESPONSE_PAYLOAD {
        warn!("kit: response of {} bytes truncated", length);
        buffer[0] = KitStatus::TxOverflow.code();
        length = MAX_RESPONSE_PAYLOAD;
    }
    build_response_packet(buffer, length)
}

/// Locate the parenthesised hex load in `command`, decode it in place and
/// return the binary bytes.
///
/// A missing `)` is tolerated: everything after `(` is taken as the load.
/// Without `(` the command carries no load and
/// [`KitStatus::InvalidParams`] is returned.
///
/// # Examples
///
/// ```rust
/// use cryptoauth_kit::kit::packet::extract_data_load;
///
/// let mut cmd = *b"t(01020304)";
/// assert_eq!(extract_data_load(&mut cmd).unwrap(), &[1, 2, 3, 4]);
///
/// let mut open = *b"t(0102";
/// assert_eq!(extract_data_load(&mut open).unwrap(), &[1, 2]);
/// ```
pub fn extract_data_load(command: &mut [u8]) -> Result<&mut [u8], KitStatus> {
    let open = command
        .iter()
        .position(|&c| c == b'(')
        .ok_or(KitStatus::InvalidParams)?;

    let load = &mut command[open + 1..];
    let ascii_length = load
        .iter()
        .position(|&c| c == b')')
        .unwrap_or(load.len());

    let binary_length = ascii_to_binary(load, ascii_length);
    Ok(&mut load[..binary_length])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_packet_has_empty_parentheses() {
        let mut buf = [0u8; KIT_RESPONSE_COUNT_NO_DATA];
        buf[0] = 0x00;
        assert_eq!(build_response_packet(&mut buf, 1), 5);
        assert_eq!(&buf, b"00()\n");
    }

    #[test]
    fn status_byte_is_hex_encoded() {
        let mut buf = [0u8; 8];
        buf[0] = KitStatus::NoDevice.code();
        let len = build_response_packet(&mut buf, 1);
        assert_eq!(&buf[..len], b"C5()\n");
    }

    #[test]
    fn payload_is_framed_in_order() {
        let mut buf = [0u8; 32];
        buf[..5].copy_from_slice(&[0x00, 0x07, 0x00, 0x00, 0x50]);
        let len = build_response_packet(&mut buf, 5);
        assert_eq!(&buf[..len], b"00(07000050)\n");
    }

    #[test]
    fn short_buffer_is_refused() {
        let mut buf = [0u8; 8];
        assert_eq!(build_response_packet(&mut buf, 3), 0);
        assert_eq!(build_response_packet(&mut buf, 0), 0);
    }

    #[test]
    fn oversized_response_is_truncated_with_overflow_status() {
        let mut buf = [0u8; TX_BUFFER_SIZE];
        let len = convert_for_transmit(&mut buf, MAX_RESPONSE_PAYLOAD + 10);
        assert_eq!(len, framed_len(MAX_RESPONSE_PAYLOAD));
        assert!(len <= TX_BUFFER_SIZE);
        assert_eq!(&buf[..3], b"C2(");
        assert_eq!(buf[len - 1], KIT_EOP);
    }

    #[test]
    fn command_without_load_is_rejected() {
        let mut cmd = *b"b:f";
        assert_eq!(extract_data_load(&mut cmd), Err(KitStatus::InvalidParams));
    }

    #[test]
    fn empty_load_decodes_to_nothing() {
        let mut cmd = *b"b:f()";
        assert_eq!(extract_data_load(&mut cmd).unwrap().len(), 0);
    }

    #[test]
    fn odd_length_load_decodes_to_nothing() {
        let mut cmd = *b"s:a(012)";
        assert_eq!(extract_data_load(&mut cmd).unwrap().len(), 0);
    }
}
