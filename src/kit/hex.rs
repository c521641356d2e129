//! Hex-ASCII conversion used by the kit protocol.
//!
//! Everything here works in place on caller-owned buffers; nothing allocates.

/// Convert the low nibble of `nibble` to an upper-case hex digit.
///
/// # Examples
///
/// ```rust
/// use cryptoauth_kit::kit::hex::nibble_to_ascii;
///
/// assert_eq!(nibble_to_ascii(0x3), b'3');
/// assert_eq!(nibble_to_ascii(0xB), b'B');
/// assert_eq!(nibble_to_ascii(0xFA), b'A');
/// ```
pub const fn nibble_to_ascii(nibble: u8) -> u8 {
    let nibble = nibble & 0x0F;
    if nibble <= 0x09 {
        nibble + b'0'
    } else {
        nibble + (b'A' - 10)
    }
}

/// Convert a hex digit to its value.
///
/// Characters outside `0-9`, `A-F` and `a-f` yield `0`. That fallback is
/// silent, so it cannot be used to detect malformed input.
pub const fn ascii_to_nibble(ascii: u8) -> u8 {
    match ascii {
        b'0'..=b'9' => ascii - b'0',
        b'A'..=b'F' => ascii - (b'A' - 10),
        b'a'..=b'f' => ascii - (b'a' - 10),
        _ => 0,
    }
}

/// Convert `length` hex characters at the start of `buffer` into binary,
/// writing the bytes back to the start of the same buffer.
///
/// Returns the number of binary bytes written. The length must be even and
/// at least 2; anything else is a no-op returning 0. `length` is clamped to
/// the buffer.
///
/// # Examples
///
/// ```rust
/// use cryptoauth_kit::kit::hex::ascii_to_binary;
///
/// let mut buf = *b"0aFF10";
/// assert_eq!(ascii_to_binary(&mut buf, 6), 3);
/// assert_eq!(&buf[..3], &[0x0A, 0xFF, 0x10]);
/// ```
pub fn ascii_to_binary(buffer: &mut [u8], length: usize) -> usize {
    let length = length.min(buffer.len());
    if length < 2 || length % 2 != 0 {
        return 0;
    }

    let pairs = length / 2;
    for bin_index in 0..pairs {
        let high = ascii_to_nibble(buffer[2 * bin_index]);
        let low = ascii_to_nibble(buffer[2 * bin_index + 1]);
        buffer[bin_index] = (high << 4) | low;
    }

    pairs
}

/// Write `byte` as two upper-case hex digits.
pub(crate) const fn byte_to_ascii(byte: u8) -> [u8; 2] {
    [nibble_to_ascii(byte >> 4), nibble_to_ascii(byte)]
}
