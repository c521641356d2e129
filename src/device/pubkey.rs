//! Public key export.
//!
//! The device computes the P-256 public key of a private key slot with
//! GenKey in public-key mode. The raw 64-byte point is wrapped in an X.509
//! SubjectPublicKeyInfo and printed as PEM so it can be registered with the
//! cloud service.

use base64ct::{Base64, Encoding};
use embedded_hal::delay::DelayNs;

use super::crc::{check_packet, crc};
use super::opcode::{Command, RSP_SIZE_64};
use super::transport::Transport;
use super::{CryptoInterface, DeviceError};

/// Raw P-256 public key: X then Y, big endian.
pub const PUBLIC_KEY_SIZE: usize = 64;

/// GenKey mode computing the public key of an existing private key.
pub const GENKEY_MODE_PUBLIC: u8 = 0x00;

/// SubjectPublicKeyInfo prefix for an uncompressed P-256 point.
pub const X509_P256_HEADER: [u8; 27] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01, 0x06, 0x08,
    0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00, 0x04,
];

const DER_SIZE: usize = X509_P256_HEADER.len() + PUBLIC_KEY_SIZE;

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----\r\n";
const PEM_END: &str = "\r\n-----END PUBLIC KEY-----\r\n";

/// Buffer size that always holds the PEM output.
pub const PEM_SIZE_MAX: usize = PEM_BEGIN.len() + (DER_SIZE + 2) / 3 * 4 + PEM_END.len();

/// Public key export errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The device transaction failed.
    Device(DeviceError),
    /// The response was malformed or failed its CRC.
    InvalidResponse,
    /// The output buffer is too small.
    BufferTooSmall,
}

impl From<DeviceError> for Error {
    fn from(err: DeviceError) -> Self {
        Error::Device(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Device(err) => defmt::write!(f, "Device({})", err),
            Error::InvalidResponse => defmt::write!(f, "InvalidResponse"),
            Error::BufferTooSmall => defmt::write!(f, "BufferTooSmall"),
        }
    }
}

/// Read the public key belonging to the private key in `slot`.
pub fn read_public_key<I, D>(
    transport: &mut Transport<I, D>,
    slot: u16,
) -> Result<[u8; PUBLIC_KEY_SIZE], Error>
where
    I: CryptoInterface,
    D: DelayNs,
{
    let slot = slot.to_le_bytes();
    let mut packet = [
        0x07,
        Command::GenKey as u8,
        GENKEY_MODE_PUBLIC,
        slot[0],
        slot[1],
        0x00,
        0x00,
    ];
    let trailer = crc(&packet[..5]);
    packet[5..].copy_from_slice(&trailer);

    let mut rx = [0u8; RSP_SIZE_64 as usize];
    let len = transport.send_and_receive(&packet, &mut rx)?;

    if len != rx.len() || rx[0] as usize != rx.len() || !check_packet(&rx) {
        warn!("pubkey: bad GenKey response, {} bytes", len);
        return Err(Error::InvalidResponse);
    }

    let mut key = [0u8; PUBLIC_KEY_SIZE];
    key.copy_from_slice(&rx[1..1 + PUBLIC_KEY_SIZE]);
    Ok(key)
}

/// Write `key` as a PEM encoded SubjectPublicKeyInfo into `out`.
///
/// # Examples
///
/// ```rust
/// use cryptoauth_kit::device::pubkey::{write_public_key_pem, PEM_SIZE_MAX};
///
/// let mut out = [0u8; PEM_SIZE_MAX];
/// let pem = write_public_key_pem(&[0x11; 64], &mut out).unwrap();
/// assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\r\nMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE"));
/// ```
pub fn write_public_key_pem<'a>(
    key: &[u8; PUBLIC_KEY_SIZE],
    out: &'a mut [u8],
) -> Result<&'a str, Error> {
    if out.len() < PEM_SIZE_MAX {
        return Err(Error::BufferTooSmall);
    }

    let mut der = [0u8; DER_SIZE];
    der[..X509_P256_HEADER.len()].copy_from_slice(&X509_P256_HEADER);
    der[X509_P256_HEADER.len()..].copy_from_slice(key);

    let (begin, rest) = out.split_at_mut(PEM_BEGIN.len());
    begin.copy_from_slice(PEM_BEGIN.as_bytes());

    let body_len = Base64::encode(&der, rest)
        .map_err(|_| Error::BufferTooSmall)?
        .len();

    let end = PEM_BEGIN.len() + body_len;
    out[end..end + PEM_END.len()].copy_from_slice(PEM_END.as_bytes());

    // Only ASCII was written.
    core::str::from_utf8(&out[..end + PEM_END.len()]).map_err(|_| Error::InvalidResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_is_armored_and_sized() {
        let mut out = [0u8; PEM_SIZE_MAX];
        let pem = write_public_key_pem(&[0xAB; PUBLIC_KEY_SIZE], &mut out).unwrap();

        assert_eq!(pem.len(), PEM_SIZE_MAX);
        assert!(pem.starts_with(PEM_BEGIN));
        assert!(pem.ends_with(PEM_END));
    }

    #[test]
    fn pem_rejects_short_buffer() {
        let mut out = [0u8; PEM_SIZE_MAX - 1];
        assert_eq!(
            write_public_key_pem(&[0; PUBLIC_KEY_SIZE], &mut out),
            Err(Error::BufferTooSmall)
        );
    }
}
