//! Command table: opcode to expected response size and execution time.

/// Response carrying a single status byte.
pub const RSP_SIZE_MIN: u16 = 4;
/// Response carrying four data bytes.
pub const RSP_SIZE_4: u16 = 7;
/// Response carrying 32 data bytes.
pub const RSP_SIZE_32: u16 = 35;
/// Response carrying 64 data bytes.
pub const RSP_SIZE_64: u16 = 67;

/// GenKey mode producing only a digest.
pub const GENKEY_MODE_DIGEST: u8 = 0x08;
/// Nonce mode loading a caller-supplied value.
pub const NONCE_MODE_PASSTHROUGH: u8 = 0x03;
/// Read zone bit selecting a 32-byte read.
pub const READ_ZONE_32: u8 = 0x80;
/// SHA mode finishing the digest.
pub const SHA_MODE_END: u8 = 0x02;

/// Device commands the kit knows how to size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Verify a MAC computed elsewhere.
    CheckMac = 0x28,
    /// Increment or read a monotonic counter.
    Counter = 0x24,
    /// Derive a key into a slot.
    DeriveKey = 0x1C,
    /// ECDH key agreement.
    Ecdh = 0x43,
    /// Combine a slot value into TempKey.
    GenDig = 0x15,
    /// Generate a key pair or compute a public key.
    GenKey = 0x40,
    /// HMAC/SHA-256 digest.
    Hmac = 0x11,
    /// Revision and state information.
    Info = 0x30,
    /// Lock a zone or slot.
    Lock = 0x17,
    /// SHA-256 MAC.
    Mac = 0x08,
    /// Load TempKey from a nonce.
    Nonce = 0x16,
    /// Put devices not matching the selector into idle.
    Pause = 0x01,
    /// Write a private key.
    PrivWrite = 0x46,
    /// Random number.
    Random = 0x1B,
    /// Read 4 or 32 bytes.
    Read = 0x02,
    /// SHA-256 hashing.
    Sha = 0x47,
    /// ECDSA signature.
    Sign = 0x41,
    /// Update the extra configuration bytes.
    UpdateExtra = 0x20,
    /// ECDSA verify.
    Verify = 0x45,
    /// Write 4 or 32 bytes.
    Write = 0x12,
}

impl Command {
    /// Look up a command by opcode.
    pub const fn from_opcode(opcode: u8) -> Option<Self> {
        Some(match opcode {
            0x28 => Command::CheckMac,
            0x24 => Command::Counter,
            0x1C => Command::DeriveKey,
            0x43 => Command::Ecdh,
            0x15 => Command::GenDig,
            0x40 => Command::GenKey,
            0x11 => Command::Hmac,
            0x30 => Command::Info,
            0x17 => Command::Lock,
            0x08 => Command::Mac,
            0x16 => Command::Nonce,
            0x01 => Command::Pause,
            0x46 => Command::PrivWrite,
            0x1B => Command::Random,
            0x02 => Command::Read,
            0x47 => Command::Sha,
            0x41 => Command::Sign,
            0x20 => Command::UpdateExtra,
            0x45 => Command::Verify,
            0x12 => Command::Write,
            _ => return None,
        })
    }

    /// Opcode byte.
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Expected response length for this command given `param1`.
    pub const fn response_len(self, param1: u8) -> u16 {
        match self {
            Command::CheckMac
            | Command::DeriveKey
            | Command::GenDig
            | Command::Lock
            | Command::Pause
            | Command::PrivWrite
            | Command::UpdateExtra
            | Command::Verify
            | Command::Write => RSP_SIZE_MIN,
            Command::Counter | Command::Info => RSP_SIZE_4,
            Command::Ecdh | Command::Hmac | Command::Mac | Command::Random => RSP_SIZE_32,
            Command::Sign => RSP_SIZE_64,
            Command::GenKey => {
                if param1 == GENKEY_MODE_DIGEST {
                    RSP_SIZE_MIN
                } else {
                    RSP_SIZE_64
                }
            }
            Command::Nonce => {
                if param1 == NONCE_MODE_PASSTHROUGH {
                    RSP_SIZE_MIN
                } else {
                    RSP_SIZE_32
                }
            }
            Command::Read => {
                if param1 & READ_ZONE_32 != 0 {
                    RSP_SIZE_32
                } else {
                    RSP_SIZE_4
                }
            }
            Command::Sha => {
                if param1 == SHA_MODE_END {
                    RSP_SIZE_32
                } else {
                    RSP_SIZE_MIN
                }
            }
        }
    }

    /// Maximum execution time in milliseconds (ECC508A datasheet).
    pub const fn execution_time_ms(self) -> u32 {
        match self {
            Command::CheckMac => 13,
            Command::Counter => 20,
            Command::DeriveKey => 50,
            Command::Ecdh => 58,
            Command::GenDig => 11,
            Command::GenKey => 115,
            Command::Hmac => 23,
            Command::Info => 1,
            Command::Lock => 32,
            Command::Mac => 14,
            Command::Nonce => 7,
            Command::Pause => 3,
            Command::PrivWrite => 48,
            Command::Random => 23,
            Command::Read => 1,
            Command::Sha => 9,
            Command::Sign => 60,
            Command::UpdateExtra => 10,
            Command::Verify => 72,
            Command::Write => 26,
        }
    }
}

/// Result of a command table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    /// The command the packet carries.
    pub command: Command,
    /// Exact number of bytes the device will answer with.
    pub response_len: u16,
}

/// Look up the command carried by a counted packet.
///
/// Byte 1 is the opcode and byte 2 is param1. Unknown opcodes and packets
/// too short to carry both return `None`; no response bound exists for them.
///
/// # Examples
///
/// ```rust
/// use cryptoauth_kit::device::opcode::{command_info, Command};
///
/// // Read, 32-byte zone bit set
/// let info = command_info(&[0x07, 0x02, 0x82, 0x00, 0x00]).unwrap();
/// assert_eq!(info.command, Command::Read);
/// assert_eq!(info.response_len, 35);
/// ```
pub fn command_info(packet: &[u8]) -> Option<CommandInfo> {
    let (&opcode, &param1) = (packet.get(1)?, packet.get(2)?);
    let command = Command::from_opcode(opcode)?;
    Some(CommandInfo {
        command,
        response_len: command.response_len(param1),
    })
}

/// Maximum execution time for a raw opcode.
pub fn execution_time_ms(opcode: u8) -> Option<u32> {
    Command::from_opcode(opcode).map(Command::execution_time_ms)
}
