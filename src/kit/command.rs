//! Kit command grammar.
//!
//! A received line is parsed once into the enums below and then matched by
//! the engine. Parsing decodes data loads in place, so the parsed command
//! borrows the line it came from.
//!
//! ```text
//! line      = [ "l" *char ":" ] selector [ ":" sub ]
//! selector  = "s" | "e"            device path
//!           | "b"                  board path
//! device    = "t(" hex ")"         talk
//!           | "w" | "s" | "i"      wake, sleep, idle
//!           | "a(" hex ")"         auto-wrap probe
//!           | "p" *char ":" phys
//! phys      = "w" | "c(" hex ")" | "r(" hex ")" | "s" [ "(" hex ")" ]
//! board     = "a(" hex ")" | "v" | "f(" hex ")" | "d(" hex ")"
//! ```
//!
//! The closing parenthesis of a load is optional. Lines are expected to be
//! lower-case already.

use super::error::KitStatus;
use super::packet::extract_data_load;

/// A decoded data load, or why there is none.
pub type Load<'a> = Result<&'a mut [u8], KitStatus>;

/// Top-level command.
#[derive(Debug, PartialEq, Eq)]
pub enum KitCommand<'a> {
    /// Board (`b`) commands, answered by the kit itself.
    Board(BoardCommand<'a>),
    /// Device (`s` or `e`) commands, forwarded to the crypto device.
    Device(DeviceCommand<'a>),
    /// Unknown selector, or a `lib` prefix without `:`.
    Unknown,
}

/// Board sub-commands.
#[derive(Debug, PartialEq, Eq)]
pub enum BoardCommand<'a> {
    /// `a(op, args)`: application command.
    Application(Load<'a>),
    /// `v`: board identification.
    Version,
    /// `f(index)`: firmware and library versions.
    Firmware(Load<'a>),
    /// `d(index)`: discover devices and report one.
    Discover(Load<'a>),
    /// Missing `:` or unknown sub-command.
    Unknown,
}

/// Device sub-commands.
#[derive(Debug, PartialEq, Eq)]
pub enum DeviceCommand<'a> {
    /// No `:` after the selector.
    Empty,
    /// `t(packet)`: send a command and read its response.
    Talk(Load<'a>),
    /// `w`: wake.
    Wake,
    /// `s`: sleep.
    Sleep,
    /// `i`: idle.
    Idle,
    /// `a(flag)`: auto-wrap probe; only the load is validated.
    AutoWrap(Load<'a>),
    /// `p:...`: physical layer access.
    Physical(PhysicalCommand<'a>),
    /// Unknown sub-command.
    Unknown,
}

/// Physical layer sub-commands.
#[derive(Debug, PartialEq, Eq)]
pub enum PhysicalCommand<'a> {
    /// No second `:`.
    Missing,
    /// `w`: wake without reading a response.
    Wake,
    /// `c(packet)`: send a command only.
    Send(Load<'a>),
    /// `r(size)`: receive a pending response.
    Receive(Load<'a>),
    /// `s(address)` selects a device; a bare `s` idles the current one.
    Select(Option<&'a mut [u8]>),
    /// Unknown sub-command.
    Unknown,
}

fn after_colon(bytes: &mut [u8]) -> Option<&mut [u8]> {
    let colon = bytes.iter().position(|&c| c == b':')?;
    Some(&mut bytes[colon + 1..])
}

impl<'a> KitCommand<'a> {
    /// Parse a lower-case line, terminator removed.
    ///
    /// ```rust
    /// use cryptoauth_kit::kit::command::{DeviceCommand, KitCommand};
    ///
    /// let mut line = *b"s:t(07300000)";
    /// match KitCommand::parse(&mut line) {
    ///     KitCommand::Device(DeviceCommand::Talk(Ok(packet))) => {
    ///         assert_eq!(packet, &[0x07, 0x30, 0x00, 0x00])
    ///     }
    ///     other => panic!("unexpected {:?}", other),
    /// }
    /// ```
    pub fn parse(line: &'a mut [u8]) -> Self {
        let line = if line.first() == Some(&b'l') {
            match after_colon(line) {
                Some(rest) => rest,
                None => return KitCommand::Unknown,
            }
        } else {
            line
        };

        match line.first().copied() {
            Some(b's' | b'e') => KitCommand::Device(DeviceCommand::parse(line)),
            Some(b'b') => KitCommand::Board(BoardCommand::parse(line)),
            _ => KitCommand::Unknown,
        }
    }
}

impl<'a> BoardCommand<'a> {
    fn parse(line: &'a mut [u8]) -> Self {
        let Some(sub) = after_colon(line) else {
            return BoardCommand::Unknown;
        };
        match sub.first().copied() {
            Some(b'a') => BoardCommand::Application(extract_data_load(sub)),
            Some(b'v') => BoardCommand::Version,
            Some(b'f') => BoardCommand::Firmware(extract_data_load(sub)),
            Some(b'd') => BoardCommand::Discover(extract_data_load(sub)),
            _ => BoardCommand::Unknown,
        }
    }
}

impl<'a> DeviceCommand<'a> {
    fn parse(line: &'a mut [u8]) -> Self {
        let Some(sub) = after_colon(line) else {
            return DeviceCommand::Empty;
        };
        let Some((token, args)) = sub.split_first_mut() else {
            return DeviceCommand::Unknown;
        };
        match *token {
            b't' => DeviceCommand::Talk(extract_data_load(args)),
            b'w' => DeviceCommand::Wake,
            b's' => DeviceCommand::Sleep,
            b'i' => DeviceCommand::Idle,
            b'a' => DeviceCommand::AutoWrap(extract_data_load(args)),
            b'p' => DeviceCommand::Physical(PhysicalCommand::parse(args)),
            _ => DeviceCommand::Unknown,
        }
    }
}

impl<'a> PhysicalCommand<'a> {
    fn parse(args: &'a mut [u8]) -> Self {
        let Some(sub) = after_colon(args) else {
            return PhysicalCommand::Missing;
        };
        let Some((token, args)) = sub.split_first_mut() else {
            return PhysicalCommand::Unknown;
        };
        match *token {
            b'w' => PhysicalCommand::Wake,
            b'c' => PhysicalCommand::Send(extract_data_load(args)),
            b'r' => PhysicalCommand::Receive(extract_data_load(args)),
            b's' => PhysicalCommand::Select(extract_data_load(args).ok()),
            _ => PhysicalCommand::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lib_prefix_is_skipped() {
        let mut line = *b"lib:s:w";
        assert_eq!(KitCommand::parse(&mut line), KitCommand::Device(DeviceCommand::Wake));

        let mut line = *b"lib";
        assert_eq!(KitCommand::parse(&mut line), KitCommand::Unknown);
    }

    #[test]
    fn unknown_selector() {
        let mut line = *b"x:foo";
        assert_eq!(KitCommand::parse(&mut line), KitCommand::Unknown);

        let mut empty = [0u8; 0];
        assert_eq!(KitCommand::parse(&mut empty), KitCommand::Unknown);
    }

    #[test]
    fn board_needs_colon() {
        let mut line = *b"board";
        assert_eq!(KitCommand::parse(&mut line), KitCommand::Board(BoardCommand::Unknown));
    }

    #[test]
    fn board_firmware_load_is_decoded() {
        let mut line = *b"b:f(03)";
        let mut expected = [0x03];
        assert_eq!(
            KitCommand::parse(&mut line),
            KitCommand::Board(BoardCommand::Firmware(Ok(&mut expected[..])))
        );
    }

    #[test]
    fn board_load_without_parenthesis_is_invalid() {
        let mut line = *b"b:d";
        assert_eq!(
            KitCommand::parse(&mut line),
            KitCommand::Board(BoardCommand::Discover(Err(KitStatus::InvalidParams)))
        );
    }

    #[test]
    fn device_without_colon_is_empty() {
        let mut line = *b"sha204";
        assert_eq!(KitCommand::parse(&mut line), KitCommand::Device(DeviceCommand::Empty));
    }

    #[test]
    fn physical_sub_commands() {
        let mut line = *b"s:p";
        assert_eq!(
            KitCommand::parse(&mut line),
            KitCommand::Device(DeviceCommand::Physical(PhysicalCommand::Missing))
        );

        let mut line = *b"s:physical:s";
        assert_eq!(
            KitCommand::parse(&mut line),
            KitCommand::Device(DeviceCommand::Physical(PhysicalCommand::Select(None)))
        );

        let mut line = *b"s:p:s(c0)";
        let mut address = [0xC0];
        assert_eq!(
            KitCommand::parse(&mut line),
            KitCommand::Device(DeviceCommand::Physical(PhysicalCommand::Select(Some(
                &mut address[..]
            ))))
        );

        let mut line = *b"e:p:x";
        assert_eq!(
            KitCommand::parse(&mut line),
            KitCommand::Device(DeviceCommand::Physical(PhysicalCommand::Unknown))
        );
    }
}
