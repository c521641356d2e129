//! Kit protocol engine.
//!
//! [`KitEngine`] owns everything a dispatch cycle touches: the device
//! transport, the discovered device table, the clock the board `a` command
//! sets and the transmit buffer responses are framed in. One call to
//! [`KitEngine::process_line`] parses a line, runs it to completion and
//! returns the framed response.
//!
//! Device path responses are binary: the status byte goes in front of the
//! device bytes and the whole buffer is framed. Board path responses start
//! with plain ASCII (a name, an interface) followed by the framed status and
//! payload, e.g. `ECC108 TWI 00(C0)\n`.

use embedded_hal::delay::DelayNs;
use heapless::spsc::Consumer;

use super::command::{BoardCommand, DeviceCommand, KitCommand, PhysicalCommand};
use super::error::KitStatus;
use super::packet::{build_response_packet, convert_for_transmit, KIT_EOP, TX_BUFFER_SIZE};
use crate::config::{firmware_version, KIT_HOLDOFF_MS};
use crate::device::{
    discover, BusType, CryptoInterface, DeviceError, DeviceTable, DeviceType, Transport,
};
use crate::system::holdoff::Holdoff;
use crate::system::time::{Clock, DateTime};
use crate::usb::{send_response, HidReport, ReceivedLine};

/// Board application opcode setting the clock.
pub const APP_SET_TIME: u8 = 0x00;

/// Kit protocol context.
#[derive(Debug)]
pub struct KitEngine<'a, I, D, C> {
    transport: Transport<I, D>,
    clock: C,
    devices: DeviceTable,
    lock: &'a Holdoff,
    tx: [u8; TX_BUFFER_SIZE],
}

impl<'a, I, D, C> KitEngine<'a, I, D, C>
where
    I: CryptoInterface,
    D: DelayNs,
    C: Clock,
{
    /// Serve the device behind `transport`.
    ///
    /// `lock` is armed for [`KIT_HOLDOFF_MS`] whenever a line arrives through
    /// [`poll`](Self::poll).
    pub fn new(transport: Transport<I, D>, clock: C, lock: &'a Holdoff) -> Self {
        Self {
            transport,
            clock,
            devices: DeviceTable::new(),
            lock,
            tx: [0; TX_BUFFER_SIZE],
        }
    }

    /// The device transport.
    pub fn transport(&mut self) -> &mut Transport<I, D> {
        &mut self.transport
    }

    /// Devices found by the last discovery.
    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /// Scan for devices without waiting for a board `d` command.
    pub fn discover(&mut self) -> Result<(), DeviceError> {
        discover(&mut self.transport, &mut self.devices).map(|_| ())
    }

    /// Handle one queued line, if any, and send the response.
    ///
    /// Arms the kit holdoff before touching the device. Returns whether a
    /// line was handled.
    pub fn poll<H: HidReport, const N: usize>(
        &mut self,
        lines: &mut Consumer<'_, ReceivedLine, N>,
        hid: &mut H,
    ) -> bool {
        let Some(mut line) = lines.dequeue() else {
            return false;
        };
        self.lock.arm(KIT_HOLDOFF_MS);

        let len = if line.overflow {
            warn!("kit: line overflow, {} bytes kept", line.data.len());
            self.status_only(KitStatus::RxOverflow.code())
        } else {
            self.dispatch(&mut line.data)
        };

        if !send_response(hid, self.transport.delay_mut(), &self.tx[..len]) {
            warn!("kit: response of {} bytes not sent", len);
        }
        true
    }

    /// Process one line and return the framed response.
    ///
    /// A trailing terminator is ignored. The line is lower-cased and its
    /// data load decoded in place.
    pub fn process_line(&mut self, line: &mut [u8]) -> &[u8] {
        let len = self.dispatch(line);
        &self.tx[..len]
    }

    fn dispatch(&mut self, line: &mut [u8]) -> usize {
        self.tx.fill(0);

        let line = if line.last() == Some(&KIT_EOP) {
            let end = line.len() - 1;
            &mut line[..end]
        } else {
            line
        };
        line.make_ascii_lowercase();

        match KitCommand::parse(line) {
            KitCommand::Device(command) => self.device(command),
            KitCommand::Board(command) => self.board(command),
            KitCommand::Unknown => self.status_only(KitStatus::UnknownCommand.code()),
        }
    }

    fn status_only(&mut self, status: u8) -> usize {
        self.tx[0] = status;
        build_response_packet(&mut self.tx, 1)
    }

    fn device(&mut self, command: DeviceCommand<'_>) -> usize {
        let (status, len) = match self.run_device(command) {
            Ok(len) => (KitStatus::Success.code(), len),
            Err(status) => (status, 0),
        };
        if status != KitStatus::Success.code() {
            debug!("kit: device command failed with {}", status);
        }

        self.tx[0] = status;
        convert_for_transmit(&mut self.tx, len + 1)
    }

    /// Run a device command, leaving its response at `tx[1..]`.
    ///
    /// Returns the response length taken from the device's count byte.
    fn run_device(&mut self, command: DeviceCommand<'_>) -> Result<usize, u8> {
        match command {
            DeviceCommand::Empty => Ok(0),
            DeviceCommand::Talk(packet) => {
                let packet = packet?;
                self.transport.send_and_receive(packet, &mut self.tx[1..])?;
                Ok(self.tx[1] as usize)
            }
            DeviceCommand::Wake => Ok(self.transport.wake().map(|_| 0)?),
            DeviceCommand::Sleep => Ok(self.transport.sleep().map(|_| 0)?),
            DeviceCommand::Idle => Ok(self.transport.idle().map(|_| 0)?),
            DeviceCommand::AutoWrap(flag) => flag.map(|_| 0).map_err(u8::from),
            DeviceCommand::Physical(command) => self.run_physical(command),
            DeviceCommand::Unknown => Err(KitStatus::UnknownCommand.code()),
        }
    }

    fn run_physical(&mut self, command: PhysicalCommand<'_>) -> Result<usize, u8> {
        match command {
            PhysicalCommand::Missing => Ok(0),
            PhysicalCommand::Wake => Ok(self.transport.wake().map(|_| 0)?),
            PhysicalCommand::Send(packet) => {
                self.transport.send_only(packet?)?;
                Ok(0)
            }
            PhysicalCommand::Receive(size) => {
                let size = *size?.first().ok_or(KitStatus::InvalidParams)?;
                self.transport.receive_only(size as usize, &mut self.tx[1..])?;
                Ok(self.tx[1] as usize)
            }
            PhysicalCommand::Select(Some(address)) => {
                let address = *address.first().ok_or(KitStatus::InvalidParams)?;
                self.transport.select(address);
                Ok(0)
            }
            PhysicalCommand::Select(None) => Ok(self.transport.idle().map(|_| 0)?),
            PhysicalCommand::Unknown => Err(KitStatus::UnknownCommand.code()),
        }
    }

    fn board(&mut self, command: BoardCommand<'_>) -> usize {
        let mut prefix = 0;
        let (status, len) = match self.run_board(command, &mut prefix) {
            Ok(len) => (KitStatus::Success.code(), len),
            Err(status) => (status, 0),
        };

        self.tx[prefix] = status;
        prefix + build_response_packet(&mut self.tx[prefix..], len + 1)
    }

    /// Run a board command. ASCII goes to `tx[..*prefix]`, the binary
    /// payload right after the status slot at `tx[*prefix]`.
    fn run_board(&mut self, command: BoardCommand<'_>, prefix: &mut usize) -> Result<usize, u8> {
        match command {
            BoardCommand::Application(load) => {
                self.application(load?)?;
                Ok(0)
            }
            BoardCommand::Version | BoardCommand::Unknown => Err(KitStatus::UnknownCommand.code()),
            BoardCommand::Firmware(load) => {
                let index = *load?.first().ok_or(KitStatus::InvalidParams)?;
                let (name, version) = firmware_version(index).ok_or(KitStatus::InvalidParams)?;

                *prefix = self.write_ascii(0, name);
                self.tx[*prefix + 1..*prefix + 1 + version.len()].copy_from_slice(&version);
                Ok(version.len())
            }
            BoardCommand::Discover(load) => {
                let index = *load?.first().ok_or(KitStatus::InvalidParams)?;

                if let Err(err) = discover(&mut self.transport, &mut self.devices) {
                    debug!("kit: discovery failed with {}", err.code());
                }
                let info = *self
                    .devices
                    .get(index as usize)
                    .ok_or(KitStatus::NoDevice)?;

                *prefix = self.write_ascii(0, info.device_type.kit_name());
                if info.device_type == DeviceType::Unknown {
                    return Err(KitStatus::NoDevice.code());
                }

                if info.bus_type == BusType::Unknown {
                    return Ok(0);
                }

                *prefix = self.write_ascii(*prefix, info.bus_type.kit_name());
                self.tx[*prefix + 1] = info.selector();
                Ok(1)
            }
        }
    }

    fn application(&mut self, load: &[u8]) -> Result<(), DeviceError> {
        let (&opcode, record) = load.split_first().ok_or(DeviceError::BadParam)?;
        match opcode {
            APP_SET_TIME => {
                let datetime = DateTime::from_packed(record).ok_or(DeviceError::ParseError)?;
                self.clock.set(&datetime);
                Ok(())
            }
            _ => Err(DeviceError::ParseError),
        }
    }

    /// Copy `text` to `tx[at..]`, returning the index after it.
    fn write_ascii(&mut self, at: usize, text: &str) -> usize {
        let end = at + text.len();
        self.tx[at..end].copy_from_slice(text.as_bytes());
        end
    }
}
