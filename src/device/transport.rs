//! Wake / send / delay / receive / idle sequencing around a device.
//!
//! Every operation that manages to wake the device idles it again before
//! returning, whether or not the steps in between succeeded. The first
//! failure wins: an idle failure is only reported when everything before it
//! succeeded. There is no retry at this layer.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use super::opcode::{command_info, CommandInfo};
use super::{CryptoInterface, DeviceError, COMMAND_SIZE_MAX};

/// Command packet plus the interface prefix slot.
pub const FRAME_SIZE_MAX: usize = COMMAND_SIZE_MAX + 1;

/// Sequencing layer between the kit protocol and a [`CryptoInterface`].
#[derive(Debug)]
pub struct Transport<I, D> {
    interface: I,
    delay: D,
}

impl<I: CryptoInterface, D: DelayNs> Transport<I, D> {
    /// Wrap an interface and a delay provider.
    pub fn new(interface: I, delay: D) -> Self {
        Self { interface, delay }
    }

    /// The underlying interface.
    pub fn interface(&self) -> &I {
        &self.interface
    }

    /// The underlying interface, mutably.
    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.interface
    }

    /// The delay provider, for callers that need to pace other work.
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Give back the interface and the delay provider.
    pub fn release(self) -> (I, D) {
        (self.interface, self.delay)
    }

    /// Wake the device.
    pub fn wake(&mut self) -> Result<(), DeviceError> {
        self.interface.wake()
    }

    /// Idle the device.
    pub fn idle(&mut self) -> Result<(), DeviceError> {
        self.interface.idle()
    }

    /// Put the device to sleep.
    pub fn sleep(&mut self) -> Result<(), DeviceError> {
        self.interface.sleep()
    }

    /// Talk to another device on the same bus.
    pub fn select(&mut self, address: u8) {
        debug!("transport: selecting address {}", address);
        self.interface.set_address(address);
    }

    /// Send a counted command packet and receive its response into `rx`.
    ///
    /// The response length comes from the command table, so `rx` must hold
    /// at least that many bytes. Returns the number of bytes received.
    pub fn send_and_receive(&mut self, packet: &[u8], rx: &mut [u8]) -> Result<usize, DeviceError> {
        let (mut frame, info) = Self::frame(packet)?;
        let exec_ms = self.interface.execution_time_ms(info.command.opcode())?;

        let rx_len = info.response_len as usize;
        if rx.len() < rx_len {
            return Err(DeviceError::SmallBuffer);
        }

        trace!(
            "transport: talk opcode {} exec {} ms rx {}",
            info.command.opcode(),
            exec_ms,
            rx_len
        );

        self.awake(|interface, delay| {
            interface.send(&mut frame)?;
            delay.delay_ms(exec_ms);
            interface.receive(&mut rx[..rx_len])
        })
    }

    /// Send a counted command packet without reading the response.
    ///
    /// The execution time is still waited out so a following
    /// [`receive_only`](Self::receive_only) finds the response ready.
    pub fn send_only(&mut self, packet: &[u8]) -> Result<(), DeviceError> {
        let (mut frame, info) = Self::frame(packet)?;
        let exec_ms = self.interface.execution_time_ms(info.command.opcode())?;

        self.awake(|interface, delay| {
            interface.send(&mut frame)?;
            delay.delay_ms(exec_ms);
            Ok(())
        })
    }

    /// Receive up to `size` bytes of a pending response into `rx`.
    pub fn receive_only(&mut self, size: usize, rx: &mut [u8]) -> Result<usize, DeviceError> {
        let size = size.min(rx.len());
        self.awake(|interface, _| interface.receive(&mut rx[..size]))
    }

    /// Run `op` with the device awake, idling it afterwards.
    fn awake<R>(
        &mut self,
        op: impl FnOnce(&mut I, &mut D) -> Result<R, DeviceError>,
    ) -> Result<R, DeviceError> {
        self.interface.wake()?;
        let result = op(&mut self.interface, &mut self.delay);
        let idle = self.interface.idle();

        match (result, idle) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(err), _) | (Ok(_), Err(err)) => {
                warn!("transport: aborted with {}", err.code());
                Err(err)
            }
        }
    }

    /// Validate a counted packet and copy it behind the interface prefix.
    fn frame(packet: &[u8]) -> Result<(Vec<u8, FRAME_SIZE_MAX>, CommandInfo), DeviceError> {
        let count = *packet.first().ok_or(DeviceError::BadParam)? as usize;
        if count < 3 || count > packet.len() || count > COMMAND_SIZE_MAX {
            return Err(DeviceError::InvalidSize);
        }
        let packet = &packet[..count];

        let info = command_info(packet).ok_or(DeviceError::BadOpcode)?;

        let mut frame: Vec<u8, FRAME_SIZE_MAX> = Vec::new();
        frame.push(count as u8).map_err(|_| DeviceError::SmallBuffer)?;
        frame
            .extend_from_slice(packet)
            .map_err(|_| DeviceError::SmallBuffer)?;

        Ok((frame, info))
    }
}
