//! Device discovery on the I2C bus.
//!
//! A device is identified by answering the Info command. The interface's
//! configured address is tried first, then every even 8-bit address from
//! [`I2C_SCAN_START`] up to (not including) [`I2C_SCAN_END`].

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use super::crc::{check_packet, crc};
use super::opcode::{Command, RSP_SIZE_4};
use super::transport::Transport;
use super::{BusType, CryptoInterface, DeviceError, DeviceInfo, DeviceType};

/// Number of devices the kit keeps track of.
pub const DISCOVER_DEVICE_COUNT_MAX: usize = 1;

/// First address probed by the scan.
pub const I2C_SCAN_START: u8 = 0xB0;

/// End of the scanned address range.
pub const I2C_SCAN_END: u8 = 0xC8;

/// Table of discovered devices.
pub type DeviceTable = Vec<DeviceInfo, DISCOVER_DEVICE_COUNT_MAX>;

/// Info command, revision mode. The CRC is filled in by [`info_packet`].
const INFO_REVISION_PACKET: [u8; 7] = [0x07, Command::Info as u8, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Build a counted Info(revision) packet with its CRC.
fn info_packet() -> [u8; 7] {
    let mut packet = INFO_REVISION_PACKET;
    let trailer = crc(&packet[..5]);
    packet[5..].copy_from_slice(&trailer);
    packet
}

/// Read the four revision bytes of the device at the interface's address.
pub fn read_revision<I, D>(transport: &mut Transport<I, D>) -> Result<[u8; 4], DeviceError>
where
    I: CryptoInterface,
    D: DelayNs,
{
    let mut rx = [0u8; RSP_SIZE_4 as usize];
    let len = transport.send_and_receive(&info_packet(), &mut rx)?;

    if len < rx.len() || rx[0] as usize != rx.len() {
        return Err(DeviceError::InvalidSize);
    }
    if !check_packet(&rx) {
        return Err(DeviceError::RxCrcError);
    }

    let mut revision = [0u8; 4];
    revision.copy_from_slice(&rx[1..5]);
    Ok(revision)
}

/// Probe the I2C bus and rebuild `table`.
///
/// The table is cleared first. On success the found device is recorded, the
/// interface is left pointing at it, and its bus type is returned. When no
/// device answers the last probe error is returned and the table stays
/// empty.
pub fn discover<I, D>(
    transport: &mut Transport<I, D>,
    table: &mut DeviceTable,
) -> Result<BusType, DeviceError>
where
    I: CryptoInterface,
    D: DelayNs,
{
    table.clear();

    let mut result = read_revision(transport);

    let mut address = I2C_SCAN_START;
    while result.is_err() && address < I2C_SCAN_END {
        transport.select(address);
        result = read_revision(transport);
        address += 2;
    }

    let revision = match result {
        Ok(revision) => revision,
        Err(err) => {
            info!("discovery: no device found");
            return Err(err);
        }
    };

    let info = DeviceInfo {
        bus_type: BusType::I2c,
        device_type: DeviceType::from_ecc_revision(&revision),
        address: transport.interface().address(),
        device_index: 0,
        revision,
    };

    info!(
        "discovery: device at {} revision {} {} {} {}",
        info.address,
        revision[0],
        revision[1],
        revision[2],
        revision[3]
    );

    table.push(info).map_err(|_| DeviceError::SmallBuffer)?;
    Ok(info.bus_type)
}
