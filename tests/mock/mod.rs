//! Mock board peripherals shared by the integration tests
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use cryptoauth_kit::client::{Claims, Cloud, ConnectOptions, Error as ClientError, TokenSigner};
use cryptoauth_kit::device::crc::crc;
use cryptoauth_kit::device::opcode::Command;
use cryptoauth_kit::device::{BusType, CryptoInterface, DeviceError};
use cryptoauth_kit::sensor::{Error as SensorError, Fan, Thermometer};
use cryptoauth_kit::system::time::{Clock, DateTime};
use cryptoauth_kit::usb::{HidReport, REPORT_SIZE};
use embedded_hal::delay::DelayNs;

/// Log of bus transactions, shared by every mock on the same I2C bus
pub type BusLog = Rc<RefCell<Vec<&'static str>>>;

pub fn bus_log() -> BusLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Revision of an ECC508A
pub const ECC508A_REVISION: [u8; 4] = [0x00, 0x00, 0x50, 0x00];

/// Build a counted response packet with a valid CRC around `data`
pub fn response_packet(data: &[u8]) -> Vec<u8> {
    let mut packet = vec![(data.len() + 3) as u8];
    packet.extend_from_slice(data);
    let trailer = crc(&packet);
    packet.extend_from_slice(&trailer);
    packet
}

/// Build a counted command packet with a valid CRC
pub fn command_packet(opcode: u8, param1: u8, param2: u16, data: &[u8]) -> Vec<u8> {
    let mut packet = vec![(data.len() + 7) as u8, opcode, param1];
    packet.extend_from_slice(&param2.to_le_bytes());
    packet.extend_from_slice(data);
    let trailer = crc(&packet);
    packet.extend_from_slice(&trailer);
    packet
}

/// Upper-case hex of `bytes`
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// A CryptoAuthentication device answering at one I2C address
#[derive(Debug)]
pub struct MockDevice {
    pub address: u8,
    pub device_address: Option<u8>,
    pub revision: [u8; 4],
    pub responses: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    pub fail_send: bool,
    pub fail_idle: bool,
    pub awake: bool,
    pub log: BusLog,
    last_opcode: Option<u8>,
}

impl MockDevice {
    /// A device present at `device_address`, with the interface pointing at `address`
    pub fn new(address: u8, device_address: Option<u8>, log: BusLog) -> Self {
        Self {
            address,
            device_address,
            revision: ECC508A_REVISION,
            responses: VecDeque::new(),
            sent: Vec::new(),
            fail_send: false,
            fail_idle: false,
            awake: false,
            log,
            last_opcode: None,
        }
    }

    fn present(&self) -> bool {
        self.device_address == Some(self.address)
    }
}

impl CryptoInterface for MockDevice {
    fn wake(&mut self) -> Result<(), DeviceError> {
        self.log.borrow_mut().push("kit:wake");
        if !self.present() {
            return Err(DeviceError::WakeFailed);
        }
        self.awake = true;
        Ok(())
    }

    fn idle(&mut self) -> Result<(), DeviceError> {
        self.log.borrow_mut().push("kit:idle");
        self.awake = false;
        if self.fail_idle {
            return Err(DeviceError::CommFail);
        }
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DeviceError> {
        self.log.borrow_mut().push("kit:sleep");
        self.awake = false;
        Ok(())
    }

    fn send(&mut self, frame: &mut [u8]) -> Result<(), DeviceError> {
        self.log.borrow_mut().push("kit:send");
        if self.fail_send {
            return Err(DeviceError::TxFail);
        }
        let packet = frame[1..].to_vec();
        self.last_opcode = packet.get(1).copied();
        self.sent.push(packet);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        self.log.borrow_mut().push("kit:receive");
        let response = if self.last_opcode == Some(Command::Info.opcode()) {
            response_packet(&self.revision)
        } else {
            self.responses.pop_front().ok_or(DeviceError::RxNoResponse)?
        };
        let len = response.len().min(buf.len());
        buf[..len].copy_from_slice(&response[..len]);
        Ok(len)
    }

    fn address(&self) -> u8 {
        self.address
    }

    fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    fn bus_type(&self) -> BusType {
        BusType::I2c
    }
}

/// Delay provider adding up the requested milliseconds
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ms: Rc<Cell<u64>>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms.set(self.total_ms.get() + ms as u64);
    }
}

/// HID endpoint recording reports, rejecting the first `reject` of them
#[derive(Debug, Default)]
pub struct MockHid {
    pub reports: Vec<[u8; REPORT_SIZE]>,
    pub reject: usize,
    pub attempts: usize,
}

impl MockHid {
    /// Accepted reports joined, with the zero padding stripped
    pub fn text(&self) -> String {
        let bytes: Vec<u8> = self
            .reports
            .iter()
            .flat_map(|r| r.iter().copied())
            .filter(|&b| b != 0)
            .collect();
        String::from_utf8(bytes).unwrap()
    }
}

impl HidReport for MockHid {
    fn send_report(&mut self, report: &[u8; REPORT_SIZE]) -> bool {
        self.attempts += 1;
        if self.reject > 0 {
            self.reject -= 1;
            return false;
        }
        self.reports.push(*report);
        true
    }
}

/// Clock backed by a shared counter
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    pub now: Rc<Cell<u32>>,
}

impl Clock for MockClock {
    fn utc(&self) -> u32 {
        self.now.get()
    }

    fn set(&mut self, datetime: &DateTime) {
        if let Some(seconds) = datetime.to_unix() {
            self.now.set(seconds);
        }
    }
}

/// Thermometer returning queued readings, repeating the last one
#[derive(Debug)]
pub struct MockThermometer {
    pub readings: VecDeque<i32>,
    pub last: i32,
    pub log: BusLog,
}

impl MockThermometer {
    pub fn new(readings: &[i32], log: BusLog) -> Self {
        Self {
            readings: readings.iter().copied().collect(),
            last: 0,
            log,
        }
    }
}

impl Thermometer for MockThermometer {
    fn read_milli_celsius(&mut self) -> Result<i32, SensorError> {
        self.log.borrow_mut().push("sensor:read");
        if let Some(reading) = self.readings.pop_front() {
            self.last = reading;
        }
        Ok(self.last)
    }
}

/// Fan controller remembering its target
#[derive(Debug)]
pub struct MockFan {
    pub target: Rc<Cell<u16>>,
    pub log: BusLog,
}

impl MockFan {
    pub fn new(log: BusLog) -> Self {
        Self {
            target: Rc::new(Cell::new(0)),
            log,
        }
    }
}

impl Fan for MockFan {
    fn set_target_tach(&mut self, rpm: u16) -> Result<(), SensorError> {
        self.log.borrow_mut().push("sensor:fan");
        self.target.set(rpm);
        Ok(())
    }

    fn tach(&mut self) -> Result<u16, SensorError> {
        self.log.borrow_mut().push("sensor:tach");
        Ok(self.target.get())
    }
}

/// Network and MQTT session
#[derive(Debug, Default)]
pub struct MockCloud {
    pub time_requests: usize,
    pub sockets: Vec<(String, u16)>,
    pub client_id: Option<String>,
    pub password: Option<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, u16, String)>,
    pub inbox: VecDeque<Vec<u8>>,
    pub refuse_connect: bool,
    pub network_error: bool,
    pub clock: Option<Rc<Cell<u32>>>,
    pub time_answer: u32,
}

impl Cloud for MockCloud {
    fn request_time(&mut self) {
        self.time_requests += 1;
        if let Some(clock) = &self.clock {
            clock.set(self.time_answer);
        }
    }

    fn open_socket(&mut self, host: &str, port: u16) -> Result<(), ClientError> {
        self.sockets.push((host.to_string(), port));
        Ok(())
    }

    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), ClientError> {
        if self.refuse_connect {
            return Err(ClientError::Network);
        }
        self.client_id = Some(options.client_id.to_string());
        self.password = Some(options.password.to_string());
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ClientError> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, message_id: u16, payload: &[u8]) -> Result<(), ClientError> {
        let payload = String::from_utf8(payload.to_vec()).map_err(|_| ClientError::Serialize)?;
        self.published.push((topic.to_string(), message_id, payload));
        Ok(())
    }

    fn poll_message(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, ClientError> {
        match self.inbox.pop_front() {
            Some(message) => {
                let len = message.len().min(buffer.len());
                buffer[..len].copy_from_slice(&message[..len]);
                Ok(Some(len))
            }
            None => Ok(None),
        }
    }

    fn has_error(&self) -> bool {
        self.network_error
    }
}

/// Token signer writing the claims JSON as the token
#[derive(Debug, Default)]
pub struct ClaimsSigner;

impl TokenSigner for ClaimsSigner {
    fn sign(&mut self, claims: &Claims<'_>, out: &mut [u8]) -> Result<usize, ClientError> {
        claims.to_json(out)
    }
}
