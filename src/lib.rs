//! # cryptoauth-kit
//!
//! Firmware core of a CryptoAuthentication development kit: a host tool
//! talks to the secure element over USB-HID using the text based kit
//! protocol, while the board itself runs a small cloud demo that reports
//! temperature and fan speed over MQTT. This library is designed for
//! embedded systems and supports `no_std` environments.
//!
//! ## Features
//!
//! ### Kit Protocol
//! - **Line assembly**: HID reports joined into command lines ([`usb`])
//! - **Dispatch**: device, physical layer and board commands ([`kit`])
//! - **Framing**: `<status>(<hex>)\n` responses built in place
//!
//! ### Device Access
//! - Wake, send, execution delay, receive and idle sequencing ([`device`])
//! - Bus discovery and revision based device classification
//! - Public key export as PEM
//!
//! ### Board Tasks
//! - Cooperative scheduler with tick driven holdoffs ([`system`])
//! - Cloud client with JWT authentication ([`client`])
//! - Temperature driven fan control ([`sensor`])
//!
//! ## Usage
//!
//! The board provides a [`device::CryptoInterface`] for the physical link,
//! an `embedded_hal` delay, a [`system::Clock`] and a [`usb::HidReport`]
//! sink. The engine is then driven from the main loop:
//!
//! ```rust,no_run
//! # use cryptoauth_kit::device::{BusType, CryptoInterface, DeviceError};
//! # struct Link;
//! # impl CryptoInterface for Link {
//! #     fn wake(&mut self) -> Result<(), DeviceError> { Ok(()) }
//! #     fn idle(&mut self) -> Result<(), DeviceError> { Ok(()) }
//! #     fn sleep(&mut self) -> Result<(), DeviceError> { Ok(()) }
//! #     fn send(&mut self, _frame: &mut [u8]) -> Result<(), DeviceError> { Ok(()) }
//! #     fn receive(&mut self, _rx: &mut [u8]) -> Result<usize, DeviceError> { Ok(0) }
//! #     fn address(&self) -> u8 { 0xB0 }
//! #     fn set_address(&mut self, _address: u8) {}
//! #     fn bus_type(&self) -> BusType { BusType::I2c }
//! # }
//! # struct Delay;
//! # impl embedded_hal::delay::DelayNs for Delay { fn delay_ns(&mut self, _ns: u32) {} }
//! # struct Hid;
//! # impl cryptoauth_kit::usb::HidReport for Hid {
//! #     fn send_report(&mut self, _report: &[u8; 64]) -> bool { true }
//! # }
//! use cryptoauth_kit::config::TICK_PERIOD_MS;
//! use cryptoauth_kit::device::Transport;
//! use cryptoauth_kit::kit::KitEngine;
//! use cryptoauth_kit::system::{Holdoff, Scheduler, SystemClock};
//! use cryptoauth_kit::usb::{ReceivedLine, ReportAssembler};
//! use heapless::spsc::Queue;
//!
//! static KIT_LOCK: Holdoff = Holdoff::new(TICK_PERIOD_MS);
//! static CLOCK: SystemClock = SystemClock::new(TICK_PERIOD_MS);
//!
//! let mut queue: Queue<ReceivedLine, 4> = Queue::new();
//! let (producer, mut lines) = queue.split();
//! let _assembler = ReportAssembler::new(producer); // fed by the HID callback
//!
//! let mut engine = KitEngine::new(Transport::new(Link, Delay), &CLOCK, &KIT_LOCK);
//! let scheduler = Scheduler::new(&KIT_LOCK);
//! let mut hid = Hid;
//! loop {
//!     engine.poll(&mut lines, &mut hid);
//!     scheduler.run_bus_tasks(&mut []);
//! }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Hosts, for tests and simulation
//!
//! A `critical-section` implementation must be linked in.
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Cloud client task: network time, MQTT session and telemetry.
pub mod client;

/// Build-time constants and the provisioned cloud identity.
pub mod config;

/// CryptoAuthentication device transport, discovery and key export.
pub mod device;

/// Kit protocol parsing, dispatch and response framing.
pub mod kit;

/// Temperature sensing and fan control.
pub mod sensor;

/// Holdoffs, clock and the cooperative scheduler.
pub mod system;

/// USB-HID report handling.
pub mod usb;
