//! The kit protocol spoken with the host tools.
//!
//! Commands are text lines such as `s:t(0C...)\n` or `b:d(00)\n`. Responses
//! are a status byte and an optional payload rendered as hex in parentheses
//! and terminated by a newline, e.g. `00(0411337B)\n`.
//!
//! - [`hex`]: in-place hex-ASCII conversion
//! - [`packet`]: response framing and data load extraction
//! - [`command`]: line grammar
//! - [`engine`]: dispatch against the device and board handlers
//! - [`error`]: kit status codes

pub mod command;
pub mod engine;
pub mod error;
pub mod hex;
pub mod packet;

pub use command::{BoardCommand, DeviceCommand, KitCommand, PhysicalCommand};
pub use engine::KitEngine;
pub use error::KitStatus;
pub use packet::{build_response_packet, convert_for_transmit, extract_data_load};
