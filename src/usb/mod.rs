//! USB HID link to the host.
//!
//! The kit protocol rides on 64-byte HID reports. Inbound, the board's
//! report callback feeds a [`ReportAssembler`], which joins reports into
//! `\n` terminated lines and hands complete lines to the main loop through a
//! `heapless::spsc` queue. Outbound, [`send_response`] slices a framed
//! response into zero padded reports.
//!
//! # Wiring
//!
//! ```rust
//! use cryptoauth_kit::usb::{ReceivedLine, ReportAssembler, REPORT_SIZE};
//! use heapless::spsc::Queue;
//!
//! let mut queue: Queue<ReceivedLine, 4> = Queue::new();
//! let (producer, mut consumer) = queue.split();
//! let mut assembler = ReportAssembler::new(producer);
//!
//! // report callback
//! let mut report = [0u8; REPORT_SIZE];
//! report[..8].copy_from_slice(b"b:f(00)\n");
//! assembler.on_report(&report);
//!
//! // main loop
//! let line = consumer.dequeue().unwrap();
//! assert_eq!(&line.data[..], b"b:f(00)");
//! ```

use embedded_hal::delay::DelayNs;
use heapless::spsc::Producer;
use heapless::Vec;

use crate::kit::packet::KIT_EOP;

/// Size of one HID report in either direction.
pub const REPORT_SIZE: usize = 64;

/// Failed report sends tolerated per response.
pub const SEND_RETRIES: u8 = 5;

/// Pause after every report send attempt.
pub const SEND_DELAY_MS: u32 = 50;

/// Longest command line accepted from the host, terminator excluded.
pub const RX_LINE_MAX: usize = 1024;

/// A command line received from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedLine {
    /// Line content without the terminator.
    pub data: Vec<u8, RX_LINE_MAX>,
    /// The host sent more than [`RX_LINE_MAX`] bytes; `data` holds the start.
    pub overflow: bool,
}

/// Joins HID reports into lines. Runs in the USB interrupt.
pub struct ReportAssembler<'q, const N: usize> {
    line: ReceivedLine,
    lines: Producer<'q, ReceivedLine, N>,
    dropped: u32,
}

impl<const N: usize> core::fmt::Debug for ReportAssembler<'_, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReportAssembler")
            .field("line", &self.line)
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

impl<'q, const N: usize> ReportAssembler<'q, N> {
    /// Assemble lines into `lines`.
    pub fn new(lines: Producer<'q, ReceivedLine, N>) -> Self {
        Self {
            line: ReceivedLine::default(),
            lines,
            dropped: 0,
        }
    }

    /// Consume one report.
    ///
    /// Bytes are appended until the terminator; whatever follows it in the
    /// same report is padding and ignored. Returns whether a line was
    /// completed.
    pub fn on_report(&mut self, report: &[u8]) -> bool {
        for &byte in report {
            if byte == KIT_EOP {
                self.finish_line();
                return true;
            }
            if self.line.data.push(byte).is_err() {
                self.line.overflow = true;
            }
        }
        false
    }

    /// Lines lost because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn finish_line(&mut self) {
        let line = core::mem::take(&mut self.line);
        if self.lines.enqueue(line).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("usb: line queue full, {} lines dropped", self.dropped);
        }
    }
}

/// Sends one HID report to the host.
pub trait HidReport {
    /// Queue `report` on the IN endpoint. Returns whether it was accepted.
    fn send_report(&mut self, report: &[u8; REPORT_SIZE]) -> bool;
}

/// Send `response` as a sequence of reports.
///
/// Each accepted report is followed by a [`SEND_DELAY_MS`] pause. A rejected
/// report is retried after the same pause, at most [`SEND_RETRIES`] times
/// over the whole response; after that the rest of the response is dropped
/// without waiting. Returns whether the last report sent was accepted.
pub fn send_response<H, D>(hid: &mut H, delay: &mut D, response: &[u8]) -> bool
where
    H: HidReport,
    D: DelayNs,
{
    let mut retries = SEND_RETRIES;
    let mut sent = false;
    let mut chunks = response.chunks(REPORT_SIZE).peekable();

    while let Some(chunk) = chunks.peek() {
        let mut report = [0u8; REPORT_SIZE];
        report[..chunk.len()].copy_from_slice(chunk);

        sent = hid.send_report(&report);

        if sent {
            chunks.next();
        } else if retries > 0 {
            retries -= 1;
        } else {
            warn!("usb: giving up on response of {} bytes", response.len());
            break;
        }
        delay.delay_ms(SEND_DELAY_MS);
    }

    sent
}
