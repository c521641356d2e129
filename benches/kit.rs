use criterion::{Criterion, Throughput};
use cryptoauth_kit::device::crc::crc;
use cryptoauth_kit::device::{BusType, CryptoInterface, DeviceError, Transport};
use cryptoauth_kit::kit::packet::{build_response_packet, extract_data_load, TX_BUFFER_SIZE};
use cryptoauth_kit::kit::KitEngine;
use cryptoauth_kit::system::{Holdoff, SystemClock};
use std::hint::black_box;

/// Device answering every command with a fixed revision response
struct EchoDevice {
    address: u8,
}

impl CryptoInterface for EchoDevice {
    fn wake(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn idle(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn send(&mut self, _frame: &mut [u8]) -> Result<(), DeviceError> {
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let mut response = [0x07, 0x00, 0x00, 0x50, 0x00, 0x00, 0x00];
        let trailer = crc(&response[..5]);
        response[5..].copy_from_slice(&trailer);
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

struct NoDelay;

impl embedded_hal::delay::DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub fn bench_build_response_packet(c: &mut Criterion) {
    let mut group = c.benchmark_group("kit_framing");
    let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("build_response_packet_1000", |b| {
        let mut buf = [0u8; TX_BUFFER_SIZE];
        b.iter(|| {
            buf[..payload.len()].copy_from_slice(&payload);
            black_box(build_response_packet(&mut buf, payload.len()))
        });
    });
    group.finish();
}

pub fn bench_extract_data_load(c: &mut Criterion) {
    let mut line = b"s:t(".to_vec();
    line.extend(std::iter::repeat_n(b"A5".as_slice(), 150).flatten());
    line.push(b')');

    c.bench_function("extract_data_load_150", |b| {
        b.iter(|| {
            let mut command = line.clone();
            black_box(extract_data_load(&mut command).map(|load| load.len()).ok());
        });
    });
}

pub fn bench_process_talk(c: &mut Criterion) {
    let lock = Holdoff::new(10);
    let clock = SystemClock::new(10);
    let mut engine = KitEngine::new(
        Transport::new(EchoDevice { address: 0xC0 }, NoDelay),
        &clock,
        &lock,
    );
    let line = b"s:t(07300000000300)\n";

    c.bench_function("process_line_talk", |b| {
        b.iter(|| {
            let mut command = *line;
            black_box(engine.process_line(&mut command).len())
        });
    });
}

pub fn bench_process_board(c: &mut Criterion) {
    let lock = Holdoff::new(10);
    let clock = SystemClock::new(10);
    let mut engine = KitEngine::new(
        Transport::new(EchoDevice { address: 0xC0 }, NoDelay),
        &clock,
        &lock,
    );
    let line = b"b:d(00)\n";

    c.bench_function("process_line_discover", |b| {
        b.iter(|| {
            let mut command = *line;
            black_box(engine.process_line(&mut command).len())
        });
    });
}
