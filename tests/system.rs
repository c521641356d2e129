use std::cell::RefCell;

use cryptoauth_kit::config::{KIT_HOLDOFF_MS, TICK_PERIOD_MS};
use cryptoauth_kit::device::Transport;
use cryptoauth_kit::kit::KitEngine;
use cryptoauth_kit::sensor::FanController;
use cryptoauth_kit::system::time::Clock;
use cryptoauth_kit::system::{DateTime, Holdoff, Scheduler, SystemClock};
use cryptoauth_kit::usb::{send_response, ReceivedLine, ReportAssembler, REPORT_SIZE, SEND_DELAY_MS};
use heapless::spsc::Queue;

mod mock;
use mock::*;

#[test]
fn test_kit_holdoff_duration() {
    let lock = Holdoff::new(TICK_PERIOD_MS);
    lock.arm(KIT_HOLDOFF_MS);

    for _ in 0..499 {
        lock.tick();
    }
    assert!(lock.is_held());
    assert_eq!(lock.remaining_ms(), TICK_PERIOD_MS);

    lock.tick();
    assert!(!lock.is_held());

    // saturates at zero
    lock.tick();
    assert_eq!(lock.remaining(), 0);
}

#[test]
fn test_rearm_replaces_remaining_time() {
    let lock = Holdoff::new(TICK_PERIOD_MS);
    lock.arm(KIT_HOLDOFF_MS);
    for _ in 0..300 {
        lock.tick();
    }
    lock.arm(KIT_HOLDOFF_MS);
    assert_eq!(lock.remaining(), 500);

    lock.release();
    assert!(!lock.is_held());
}

#[test]
fn test_bus_tasks_wait_for_kit_holdoff() {
    let log = bus_log();
    let lock = Holdoff::new(TICK_PERIOD_MS);
    let scheduler = Scheduler::new(&lock);
    let clock = MockClock::default();

    let fan = RefCell::new(FanController::new(
        MockThermometer::new(&[25_000], log.clone()),
        MockFan::new(log.clone()),
        clock.clone(),
    ));
    let device = MockDevice::new(0xC0, Some(0xC0), log.clone());
    let mut kit = KitEngine::new(Transport::new(device, MockDelay::default()), clock, &lock);

    let mut queue: Queue<ReceivedLine, 4> = Queue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut hid = MockHid::default();
    let mut fan_task = &fan;

    let wake = || ReceivedLine {
        data: heapless::Vec::from_slice(b"s:w").unwrap(),
        overflow: false,
    };
    producer.enqueue(wake()).unwrap();

    let mut ran = 0;
    for iteration in 0..600 {
        if iteration == 550 {
            producer.enqueue(wake()).unwrap();
        }
        kit.poll(&mut consumer, &mut hid);
        ran += scheduler.run_bus_tasks(&mut [&mut fan_task]);
        scheduler.tick();
    }

    // free between the first holdoff expiring and the second line
    assert_eq!(ran, 50);

    let log = log.borrow();
    assert_eq!(log[0], "kit:wake");
    assert!(log[1..101].iter().all(|entry| entry.starts_with("sensor:")));
    assert_eq!(log[101], "kit:wake");
    assert_eq!(log.len(), 102);
    assert_eq!(hid.text(), "00()\n00()\n");
}

#[test]
fn test_registered_waits_are_ticked() {
    let lock = Holdoff::new(TICK_PERIOD_MS);
    let client_wait = Holdoff::new(TICK_PERIOD_MS);
    let mut scheduler = Scheduler::new(&lock);
    scheduler.register(&client_wait).unwrap();

    client_wait.arm(100);
    for _ in 0..10 {
        scheduler.tick();
    }
    assert!(!client_wait.is_held());
    assert!(!scheduler.bus_locked());
}

#[test]
fn test_system_clock_counts_from_set_time() {
    let clock = SystemClock::new(TICK_PERIOD_MS);
    let mut handle = &clock;
    assert_eq!(handle.utc(), 0);

    // ticks before the time is known are not counted
    for _ in 0..500 {
        clock.advance();
    }
    assert!(!clock.is_set());

    let datetime = DateTime::from_packed(&[0xE2, 0x07, 2, 14, 12, 30, 15]).unwrap();
    handle.set(&datetime);
    for _ in 0..1000 {
        clock.advance();
    }
    assert_eq!(handle.utc(), 1_518_611_425);
}

#[test]
fn test_report_assembler_feeds_engine() {
    let lock = Holdoff::new(TICK_PERIOD_MS);
    let device = MockDevice::new(0xC0, Some(0xC0), bus_log());
    let mut kit = KitEngine::new(Transport::new(device, MockDelay::default()), MockClock::default(), &lock);

    let mut queue: Queue<ReceivedLine, 4> = Queue::new();
    let (producer, mut consumer) = queue.split();
    let mut assembler = ReportAssembler::new(producer);
    let mut hid = MockHid::default();

    let mut report = [0u8; REPORT_SIZE];
    report[..9].copy_from_slice(b"b:d(00)\nX");
    assert!(assembler.on_report(&report));

    assert!(kit.poll(&mut consumer, &mut hid));
    assert_eq!(hid.text(), "ECC108 TWI 00(C0)\n");
}

#[test]
fn test_send_response_gives_up_after_retries() {
    let mut hid = MockHid {
        reject: usize::MAX,
        ..Default::default()
    };
    let mut delay = MockDelay::default();

    assert!(!send_response(&mut hid, &mut delay, b"00()\n"));
    assert_eq!(hid.attempts, 6);
    assert!(hid.reports.is_empty());
    // no pause after the final rejection
    assert_eq!(delay.total_ms.get(), 5 * SEND_DELAY_MS as u64);
}

#[test]
fn test_send_response_retries_across_reports() {
    let mut hid = MockHid {
        reject: 2,
        ..Default::default()
    };
    let mut delay = MockDelay::default();
    let response = [b'A'; REPORT_SIZE + 10];

    assert!(send_response(&mut hid, &mut delay, &response));
    assert_eq!(hid.attempts, 4);
    assert_eq!(delay.total_ms.get(), 4 * SEND_DELAY_MS as u64);
    assert_eq!(hid.reports.len(), 2);
    assert_eq!(&hid.reports[1][..10], &[b'A'; 10]);
    assert!(hid.reports[1][10..].iter().all(|&b| b == 0));
}
