//! Integration tests for the character device buffer
//!
//! These tests drive the device the way a driver shim would:
//! - open / write / read / release sequences
//! - capacity and truncation behaviour
//! - multiple handles over one shared buffer
//! - concurrent access from several threads

use kaal_chardev::*;
use std::sync::{Arc, Mutex};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn device() -> Device {
    init_logging();
    Device::new(DeviceConfig::default()).expect("default config is valid")
}

/// open -> write("HELLO") -> partial reads down to EOF
#[test]
fn test_partial_reads_to_eof() {
    let dev = device();
    let h = dev.open();
    dev.write(h, b"HELLO").unwrap();

    let first = dev.read(h, 3).unwrap();
    assert_eq!(first.bytes, b"HEL");
    assert!(!first.eof);

    let second = dev.read(h, 10).unwrap();
    assert_eq!(second.bytes, b"LO");
    assert!(!second.eof);

    let third = dev.read(h, 1).unwrap();
    assert!(third.bytes.is_empty());
    assert!(third.eof);
}

/// A 129-byte payload is cut to capacity
#[test]
fn test_oversized_write_truncates() {
    let dev = device();
    let h = dev.open();

    let result = dev.write(h, &[0x5a; 129]).unwrap();
    assert_eq!(result.bytes_stored, 128);
    assert!(result.truncated);
    assert_eq!(result.status(), WriteStatus::Truncated);
    assert_eq!(dev.len(), 128);
}

/// Releasing an id that was never issued fails
#[test]
fn test_release_unknown_handle() {
    let dev = device();
    let bogus = HandleId::from_raw(999);

    let result = dev.release(bogus);
    assert!(matches!(result, Err(DeviceError::InvalidHandle { handle }) if handle == bogus));
    assert_eq!(dev.open_count(), 0);
}

/// Two handles see the same content through independent cursors
#[test]
fn test_two_readers_same_content() {
    let dev = device();
    let h1 = dev.open();
    dev.write(h1, b"AB").unwrap();
    let h2 = dev.open();

    assert_eq!(dev.read(h1, 16).unwrap().bytes, b"AB");
    assert!(dev.read(h1, 16).unwrap().eof);

    assert_eq!(dev.read(h2, 16).unwrap().bytes, b"AB");
    assert!(dev.read(h2, 16).unwrap().eof);
}

#[test]
fn test_capacity_bound() {
    let dev = device();
    let h = dev.open();

    for n in [0usize, 1, 64, 127, 128, 129, 200, 1024] {
        let payload = vec![b'x'; n];
        let result = dev.write(h, &payload).unwrap();
        assert_eq!(result.bytes_stored, n.min(BUF_SIZE), "payload of {} bytes", n);
        assert_eq!(result.truncated, n > BUF_SIZE, "payload of {} bytes", n);
        assert!(dev.len() <= dev.capacity());
    }
}

#[test]
fn test_read_exhaustion() {
    let dev = device();
    let writer = dev.open();
    let payload: Vec<u8> = (0..100u8).collect();
    dev.write(writer, &payload).unwrap();

    let reader = dev.open();
    let all = dev.read(reader, payload.len()).unwrap();
    assert_eq!(all.bytes, payload);

    for max_len in [1, 10, 128] {
        let out = dev.read(reader, max_len).unwrap();
        assert!(out.eof);
        assert!(out.bytes.is_empty());
    }
}

#[test]
fn test_write_rewinds_readers() {
    let dev = device();
    let h = dev.open();
    dev.write(h, b"old contents").unwrap();
    assert_eq!(dev.read(h, 4).unwrap().bytes, b"old ");

    let other = dev.open();
    dev.write(other, b"NEW").unwrap();

    // Next read starts at offset 0 of the new data
    let out = dev.read(h, 16).unwrap();
    assert_eq!(out.bytes, b"NEW");
    assert!(dev.read(h, 16).unwrap().eof);
}

#[test]
fn test_open_release_symmetry() {
    let dev = device();
    assert_eq!(dev.open_count(), 0);

    let handles: Vec<_> = (0..5).map(|_| dev.open()).collect();
    assert_eq!(dev.open_count(), 5);

    for (released, h) in handles.iter().take(3).enumerate() {
        dev.release(*h).unwrap();
        assert_eq!(dev.open_count(), 5 - (released + 1));
    }

    // Double release does not push the count down
    assert!(dev.release(handles[0]).is_err());
    assert_eq!(dev.open_count(), 2);
}

#[test]
fn test_handle_isolation() {
    let dev = device();
    let h1 = dev.open();
    let h2 = dev.open();
    dev.write(h1, b"0123456789").unwrap();

    assert_eq!(dev.read(h1, 4).unwrap().bytes, b"0123");
    assert_eq!(dev.read(h2, 2).unwrap().bytes, b"01");
    assert_eq!(dev.read(h1, 4).unwrap().bytes, b"4567");
    assert_eq!(dev.read(h2, 8).unwrap().bytes, b"23456789");
    assert_eq!(dev.read(h1, 8).unwrap().bytes, b"89");
}

#[test]
fn test_released_handle_cannot_read() {
    let dev = device();
    let h = dev.open();
    dev.write(h, b"secret").unwrap();
    dev.release(h).unwrap();

    assert!(matches!(
        dev.read(h, 6),
        Err(DeviceError::InvalidHandle { .. })
    ));
    assert_eq!(dev.contents(), b"secret");
}

#[test]
fn test_events_reach_sink() {
    init_logging();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink = move |device: &str, event: DeviceEvent| {
        sink_seen.lock().unwrap().push(format!("{}:{}", device, event.name()));
    };

    let dev = Device::with_sink(DeviceConfig::named("probe"), Box::new(sink)).unwrap();
    let h = dev.open();
    dev.release(h).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["probe:device_opened", "probe:device_closed"]
    );
}

#[test]
fn test_module_from_toml_config() {
    init_logging();
    let config = DeviceConfig::from_toml_str(
        r#"
        name = "journal"
        write_policy = "append"
        "#,
    )
    .unwrap();

    let mut registrar = LocalRegistrar::new();
    let module = ChardevModule::load(config, &mut registrar).unwrap();
    let dev = Arc::clone(module.device());

    let h = dev.open();
    dev.write(h, b"one,").unwrap();
    dev.write(h, b"two").unwrap();
    assert_eq!(dev.read(h, 64).unwrap().bytes, b"one,two");
    dev.release(h).unwrap();

    module.unload();
    assert!(registrar.lookup(LOCAL_MAJOR_FIRST).is_none());
}

/// Concurrent full-buffer writers never produce a mixed read
#[test]
fn test_concurrent_writes_are_not_torn() {
    let dev = device();
    let patterns = [[b'A'; BUF_SIZE], [b'B'; BUF_SIZE]];

    crossbeam::scope(|s| {
        for pattern in &patterns {
            let dev = &dev;
            s.spawn(move |_| {
                let h = dev.open();
                for _ in 0..500 {
                    dev.write(h, pattern).unwrap();
                }
                dev.release(h).unwrap();
            });
        }

        for _ in 0..2 {
            let dev = &dev;
            s.spawn(move |_| {
                for _ in 0..500 {
                    // Fresh handle so every sample starts at offset 0
                    let h = dev.open();
                    let out = dev.read(h, BUF_SIZE).unwrap();
                    if let Some(&first) = out.bytes.first() {
                        assert_eq!(out.len(), BUF_SIZE);
                        assert!(
                            out.bytes.iter().all(|&b| b == first),
                            "torn read: {:?}",
                            out.bytes
                        );
                    }
                    dev.release(h).unwrap();
                }
            });
        }
    })
    .unwrap();

    assert_eq!(dev.open_count(), 0);
}

#[test]
fn test_concurrent_open_release_balance() {
    let dev = Arc::new(device());

    crossbeam::scope(|s| {
        for _ in 0..8 {
            let dev = Arc::clone(&dev);
            s.spawn(move |_| {
                for _ in 0..200 {
                    let h = dev.open();
                    dev.release(h).unwrap();
                }
            });
        }
    })
    .unwrap();

    assert_eq!(dev.open_count(), 0);
}

/// Events reach the sink in the same order the open count changed
#[test]
fn test_concurrent_events_are_ordered() {
    init_logging();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink = move |_: &str, event: DeviceEvent| sink_seen.lock().unwrap().push(event);
    let dev = Device::with_sink(DeviceConfig::default(), Box::new(sink)).unwrap();

    crossbeam::scope(|s| {
        for _ in 0..4 {
            let dev = &dev;
            s.spawn(move |_| {
                for _ in 0..250 {
                    let h = dev.open();
                    dev.release(h).unwrap();
                }
            });
        }
    })
    .unwrap();

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 2000);

    let mut expected = 0usize;
    for event in events.iter() {
        match *event {
            DeviceEvent::Opened { open_count } => {
                expected += 1;
                assert_eq!(open_count, expected, "out-of-order {}", event);
            }
            DeviceEvent::Closed { open_count } => {
                expected -= 1;
                assert_eq!(open_count, expected, "out-of-order {}", event);
            }
        }
    }
    assert_eq!(expected, 0);
}
