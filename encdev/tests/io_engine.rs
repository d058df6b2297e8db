//! Integration tests for bounded read/write and the cipher

use encdev::control::{IOCTL_OP_ENCRYPT, IOCTL_OP_REWIND, IOCTL_OP_SETKEY};
use encdev::{
    DeviceConfig, DeviceError, DeviceRegistry, IdGen, Minor, Session, UserSink, UserSource,
};

fn registry(capacity: usize) -> DeviceRegistry {
    let config = DeviceConfig::with_capacity(capacity).unwrap();
    DeviceRegistry::initialize(config, &IdGen::new()).unwrap()
}

fn enable_cipher(session: &mut Session, key: u8) {
    session.ioctl(IOCTL_OP_SETKEY, u64::from(key)).unwrap();
    session.ioctl(IOCTL_OP_ENCRYPT, 1).unwrap();
}

// User buffer that faults when byte `fail_at` is touched
struct FaultyBuffer {
    data: Vec<u8>,
    fail_at: usize,
}

impl FaultyBuffer {
    fn new(data: &[u8], fail_at: usize) -> Self {
        Self {
            data: data.to_vec(),
            fail_at,
        }
    }
}

impl UserSink for FaultyBuffer {
    fn put_user(&mut self, index: usize, byte: u8) -> Result<(), DeviceError> {
        if index == self.fail_at {
            return Err(DeviceError::Transfer { index });
        }
        self.data.put_user(index, byte)
    }
}

impl UserSource for FaultyBuffer {
    fn user_len(&self) -> usize {
        self.data.len()
    }

    fn get_user(&self, index: usize) -> Result<u8, DeviceError> {
        if index == self.fail_at {
            return Err(DeviceError::Transfer { index });
        }
        self.data.get_user(index)
    }
}

// --------------------------------------------------------------------
// Bounds
//

#[test]
fn test_write_advances_cursor_by_count() {
    let registry = registry(128);
    let mut session = registry.open(Minor::new(0)).unwrap();

    assert_eq!(session.write(b"HELLO").unwrap(), 5);
    assert_eq!(session.cursor(), 5);
}

#[test]
fn test_write_is_truncated_at_capacity() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();

    assert_eq!(session.write(b"0123456789").unwrap(), 8);
    assert_eq!(session.cursor(), 8);
    assert_eq!(session.write(b"x").unwrap(), 0);
    assert_eq!(session.cursor(), 8);
    assert_eq!(session.store().snapshot(), b"01234567");
}

#[test]
fn test_write_from_nonzero_cursor_is_truncated_at_capacity() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();

    assert_eq!(session.write(b"ABCDEF").unwrap(), 6);
    assert_eq!(session.write(b"vwxyz").unwrap(), 2);
    assert_eq!(session.cursor(), 8);
    assert_eq!(session.store().snapshot(), b"ABCDEFvw");
}

#[test]
fn test_read_is_truncated_at_capacity() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();
    session.write(b"abc").unwrap();

    let data = session.read(100).unwrap();

    assert_eq!(data.len(), 5);
    assert_eq!(session.cursor(), 8);
}

#[test]
fn test_read_at_end_returns_zero() {
    let registry = registry(128);
    let mut session = registry.open(Minor::new(0)).unwrap();
    assert_eq!(session.write(&[7u8; 128]).unwrap(), 128);

    let data = session.read(10).unwrap();

    assert!(data.is_empty());
    assert_eq!(session.cursor(), 128);
}

#[test]
fn test_zero_length_transfers() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();

    assert_eq!(session.write(b"").unwrap(), 0);
    assert!(session.read(0).unwrap().is_empty());
    assert_eq!(session.cursor(), 0);
}

#[test]
fn test_read_into_reports_count() {
    let registry = registry(4);
    let mut session = registry.open(Minor::new(0)).unwrap();
    session.write(b"wxyz").unwrap();
    session.ioctl(IOCTL_OP_REWIND, 0).unwrap();

    let mut out = [0u8; 3];
    let n = session.read_into(&mut out[..], 3).unwrap();

    assert_eq!(n, 3);
    assert_eq!(&out, b"wxy");
    assert_eq!(session.cursor(), 3);
}

#[test]
fn test_sessions_have_independent_cursors() {
    let registry = registry(8);
    let mut a = registry.open(Minor::new(1)).unwrap();
    let mut b = registry.open(Minor::new(1)).unwrap();

    a.write(b"1234").unwrap();

    assert_eq!(a.cursor(), 4);
    assert_eq!(b.cursor(), 0);
    assert_eq!(b.read(4).unwrap(), b"1234");
}

// --------------------------------------------------------------------
// Cipher
//

#[test]
fn test_cipher_roundtrip_with_same_key() {
    let registry = registry(128);
    let mut session = registry.open(Minor::new(0)).unwrap();
    enable_cipher(&mut session, 0x5A);

    session.write(b"HELLO").unwrap();
    session.ioctl(IOCTL_OP_REWIND, 0).unwrap();

    assert_eq!(session.read(5).unwrap(), b"HELLO");
}

#[test]
fn test_cipher_stores_transformed_bytes() {
    let registry = registry(4);
    let mut session = registry.open(Minor::new(0)).unwrap();
    enable_cipher(&mut session, 0x5A);

    session.write(b"HI").unwrap();

    let raw = session.store().snapshot();
    assert_eq!(raw[0], b'H' ^ 0x5A);
    assert_eq!(raw[1], b'I' ^ 0x5A);
}

#[test]
fn test_cipher_key_mismatch() {
    let registry = registry(128);
    let mut writer = registry.open(Minor::new(0)).unwrap();
    enable_cipher(&mut writer, 0x5A);
    writer.write(b"HELLO").unwrap();

    let mut reader = registry.open(Minor::new(0)).unwrap();
    enable_cipher(&mut reader, 0x33);
    let data = reader.read(5).unwrap();

    let expected: Vec<u8> = b"HELLO".iter().map(|b| b ^ (0x5A ^ 0x33)).collect();
    assert_eq!(data, expected);
    assert_ne!(data, b"HELLO");
}

#[test]
fn test_cipher_disabled_passthrough() {
    let registry = registry(16);
    let mut session = registry.open(Minor::new(0)).unwrap();
    session.ioctl(IOCTL_OP_SETKEY, 0x77).unwrap();

    session.write(b"plain").unwrap();
    session.ioctl(IOCTL_OP_REWIND, 0).unwrap();

    assert_eq!(session.read(5).unwrap(), b"plain");
    assert_eq!(&session.store().snapshot()[..5], b"plain");
}

#[test]
fn test_read_with_cipher_leaves_store_unchanged() {
    let registry = registry(4);
    let mut session = registry.open(Minor::new(0)).unwrap();
    session.write(b"data").unwrap();
    session.ioctl(IOCTL_OP_REWIND, 0).unwrap();
    enable_cipher(&mut session, 0xFF);

    session.read(4).unwrap();

    assert_eq!(session.store().snapshot(), b"data");
}

// --------------------------------------------------------------------
// Transfer failures
//

#[test]
fn test_failed_read_keeps_cursor() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();
    session.write(b"abcdefgh").unwrap();
    session.ioctl(IOCTL_OP_REWIND, 0).unwrap();
    session.read(2).unwrap();

    let mut sink = FaultyBuffer::new(&[0u8; 4], 2);
    let result = session.read_into(&mut sink, 4);

    assert_eq!(result, Err(DeviceError::Transfer { index: 2 }));
    assert_eq!(session.cursor(), 2);
    assert_eq!(session.store().snapshot(), b"abcdefgh");
}

#[test]
fn test_read_into_short_sink_faults() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();

    let mut out = [0u8; 2];
    let result = session.read_into(&mut out[..], 4);

    assert_eq!(result, Err(DeviceError::Transfer { index: 2 }));
    assert_eq!(session.cursor(), 0);
}

#[test]
fn test_failed_write_keeps_cursor_and_partial_bytes() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();

    let source = FaultyBuffer::new(b"abcd", 2);
    let result = session.write_from(&source);

    assert_eq!(result, Err(DeviceError::Transfer { index: 2 }));
    assert_eq!(session.cursor(), 0);
    assert_eq!(&session.store().snapshot()[..4], b"ab\0\0");
}

#[test]
fn test_retry_after_failed_write_starts_at_same_cursor() {
    let registry = registry(8);
    let mut session = registry.open(Minor::new(0)).unwrap();
    session.write(b"xy").unwrap();

    let source = FaultyBuffer::new(b"abcd", 3);
    assert!(session.write_from(&source).is_err());
    assert_eq!(session.write(b"abcd").unwrap(), 4);

    assert_eq!(session.cursor(), 6);
    assert_eq!(&session.store().snapshot()[..6], b"xyabcd");
}
