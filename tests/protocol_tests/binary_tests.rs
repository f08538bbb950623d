//! Binary Decoder Tests
//!
//! These tests verify:
//! - Header parsing and opcode dispatch
//! - Value length derivation and its validation
//! - Truncation handling for the header and every trailing field
//! - Magic byte validation

use std::io::{self, BufRead, Cursor, Read};

use memwire::error::{DecodeError, Field};
use memwire::protocol::{
    BinaryDecoder, Decoder, Expiry, Opcode, Request, RequestHeader, RequestKind, HEADER_SIZE,
};

// =============================================================================
// Helper Functions
// =============================================================================

struct Frame {
    magic: u8,
    opcode: u8,
    key_length: u16,
    extra_length: u8,
    total_body: u32,
    opaque: u32,
    cas: u64,
    body: Vec<u8>,
}

impl Frame {
    fn new(opcode: u8, extras: &[u8], key: &[u8], value: &[u8]) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(extras);
        body.extend_from_slice(key);
        body.extend_from_slice(value);
        Self {
            magic: 0x80,
            opcode,
            key_length: key.len() as u16,
            extra_length: extras.len() as u8,
            total_body: (extras.len() + key.len() + value.len()) as u32,
            opaque: 0,
            cas: 0,
            body,
        }
    }

    fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.body.len());
        out.push(self.magic);
        out.push(self.opcode);
        out.extend_from_slice(&self.key_length.to_be_bytes());
        out.push(self.extra_length);
        out.push(0x00); // data type
        out.extend_from_slice(&0u16.to_be_bytes()); // vbucket
        out.extend_from_slice(&self.total_body.to_be_bytes());
        out.extend_from_slice(&self.opaque.to_be_bytes());
        out.extend_from_slice(&self.cas.to_be_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}

fn set_extras(flags: u32, expiry: u32) -> Vec<u8> {
    let mut extras = flags.to_be_bytes().to_vec();
    extras.extend_from_slice(&expiry.to_be_bytes());
    extras
}

fn decode(bytes: Vec<u8>) -> (Result<(Request, RequestKind), DecodeError>, u64) {
    let mut cursor = Cursor::new(bytes);
    let result = BinaryDecoder::new().decode(&mut cursor);
    (result, cursor.position())
}

/// Stream that fails with a fixed error kind after `limit` bytes
struct FailingStream {
    inner: Cursor<Vec<u8>>,
    limit: usize,
    kind: io::ErrorKind,
}

impl Read for FailingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for FailingStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let position = self.inner.position() as usize;
        if position >= self.limit {
            return Err(io::Error::new(self.kind, "injected failure"));
        }
        let data = self.inner.get_ref();
        let end = self.limit.min(data.len());
        Ok(&data[position..end])
    }

    fn consume(&mut self, amount: usize) {
        self.inner.set_position(self.inner.position() + amount as u64);
    }
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_parse_fields() {
    let mut frame = Frame::new(0x02, &set_extras(1, 2), b"Hello", b"World");
    frame.opaque = 0xcafebabe;
    frame.cas = 0x0102030405060708;
    let bytes = frame.bytes();

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes.copy_from_slice(&bytes[..HEADER_SIZE]);
    let header = RequestHeader::parse(&header_bytes);

    assert_eq!(header.magic, 0x80);
    assert_eq!(header.opcode, 0x02);
    assert_eq!(header.key_length, 5);
    assert_eq!(header.extra_length, 8);
    assert_eq!(header.data_type, 0);
    assert_eq!(header.vbucket_id, 0);
    assert_eq!(header.total_body_length, 18);
    assert_eq!(header.opaque, 0xcafebabe);
    assert_eq!(header.cas, 0x0102030405060708);
    assert_eq!(header.value_length(), Some(5));
}

#[test]
fn test_header_value_length_underflow() {
    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes[0] = 0x80;
    header_bytes[3] = 10; // key length
    header_bytes[4] = 8; // extra length
    header_bytes[11] = 17; // total body
    let header = RequestHeader::parse(&header_bytes);

    assert_eq!(header.value_length(), None);
}

#[test]
fn test_opcode_table() {
    assert_eq!(Opcode::try_from(0x00), Ok(Opcode::Get));
    assert_eq!(Opcode::try_from(0x02), Ok(Opcode::Set));
    assert_eq!(Opcode::try_from(0x04), Ok(Opcode::Delete));
    assert_eq!(Opcode::try_from(0x1c), Ok(Opcode::Touch));
    assert_eq!(Opcode::try_from(0x01), Err(0x01));
}

// =============================================================================
// Request Decoding Tests
// =============================================================================

#[test]
fn test_decode_get() {
    let frame = Frame::new(0x00, &[], b"Hello", &[]);
    let (result, consumed) = decode(frame.bytes());

    let (request, kind) = result.unwrap();
    assert_eq!(kind, RequestKind::Get);
    assert_eq!(
        request,
        Request::Get {
            keys: vec![b"Hello".to_vec().into()],
            opaques: vec![0],
        }
    );
    assert_eq!(consumed, 29);
}

#[test]
fn test_decode_get_keeps_opaque() {
    let mut frame = Frame::new(0x00, &[], b"k", &[]);
    frame.opaque = 0xdeadbeef;
    let (result, _) = decode(frame.bytes());

    match result.unwrap().0 {
        Request::Get { keys, opaques } => {
            assert_eq!(keys.len(), 1);
            assert_eq!(opaques, vec![0xdeadbeef]);
        }
        other => panic!("Expected GET request, got {:?}", other),
    }
}

#[test]
fn test_decode_set() {
    let frame = Frame::new(0x02, &set_extras(0xdeadbeef, 0x00000e10), b"Hello", b"World");
    assert_eq!(frame.total_body, 0x12);
    let (result, consumed) = decode(frame.bytes());

    let (request, kind) = result.unwrap();
    assert_eq!(kind, RequestKind::Set);
    assert_eq!(
        request,
        Request::Set {
            key: b"Hello".to_vec().into(),
            flags: 0xdeadbeef,
            expiry: Expiry::Seconds(0x00000e10),
            length: 5,
        }
    );
    // Header + extras + key; the value stays on the stream.
    assert_eq!(consumed, 24 + 8 + 5);
}

#[test]
fn test_decode_set_length_follows_header_arithmetic() {
    for value_len in [0usize, 1, 100, 4096] {
        let value = vec![b'v'; value_len];
        let frame = Frame::new(0x02, &set_extras(0, 0), b"key", &value);
        let (result, _) = decode(frame.bytes());

        match result.unwrap().0 {
            Request::Set { length, .. } => assert_eq!(length as usize, value_len),
            other => panic!("Expected SET request, got {:?}", other),
        }
    }
}

#[test]
fn test_decode_delete() {
    let frame = Frame::new(0x04, &[], b"Hello", &[]);
    let (result, consumed) = decode(frame.bytes());

    let (request, kind) = result.unwrap();
    assert_eq!(kind, RequestKind::Delete);
    assert_eq!(request, Request::Delete { key: b"Hello".to_vec().into() });
    assert_eq!(consumed, 29);
}

#[test]
fn test_decode_touch() {
    let frame = Frame::new(0x1c, &0x00000e10u32.to_be_bytes(), b"Hello", &[]);
    let (result, consumed) = decode(frame.bytes());

    let (request, kind) = result.unwrap();
    assert_eq!(kind, RequestKind::Touch);
    assert_eq!(
        request,
        Request::Touch {
            key: b"Hello".to_vec().into(),
            expiry: Expiry::Seconds(3600),
        }
    );
    assert_eq!(consumed, 24 + 4 + 5);
}

#[test]
fn test_decode_empty_key() {
    let frame = Frame::new(0x04, &[], b"", &[]);
    let (result, consumed) = decode(frame.bytes());

    assert_eq!(result.unwrap().0, Request::Delete { key: Default::default() });
    assert_eq!(consumed, 24);
}

#[test]
fn test_decode_binary_key() {
    let key = [0x00, 0xff, 0x80, 0x0a];
    let frame = Frame::new(0x00, &[], &key, &[]);
    let (result, _) = decode(frame.bytes());

    match result.unwrap().0 {
        Request::Get { keys, .. } => assert_eq!(&keys[0][..], &key),
        other => panic!("Expected GET request, got {:?}", other),
    }
}

#[test]
fn test_decode_consecutive_frames() {
    let mut bytes = Frame::new(0x00, &[], b"a", &[]).bytes();
    bytes.extend(Frame::new(0x04, &[], b"b", &[]).bytes());
    bytes.extend(Frame::new(0x1c, &[0, 0, 0, 9], b"c", &[]).bytes());

    let decoder = BinaryDecoder::new();
    let mut cursor = Cursor::new(bytes);
    let kinds: Vec<RequestKind> = (0..3)
        .map(|_| decoder.decode(&mut cursor).unwrap().1)
        .collect();

    assert_eq!(kinds, vec![RequestKind::Get, RequestKind::Delete, RequestKind::Touch]);
    assert!(decoder.decode(&mut cursor).unwrap_err().is_stream_closed());
}

#[test]
fn test_decode_is_pure() {
    let bytes = Frame::new(0x02, &set_extras(7, 8), b"same", b"value").bytes();

    let (first, _) = decode(bytes.clone());
    let (second, _) = decode(bytes);

    assert_eq!(first.unwrap(), second.unwrap());
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_malformed_length() {
    let mut frame = Frame::new(0x02, &set_extras(1, 2), b"Hello", &[]);
    frame.total_body = 12; // shorter than 8 + 5
    let (result, consumed) = decode(frame.bytes());

    match result.unwrap_err() {
        DecodeError::MalformedLength {
            total_body,
            extra_length,
            key_length,
        } => {
            assert_eq!(total_body, 12);
            assert_eq!(extra_length, 8);
            assert_eq!(key_length, 5);
        }
        other => panic!("Expected MalformedLength, got {:?}", other),
    }
    assert_eq!(consumed, HEADER_SIZE as u64);
}

#[test]
fn test_malformed_length_huge_key() {
    let mut frame = Frame::new(0x02, &set_extras(0, 0), b"k", &[]);
    frame.key_length = u16::MAX;
    frame.total_body = 8;
    let (result, _) = decode(frame.bytes());

    assert!(matches!(result, Err(DecodeError::MalformedLength { .. })));
}

#[test]
fn test_malformed_length_without_value() {
    // Key length past the declared body must fail for every opcode, not only SET.
    let frames = [
        Frame::new(0x00, &[], b"Hello", &[]),
        Frame::new(0x04, &[], b"Hello", &[]),
        Frame::new(0x1c, &[0, 0, 0, 1], b"Hello", &[]),
    ];

    for mut frame in frames {
        frame.key_length = 0xffff;
        let opcode = frame.opcode;
        let (result, consumed) = decode(frame.bytes());

        match result {
            Err(DecodeError::MalformedLength { key_length, .. }) => {
                assert_eq!(key_length, 0xffff)
            }
            other => panic!("opcode 0x{:02x}: expected MalformedLength, got {:?}", opcode, other),
        }
        assert_eq!(consumed, HEADER_SIZE as u64);
    }
}

#[test]
fn test_oversized_key_does_not_swallow_next_frame() {
    let mut first = Frame::new(0x00, &[], b"a", &[]);
    first.key_length = 0x1000;
    let mut bytes = first.bytes();
    bytes.extend(Frame::new(0x04, &[], b"b", &[]).bytes());

    let decoder = BinaryDecoder::new();
    let mut cursor = Cursor::new(bytes);

    assert!(matches!(
        decoder.decode(&mut cursor),
        Err(DecodeError::MalformedLength { .. })
    ));
    assert_eq!(cursor.position(), HEADER_SIZE as u64);
}

#[test]
fn test_extras_length_mismatch() {
    let mut set_without_extras = Frame::new(0x02, &set_extras(1, 2), b"key", b"value");
    set_without_extras.extra_length = 0;
    let mut touch_with_set_extras = Frame::new(0x1c, &[0, 0, 0, 1], b"key", &[]);
    touch_with_set_extras.extra_length = 8;

    let cases = [
        (0x02, set_without_extras),
        (0x00, Frame::new(0x00, &[0, 0, 0, 1], b"key", &[])),
        (0x04, Frame::new(0x04, &set_extras(0, 0), b"key", &[])),
        (0x1c, touch_with_set_extras),
    ];

    for (opcode, frame) in cases {
        let (result, consumed) = decode(frame.bytes());

        match result {
            Err(DecodeError::Malformed(msg)) => {
                assert!(
                    msg.contains(&format!("opcode 0x{:02x}", opcode)),
                    "unexpected message: {}",
                    msg
                );
            }
            other => panic!("opcode 0x{:02x}: expected Malformed, got {:?}", opcode, other),
        }
        assert_eq!(consumed, HEADER_SIZE as u64);
    }
}

#[test]
fn test_opcode_extras_length() {
    assert_eq!(Opcode::Get.extras_length(), 0);
    assert_eq!(Opcode::Set.extras_length(), 8);
    assert_eq!(Opcode::Delete.extras_length(), 0);
    assert_eq!(Opcode::Touch.extras_length(), 4);
}

#[test]
fn test_empty_stream_is_stream_closed() {
    let (result, _) = decode(Vec::new());
    assert!(result.unwrap_err().is_stream_closed());
}

#[test]
fn test_truncated_header_is_stream_closed() {
    let bytes = Frame::new(0x00, &[], b"Hello", &[]).bytes();
    for cut in [1, 12, 23] {
        let (result, _) = decode(bytes[..cut].to_vec());
        assert!(
            matches!(result, Err(DecodeError::StreamClosed)),
            "cut at {} gave {:?}",
            cut,
            result
        );
    }
}

#[test]
fn test_truncated_fields_are_tagged() {
    let bytes = Frame::new(0x02, &set_extras(1, 2), b"Hello", b"World").bytes();
    let cases = [(26, Field::Flags), (30, Field::Expiry), (34, Field::Key)];

    for (cut, expected) in cases {
        let (result, _) = decode(bytes[..cut].to_vec());
        match result {
            Err(DecodeError::Io { field, source }) => {
                assert_eq!(field, expected);
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("cut at {}: expected Io error, got {:?}", cut, other),
        }
    }
}

#[test]
fn test_truncated_touch_expiry() {
    let bytes = Frame::new(0x1c, &[0, 0, 0, 1], b"key", &[]).bytes();
    let (result, _) = decode(bytes[..26].to_vec());

    assert!(matches!(
        result,
        Err(DecodeError::Io {
            field: Field::Expiry,
            ..
        })
    ));
}

#[test]
fn test_header_io_failure() {
    let mut stream = FailingStream {
        inner: Cursor::new(Frame::new(0x00, &[], b"k", &[]).bytes()),
        limit: 10,
        kind: io::ErrorKind::ConnectionReset,
    };
    let result = BinaryDecoder::new().decode(&mut stream);

    match result {
        Err(e @ DecodeError::Io { field: Field::Header, .. }) => assert!(e.is_disconnect()),
        other => panic!("Expected header Io error, got {:?}", other),
    }
}

#[test]
fn test_key_io_failure() {
    let mut stream = FailingStream {
        inner: Cursor::new(Frame::new(0x04, &[], b"Hello", &[]).bytes()),
        limit: 26,
        kind: io::ErrorKind::Other,
    };
    let result = BinaryDecoder::new().decode(&mut stream);

    match result {
        Err(e @ DecodeError::Io { field: Field::Key, .. }) => assert!(!e.is_disconnect()),
        other => panic!("Expected key Io error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_opcode() {
    let frame = Frame::new(0x0a, &[], &[], &[]); // noop
    let (result, _) = decode(frame.bytes());

    let err = result.unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedOpcode(0x0a)));
    assert!(err.to_string().contains("unsupported opcode: 0x0a"));
}

#[test]
fn test_invalid_magic_rejected() {
    let mut frame = Frame::new(0x00, &[], b"Hello", &[]);
    frame.magic = 0x81;
    let (result, consumed) = decode(frame.bytes());

    assert!(matches!(result, Err(DecodeError::InvalidMagic(0x81))));
    assert_eq!(consumed, HEADER_SIZE as u64);
}

#[test]
fn test_lenient_magic_accepted() {
    let mut frame = Frame::new(0x00, &[], b"Hello", &[]);
    frame.magic = 0x00;
    let decoder = BinaryDecoder::new().with_strict_magic(false);
    assert!(!decoder.strict_magic());

    let (request, kind) = decoder.decode(&mut Cursor::new(frame.bytes())).unwrap();
    assert_eq!(kind, RequestKind::Get);
    assert_eq!(request.kind(), RequestKind::Get);
}
