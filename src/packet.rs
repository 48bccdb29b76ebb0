//! The fixed-size NRPE v2 packet and its codec.

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;

use crate::{crc32, padding, Error};

/// Number of bytes in a packet's data area.
pub const MAX_PACKET_DATA_LEN: usize = 1024;

/// Total on-wire size of an NRPE v2 packet.
///
/// 10 bytes of header, [`MAX_PACKET_DATA_LEN`] bytes of data area, and 2
/// trailing padding bytes.
pub const PACKET_LEN: usize = MAX_PACKET_DATA_LEN + 12;

/// The only protocol version this crate speaks.
const NRPE_PACKET_VERSION_2: u16 = 2;

// Field windows into the 1036-byte buffer. All integers are big-endian.
const VERSION_RANGE: Range<usize> = 0..2;
const TYPE_RANGE: Range<usize> = 2..4;
const CRC_RANGE: Range<usize> = 4..8;
const STATUS_RANGE: Range<usize> = 8..10;
const DATA_RANGE: Range<usize> = 10..10 + MAX_PACKET_DATA_LEN;

/// The type of an NRPE v2 packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PacketType {
    /// A client-to-server packet carrying a `!`-joined command.
    Query = 1,

    /// A server-to-client packet carrying a status line and status code.
    Response = 2,
}

/// A single NRPE v2 packet, owning its 1036-byte wire buffer.
///
/// The buffer is pre-filled with pseudo-random bytes before any protocol
/// field is written, so the slack after the data area's NUL terminator and
/// the two trailing padding bytes are never zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    buf: BytesMut,
}

impl Packet {
    /// Builds a packet of the given type carrying `payload` in its data area.
    ///
    /// The payload is truncated to [`MAX_PACKET_DATA_LEN`]` - 1` bytes and
    /// NUL-terminated; the CRC field is computed over the whole packet with
    /// the field itself zeroed, then written in place.
    pub fn build(packet_type: PacketType, status_code: u16, payload: &[u8]) -> Self {
        let mut buf = BytesMut::zeroed(PACKET_LEN);
        padding::randomize(&mut buf);

        BigEndian::write_u16(&mut buf[VERSION_RANGE], NRPE_PACKET_VERSION_2);
        BigEndian::write_u16(&mut buf[TYPE_RANGE], packet_type as u16);
        BigEndian::write_u32(&mut buf[CRC_RANGE], 0);
        BigEndian::write_u16(&mut buf[STATUS_RANGE], status_code);

        let data = &mut buf[DATA_RANGE];
        let len = payload.len().min(MAX_PACKET_DATA_LEN - 1);
        data[..len].copy_from_slice(&payload[..len]);
        data[len] = 0;

        let crc = crc32::checksum(&buf);
        BigEndian::write_u32(&mut buf[CRC_RANGE], crc);

        Self { buf }
    }

    /// Wraps a buffer read off the wire.
    ///
    /// The framing layer guarantees `buf` holds exactly [`PACKET_LEN`] bytes.
    pub(crate) fn from_buf(buf: BytesMut) -> Self {
        debug_assert_eq!(buf.len(), PACKET_LEN);
        Self { buf }
    }

    /// Validates the packet type and CRC32 of a received packet.
    ///
    /// The type field is checked first ([`Error::WrongType`]), then the CRC
    /// field is captured, zeroed in place, and the checksum recomputed over
    /// the buffer ([`Error::BadCrc`] on mismatch). The CRC field is not
    /// restored - a packet is consumed by verification.
    pub fn verify(&mut self, expected: PacketType) -> Result<(), Error> {
        let got = self.packet_type_raw();
        if got != expected as u16 {
            return Err(Error::WrongType {
                got,
                expected: expected as u16,
            });
        }

        let want = BigEndian::read_u32(&self.buf[CRC_RANGE]);
        self.buf[CRC_RANGE].fill(0);

        if crc32::checksum(&self.buf) != want {
            return Err(Error::BadCrc);
        }

        Ok(())
    }

    /// Returns the data area up to (excluding) the first NUL byte, or `None`
    /// when the data area carries no terminator at all.
    ///
    /// A terminator at offset 0 yields `Some(&[])`. The `None` case is an
    /// invalid request server-side, and an empty status line client-side.
    pub fn payload(&self) -> Option<&[u8]> {
        let data = &self.buf[DATA_RANGE];
        data.iter().position(|&b| b == 0).map(|nul| &data[..nul])
    }

    /// The protocol version field.
    pub fn version(&self) -> u16 {
        BigEndian::read_u16(&self.buf[VERSION_RANGE])
    }

    /// The raw status code field.
    pub fn status_code(&self) -> u16 {
        BigEndian::read_u16(&self.buf[STATUS_RANGE])
    }

    /// The raw packet type field.
    pub(crate) fn packet_type_raw(&self) -> u16 {
        BigEndian::read_u16(&self.buf[TYPE_RANGE])
    }

    /// The full 1036-byte wire representation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_build_header_fields() {
        let p = Packet::build(PacketType::Query, 0, b"check_foo!1");

        assert_eq!(p.as_bytes().len(), PACKET_LEN);
        assert_eq!(p.version(), 2);
        assert_eq!(p.packet_type_raw(), 1);
        assert_eq!(p.status_code(), 0);
        assert_eq!(p.payload(), Some(b"check_foo!1".as_ref()));
    }

    #[test]
    fn test_build_crc_is_self_consistent() {
        let p = Packet::build(PacketType::Response, 2, b"CRITICAL - busted");

        let mut zeroed = p.as_bytes().to_vec();
        let want = BigEndian::read_u32(&zeroed[CRC_RANGE]);
        zeroed[CRC_RANGE].fill(0);

        assert_eq!(crc32::checksum(&zeroed), want);
    }

    #[test]
    fn test_build_terminates_data_area() {
        let p = Packet::build(PacketType::Query, 0, b"check_foo");
        let data = &p.as_bytes()[DATA_RANGE];

        assert_eq!(&data[..9], b"check_foo");
        assert_eq!(data[9], 0);
    }

    #[test]
    fn test_build_empty_payload() {
        let p = Packet::build(PacketType::Response, 0, b"");
        assert_eq!(p.payload(), Some(b"".as_ref()));
    }

    #[test]
    fn test_build_truncates_payload() {
        let long = vec![b'x'; 1500];
        let p = Packet::build(PacketType::Response, 1, &long);
        let data = &p.as_bytes()[DATA_RANGE];

        assert_eq!(&data[..1023], &long[..1023]);
        assert_eq!(data[1023], 0);
        assert_eq!(p.payload(), Some(&long[..1023]));
    }

    #[test]
    fn test_build_payload_of_exactly_1023_bytes() {
        let line = vec![b'y'; 1023];
        let p = Packet::build(PacketType::Response, 0, &line);
        let data = &p.as_bytes()[DATA_RANGE];

        assert_eq!(&data[..1023], line.as_slice());
        assert_eq!(data[1023], 0);
    }

    #[test]
    fn test_payload_none_without_terminator() {
        let mut buf = BytesMut::zeroed(PACKET_LEN);
        buf.fill(b'A');
        let p = Packet::from_buf(buf);

        assert_eq!(p.payload(), None);
    }

    #[test]
    fn test_verify_fresh_packet() {
        let mut p = Packet::build(PacketType::Response, 0, b"OK");
        assert_eq!(p.verify(PacketType::Response), Ok(()));
    }

    #[test]
    fn test_verify_wrong_type() {
        let mut p = Packet::build(PacketType::Query, 0, b"check_foo");

        assert_eq!(
            p.verify(PacketType::Response),
            Err(Error::WrongType {
                got: 1,
                expected: 2,
            })
        );
    }

    #[test]
    fn test_verify_detects_crc_corruption() {
        let mut p = Packet::build(PacketType::Response, 0, b"OK");
        p.buf[4] = p.buf[4].wrapping_add(1);

        assert_eq!(p.verify(PacketType::Response), Err(Error::BadCrc));
    }

    proptest! {
        #[test]
        fn prop_corrupting_any_byte_fails_verify(
            payload in prop::collection::vec(any::<u8>(), 0..200),
            index in 0..PACKET_LEN,
            mask in 1_u8..,
        ) {
            let mut p = Packet::build(PacketType::Response, 0, &payload);

            prop_assert_eq!(p.clone().verify(PacketType::Response), Ok(()));

            p.buf[index] ^= mask;
            let got = p.verify(PacketType::Response);
            prop_assert!(
                matches!(got, Err(Error::WrongType { .. }) | Err(Error::BadCrc)),
                "corruption at {} not detected: {:?}", index, got
            );
        }
    }
}
