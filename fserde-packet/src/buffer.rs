//! Growable frame buffer
//!
//! Every frame owns one [`FrameBuffer`]. Layers append their header fields in
//! network byte order, VLAN tag layers insert their tags after the MAC
//! addresses, and the checksum pass patches fields at recorded offsets.

use bytes::{BufMut, BytesMut};
use fserde_core::{Error, MacAddr, Result};
use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Append-mostly byte buffer backing a frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    data: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.data.put_u8(value);
        self
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.data.put_u16(value);
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.data.put_u32(value);
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.data.put_u64(value);
        self
    }

    pub fn put_slice(&mut self, data: &[u8]) -> &mut Self {
        self.data.put_slice(data);
        self
    }

    pub fn put_mac(&mut self, mac: &MacAddr) -> &mut Self {
        self.put_slice(mac.as_bytes())
    }

    pub fn put_ipv4(&mut self, addr: &Ipv4Addr) -> &mut Self {
        self.put_slice(&addr.octets())
    }

    pub fn put_ipv6(&mut self, addr: &Ipv6Addr) -> &mut Self {
        self.put_slice(&addr.octets())
    }

    /// Append the contents of another buffer
    pub fn put_buffer(&mut self, other: &FrameBuffer) -> &mut Self {
        self.put_slice(other.as_slice())
    }

    /// Overwrite `data.len()` bytes starting at `offset`.
    ///
    /// The write must fit inside the current length; the buffer never grows.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= self.data.len())
            .ok_or(Error::BufferBoundsViolation {
                offset,
                len: data.len(),
                size: self.data.len(),
            })?;

        self.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    pub fn write_u16_at(&mut self, offset: usize, value: u16) -> Result<()> {
        self.write_at(offset, &value.to_be_bytes())
    }

    /// Insert `data` at `offset`, shifting the following bytes to the right.
    ///
    /// `offset` may equal the current length, which appends.
    pub fn insert_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::BufferBoundsViolation {
                offset,
                len: data.len(),
                size: self.data.len(),
            });
        }

        let tail = self.data.split_off(offset);
        self.data.reserve(data.len() + tail.len());
        self.data.put_slice(data);
        self.data.unsplit(tail);
        Ok(())
    }

    /// Hex dump, sixteen bytes per line with an offset column
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (line, chunk) in self.data.chunks(16).enumerate() {
            let _ = write!(out, "{:04x}:", line * 16);
            for (i, byte) in chunk.iter().enumerate() {
                if i == 8 {
                    out.push(' ');
                }
                let _ = write!(out, " {:02x}", byte);
            }
            out.push('\n');
        }
        out
    }
}

impl AsRef<[u8]> for FrameBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_appends_are_big_endian() {
        let mut buf = FrameBuffer::new();
        buf.put_u8(0x01)
            .put_u16(0x0203)
            .put_u32(0x0405_0607)
            .put_u64(0x0809_0a0b_0c0d_0e0f);

        assert_eq!(
            buf.as_slice(),
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]
        );
    }

    #[test]
    fn test_address_appends() {
        let mut buf = FrameBuffer::new();
        buf.put_mac(&MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]))
            .put_ipv4(&Ipv4Addr::new(10, 0, 0, 1))
            .put_ipv6(&Ipv6Addr::LOCALHOST);

        assert_eq!(buf.len(), 6 + 4 + 16);
        assert_eq!(&buf.as_slice()[6..10], &[10, 0, 0, 1]);
        assert_eq!(buf.as_slice()[25], 1);
    }

    #[test]
    fn test_put_buffer() {
        let mut a = FrameBuffer::new();
        a.put_u16(0xdead);
        let mut b = FrameBuffer::new();
        b.put_u16(0xbeef);
        a.put_buffer(&b);
        assert_eq!(a.as_slice(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_write_at_inside() {
        let mut buf = FrameBuffer::new();
        buf.put_slice(&[0u8; 8]);
        buf.write_u16_at(6, 0x1234).unwrap();
        assert_eq!(buf.as_slice(), &[0, 0, 0, 0, 0, 0, 0x12, 0x34]);
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_write_at_out_of_bounds() {
        let mut buf = FrameBuffer::new();
        buf.put_slice(&[0u8; 8]);

        let err = buf.write_at(6, &[0, 0, 0, 1]).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferBoundsViolation {
                offset: 6,
                len: 4,
                size: 8
            }
        ));
        assert!(buf.write_at(usize::MAX, &[1]).is_err());
    }

    #[test]
    fn test_insert_at_middle() {
        let mut buf = FrameBuffer::new();
        buf.put_slice(&[1, 2, 3, 4]);
        buf.insert_at(2, &[0xaa, 0xbb]).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 0xaa, 0xbb, 3, 4]);
    }

    #[test]
    fn test_insert_at_end_appends() {
        let mut buf = FrameBuffer::new();
        buf.put_slice(&[1, 2]);
        buf.insert_at(2, &[3]).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
        assert!(buf.insert_at(5, &[9]).is_err());
    }

    #[test]
    fn test_dump() {
        let mut buf = FrameBuffer::new();
        buf.put_slice(&[0xab; 18]);
        let dump = buf.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000: ab ab"));
        assert_eq!(lines[1], "0010: ab ab");
    }
}
