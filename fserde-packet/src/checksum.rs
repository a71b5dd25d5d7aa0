//! Checksum calculations for frame layers
//!
//! This module provides the Internet Checksum (RFC 1071) used by the IPv4
//! header and by TCP, UDP and ICMP, the IPv4/IPv6 pseudo-header sums for
//! transport checksums, and the CRC-32c checksum used by SCTP.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Adds the 16-bit big-endian words of `data` to `initial` without folding.
///
/// An odd trailing byte is counted as the high byte of a final word.
pub fn checksum_accumulate(initial: u64, data: &[u8]) -> u64 {
    let mut sum = initial;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u64;
    }

    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u64) << 8;
    }

    sum
}

/// Folds a running sum to 16 bits and takes the one's complement.
pub fn finish_checksum(mut sum: u64) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Calculates the Internet Checksum as defined in RFC 1071.
///
/// # Arguments
///
/// * `data` - The data to calculate the checksum for
///
/// # Examples
///
/// ```
/// use fserde_packet::checksum::internet_checksum;
///
/// let data = vec![0x45, 0x00, 0x00, 0x3c];
/// let checksum = internet_checksum(&data);
/// assert_eq!(checksum, !0x453cu16);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    finish_checksum(checksum_accumulate(0, data))
}

/// Sum of the 12-byte IPv4 pseudo-header.
///
/// Source address, destination address, a zero byte, the protocol number and
/// the transport segment length.
pub fn ipv4_pseudo_header_sum(src: &Ipv4Addr, dst: &Ipv4Addr, protocol: u8, length: u16) -> u64 {
    let mut sum = checksum_accumulate(0, &src.octets());
    sum = checksum_accumulate(sum, &dst.octets());
    sum += protocol as u64;
    sum + length as u64
}

/// Sum of the IPv6 pseudo-header.
///
/// Both 128-bit addresses, the 32-bit upper-layer length and the next header.
pub fn ipv6_pseudo_header_sum(src: &Ipv6Addr, dst: &Ipv6Addr, next_header: u8, length: u32) -> u64 {
    let mut sum = checksum_accumulate(0, &src.octets());
    sum = checksum_accumulate(sum, &dst.octets());
    sum = checksum_accumulate(sum, &length.to_be_bytes());
    sum + next_header as u64
}

/// Transport checksum over IPv4.
///
/// `segment` is the L4 header (checksum field zeroed) plus its payload. A
/// result of zero is returned as `0xFFFF`.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use fserde_packet::checksum::ipv4_transport_checksum;
///
/// let segment = [0x00, 0x35, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00];
/// let src = Ipv4Addr::new(192, 168, 1, 1);
/// let dst = Ipv4Addr::new(192, 168, 1, 2);
/// assert_ne!(ipv4_transport_checksum(&src, &dst, 17, &segment), 0);
/// ```
pub fn ipv4_transport_checksum(src: &Ipv4Addr, dst: &Ipv4Addr, protocol: u8, segment: &[u8]) -> u16 {
    let sum = ipv4_pseudo_header_sum(src, dst, protocol, segment.len() as u16);
    nonzero(finish_checksum(checksum_accumulate(sum, segment)))
}

/// Transport checksum over IPv6. A result of zero is returned as `0xFFFF`.
pub fn ipv6_transport_checksum(src: &Ipv6Addr, dst: &Ipv6Addr, next_header: u8, segment: &[u8]) -> u16 {
    let sum = ipv6_pseudo_header_sum(src, dst, next_header, segment.len() as u32);
    nonzero(finish_checksum(checksum_accumulate(sum, segment)))
}

/// ICMPv4 checksum (no pseudo-header). A result of zero is returned as `0xFFFF`.
pub fn icmpv4_checksum(message: &[u8]) -> u16 {
    nonzero(internet_checksum(message))
}

/// SCTP CRC-32c over the whole packet with the checksum field zeroed
pub fn sctp_checksum(packet: &[u8]) -> u32 {
    crc32c::crc32c(packet)
}

/// Validates an Internet checksum.
///
/// The checksum over data that includes a correct checksum field folds to
/// zero (or `0xFFFF`, which is equivalent in one's complement).
pub fn validate_checksum(data: &[u8]) -> bool {
    let result = internet_checksum(data);
    result == 0 || result == 0xFFFF
}

fn nonzero(checksum: u16) -> u16 {
    if checksum == 0 {
        0xFFFF
    } else {
        checksum
    }
}
