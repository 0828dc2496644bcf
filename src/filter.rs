//! Link-layer frame filtering.
//!
//! Every captured frame passes through here; anything that is not an
//! IPv4/UDP datagram for the configured port is silently discarded. That
//! is expected traffic filtering, not an error. Header fields are only
//! read after explicit length guards, so truncated captures are rejected
//! rather than misparsed.

use std::net::Ipv4Addr;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

/// Shortest frame that can carry a UDP datagram.
pub const MIN_FRAME_LEN: usize = ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN + UDP_HEADER_LEN;

const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];
const IP_PROTO_UDP: u8 = 17;

/// Extract the UDP payload from a raw Ethernet frame if it is an IPv4/UDP
/// datagram destined for `port` (and, when `origin` is set, sent from
/// that address). The payload length comes from the UDP header, not the
/// capture length; a capture shorter than the stated payload yields
/// `None`.
pub fn udp_payload<'a>(frame: &'a [u8], port: u16, origin: Option<Ipv4Addr>) -> Option<&'a [u8]> {
    if frame.len() < MIN_FRAME_LEN {
        return None;
    }
    if frame[12..14] != ETHERTYPE_IPV4 {
        return None;
    }
    // Header length is the low 4 bits of the first IP byte, in 32-bit words
    let ip_header_len = ((frame[ETHERNET_HEADER_LEN] & 0x0f) as usize) * 4;
    if ip_header_len < IPV4_MIN_HEADER_LEN {
        return None;
    }
    if frame[ETHERNET_HEADER_LEN + 9] != IP_PROTO_UDP {
        return None;
    }
    if let Some(addr) = origin {
        let saddr = &frame[ETHERNET_HEADER_LEN + 12..ETHERNET_HEADER_LEN + 16];
        if saddr != addr.octets() {
            return None;
        }
    }
    let udp_start = ETHERNET_HEADER_LEN + ip_header_len;
    if frame.len() < udp_start + UDP_HEADER_LEN {
        return None;
    }
    let dport = u16::from_be_bytes([frame[udp_start + 2], frame[udp_start + 3]]);
    if dport != port {
        return None;
    }
    let udp_len = u16::from_be_bytes([frame[udp_start + 4], frame[udp_start + 5]]) as usize;
    let payload_len = udp_len.checked_sub(UDP_HEADER_LEN)?;
    let payload_start = udp_start + UDP_HEADER_LEN;
    frame.get(payload_start..payload_start + payload_len)
}
