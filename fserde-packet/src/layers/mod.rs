//! Protocol layers of a frame description
//!
//! Each layer type parses its option list, backfills unset fields from the
//! same layer of a defaults template, and writes its header into the frame
//! buffer. [`Layer`] is the closed set of layer types; [`LayerKind`] names
//! them.

mod control;
mod ether;
mod icmp;
mod ipv4;
mod ipv6;
mod payload;
mod sctp;
mod synthetic;
mod tcp;
mod udp;
mod vlan;
mod vxlan;

pub use control::{CountLayer, DefaultsLayer};
pub use ether::EtherLayer;
pub use icmp::{IcmpHeader, Icmpv4Layer, Icmpv6Layer};
pub use ipv4::Ipv4Layer;
pub use ipv6::Ipv6Layer;
pub use payload::{FillPattern, PayloadLayer};
pub use sctp::SctpLayer;
pub use synthetic::{EchoLayer, TscLayer};
pub use tcp::{TcpFlags, TcpLayer};
pub use udp::UdpLayer;
pub use vlan::{Dot1ADLayer, Dot1QLayer, QinQLayer, VlanTag};
pub use vxlan::VxlanLayer;

use crate::buffer::FrameBuffer;
use fserde_core::{ip_protocols, Error, Result};
use std::fmt;
use std::str::FromStr;

/// Operations every layer type implements
pub trait LayerCodec: fmt::Debug + fmt::Display + Clone + Default {
    /// Kind this type implements
    const KIND: LayerKind;

    /// Apply the raw option text found between the layer's parentheses
    fn parse(&mut self, options: &str) -> Result<()>;

    /// Copy fields from `defaults` into fields that are still unset
    fn apply_defaults(&mut self, defaults: &Self);

    /// Fill the layer's own fallback values into fields that are still unset.
    ///
    /// Runs right after `parse` for normal frames, before template defaults.
    fn apply_builtin_defaults(&mut self) {}

    /// Number of bytes this layer contributes to the frame
    fn header_len(&self) -> usize;

    /// Append (or splice) this layer's bytes into the frame buffer
    fn write(&self, buf: &mut FrameBuffer) -> Result<()>;
}

/// Name of a layer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Ether,
    Dot1Q,
    QinQ,
    Dot1AD,
    IPv4,
    IPv6,
    Tcp,
    Udp,
    Icmpv4,
    Icmpv6,
    Sctp,
    VxLan,
    Echo,
    Tsc,
    Payload,
    Count,
    Defaults,
}

impl LayerKind {
    pub const ALL: [LayerKind; 17] = [
        LayerKind::Ether,
        LayerKind::Dot1Q,
        LayerKind::QinQ,
        LayerKind::Dot1AD,
        LayerKind::IPv4,
        LayerKind::IPv6,
        LayerKind::Tcp,
        LayerKind::Udp,
        LayerKind::Icmpv4,
        LayerKind::Icmpv6,
        LayerKind::Sctp,
        LayerKind::VxLan,
        LayerKind::Echo,
        LayerKind::Tsc,
        LayerKind::Payload,
        LayerKind::Count,
        LayerKind::Defaults,
    ];

    /// Canonical spelling used when rendering frames
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Ether => "Ether",
            LayerKind::Dot1Q => "Dot1Q",
            LayerKind::QinQ => "QinQ",
            LayerKind::Dot1AD => "Dot1AD",
            LayerKind::IPv4 => "IPv4",
            LayerKind::IPv6 => "IPv6",
            LayerKind::Tcp => "TCP",
            LayerKind::Udp => "UDP",
            LayerKind::Icmpv4 => "ICMPv4",
            LayerKind::Icmpv6 => "ICMPv6",
            LayerKind::Sctp => "SCTP",
            LayerKind::VxLan => "VxLan",
            LayerKind::Echo => "Echo",
            LayerKind::Tsc => "TSC",
            LayerKind::Payload => "Payload",
            LayerKind::Count => "Count",
            LayerKind::Defaults => "Defaults",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// 802.1Q / 802.1ad tag layers, written between the MACs and the EtherType
    pub fn is_vlan_tag(self) -> bool {
        matches!(self, LayerKind::Dot1Q | LayerKind::QinQ | LayerKind::Dot1AD)
    }

    /// Layers that steer frame construction and never emit bytes
    pub fn is_control(self) -> bool {
        matches!(self, LayerKind::Echo | LayerKind::Count | LayerKind::Defaults)
    }

    /// IP protocol number carried by an L4 layer
    pub fn ip_protocol(self) -> Option<u8> {
        match self {
            LayerKind::Tcp => Some(ip_protocols::TCP),
            LayerKind::Udp => Some(ip_protocols::UDP),
            LayerKind::Icmpv4 => Some(ip_protocols::ICMP),
            LayerKind::Icmpv6 => Some(ip_protocols::ICMPV6),
            LayerKind::Sctp => Some(ip_protocols::SCTP),
            _ => None,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::UnknownLayer(s.trim().to_string()))
    }
}

/// A parsed layer of any kind
#[derive(Debug, Clone)]
pub enum Layer {
    Ether(EtherLayer),
    Dot1Q(Dot1QLayer),
    QinQ(QinQLayer),
    Dot1AD(Dot1ADLayer),
    IPv4(Ipv4Layer),
    IPv6(Ipv6Layer),
    Tcp(TcpLayer),
    Udp(UdpLayer),
    Icmpv4(Icmpv4Layer),
    Icmpv6(Icmpv6Layer),
    Sctp(SctpLayer),
    VxLan(VxlanLayer),
    Echo(EchoLayer),
    Tsc(TscLayer),
    Payload(PayloadLayer),
    Count(CountLayer),
    Defaults(DefaultsLayer),
}

/// Runs `$body` with `$inner` bound to the layer struct inside `$layer`
macro_rules! with_layer {
    ($layer:expr, $inner:ident => $body:expr) => {
        match $layer {
            Layer::Ether($inner) => $body,
            Layer::Dot1Q($inner) => $body,
            Layer::QinQ($inner) => $body,
            Layer::Dot1AD($inner) => $body,
            Layer::IPv4($inner) => $body,
            Layer::IPv6($inner) => $body,
            Layer::Tcp($inner) => $body,
            Layer::Udp($inner) => $body,
            Layer::Icmpv4($inner) => $body,
            Layer::Icmpv6($inner) => $body,
            Layer::Sctp($inner) => $body,
            Layer::VxLan($inner) => $body,
            Layer::Echo($inner) => $body,
            Layer::Tsc($inner) => $body,
            Layer::Payload($inner) => $body,
            Layer::Count($inner) => $body,
            Layer::Defaults($inner) => $body,
        }
    };
}

fn kind_of<L: LayerCodec>(_: &L) -> LayerKind {
    L::KIND
}

impl Layer {
    /// Empty layer of the given kind
    pub fn new(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Ether => Layer::Ether(EtherLayer::default()),
            LayerKind::Dot1Q => Layer::Dot1Q(Dot1QLayer::default()),
            LayerKind::QinQ => Layer::QinQ(QinQLayer::default()),
            LayerKind::Dot1AD => Layer::Dot1AD(Dot1ADLayer::default()),
            LayerKind::IPv4 => Layer::IPv4(Ipv4Layer::default()),
            LayerKind::IPv6 => Layer::IPv6(Ipv6Layer::default()),
            LayerKind::Tcp => Layer::Tcp(TcpLayer::default()),
            LayerKind::Udp => Layer::Udp(UdpLayer::default()),
            LayerKind::Icmpv4 => Layer::Icmpv4(Icmpv4Layer::default()),
            LayerKind::Icmpv6 => Layer::Icmpv6(Icmpv6Layer::default()),
            LayerKind::Sctp => Layer::Sctp(SctpLayer::default()),
            LayerKind::VxLan => Layer::VxLan(VxlanLayer::default()),
            LayerKind::Echo => Layer::Echo(EchoLayer::default()),
            LayerKind::Tsc => Layer::Tsc(TscLayer::default()),
            LayerKind::Payload => Layer::Payload(PayloadLayer::default()),
            LayerKind::Count => Layer::Count(CountLayer::default()),
            LayerKind::Defaults => Layer::Defaults(DefaultsLayer::default()),
        }
    }

    /// Construct a layer of `kind` and parse `options` into it
    pub fn parse(kind: LayerKind, options: &str) -> Result<Self> {
        let mut layer = Layer::new(kind);
        with_layer!(&mut layer, l => l.parse(options))?;
        Ok(layer)
    }

    pub fn kind(&self) -> LayerKind {
        with_layer!(self, l => kind_of(l))
    }

    pub fn header_len(&self) -> usize {
        with_layer!(self, l => l.header_len())
    }

    pub fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        with_layer!(self, l => l.write(buf))
    }

    pub fn apply_builtin_defaults(&mut self) {
        with_layer!(self, l => l.apply_builtin_defaults())
    }

    /// Backfill from a layer of the same kind; other kinds are ignored
    pub fn apply_defaults(&mut self, defaults: &Layer) {
        match (self, defaults) {
            (Layer::Ether(l), Layer::Ether(d)) => l.apply_defaults(d),
            (Layer::Dot1Q(l), Layer::Dot1Q(d)) => l.apply_defaults(d),
            (Layer::QinQ(l), Layer::QinQ(d)) => l.apply_defaults(d),
            (Layer::Dot1AD(l), Layer::Dot1AD(d)) => l.apply_defaults(d),
            (Layer::IPv4(l), Layer::IPv4(d)) => l.apply_defaults(d),
            (Layer::IPv6(l), Layer::IPv6(d)) => l.apply_defaults(d),
            (Layer::Tcp(l), Layer::Tcp(d)) => l.apply_defaults(d),
            (Layer::Udp(l), Layer::Udp(d)) => l.apply_defaults(d),
            (Layer::Icmpv4(l), Layer::Icmpv4(d)) => l.apply_defaults(d),
            (Layer::Icmpv6(l), Layer::Icmpv6(d)) => l.apply_defaults(d),
            (Layer::Sctp(l), Layer::Sctp(d)) => l.apply_defaults(d),
            (Layer::VxLan(l), Layer::VxLan(d)) => l.apply_defaults(d),
            (Layer::Echo(l), Layer::Echo(d)) => l.apply_defaults(d),
            (Layer::Tsc(l), Layer::Tsc(d)) => l.apply_defaults(d),
            (Layer::Payload(l), Layer::Payload(d)) => l.apply_defaults(d),
            (Layer::Count(l), Layer::Count(d)) => l.apply_defaults(d),
            (Layer::Defaults(l), Layer::Defaults(d)) => l.apply_defaults(d),
            _ => {}
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_layer!(self, l => fmt::Display::fmt(l, f))
    }
}
