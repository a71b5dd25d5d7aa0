//! Frame registry and the text-to-bytes pipeline
//!
//! A frame description `Name := Layer(opts)/Layer(opts)/...` is split into
//! layer tokens, each token is parsed into its layer, and normal frames are
//! then resolved: template defaults are applied, length fields are fixed up,
//! the layers are written and transport checksums are patched in place.

use crate::checksum::{icmpv4_checksum, ipv4_transport_checksum, ipv6_transport_checksum, sctp_checksum};
use crate::frame::{Frame, ProtoInfo};
use crate::layers::{IcmpHeader, Ipv6Layer, Layer, LayerKind, SctpLayer, TcpLayer, UdpLayer};
use fserde_capture::{CaptureConfig, PacketCapture};
use fserde_core::{ethertypes, Error, FrameType, Result};
use regex::Regex;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use tracing::{debug, info};

/// Minimum Ethernet frame length without FCS
pub const MIN_FRAME_LEN: usize = 60;

/// Separator between the frame name and its layers
pub const NAME_SEPARATOR: &str = ":=";

/// Registry setup: defaults templates registered at creation
#[derive(Debug, Clone, Default)]
pub struct FrameSerdeConfig {
    pub defaults: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FrameKey {
    name: String,
    frame_type: FrameType,
}

impl FrameKey {
    fn new(name: &str, frame_type: FrameType) -> Self {
        Self {
            name: name.to_string(),
            frame_type,
        }
    }
}

/// Named frames of both types, in registration order per type
#[derive(Debug)]
pub struct FrameSerde {
    name: String,
    frames: HashMap<FrameKey, Frame>,
    names: HashMap<FrameType, Vec<String>>,
    defaults_pattern: Regex,
}

/// Addresses of the IP layer enclosing the transport layer
enum IpContext {
    V4 { src: Ipv4Addr, dst: Ipv4Addr },
    V6 { src: Ipv6Addr, dst: Ipv6Addr },
}

impl FrameSerde {
    /// Create an empty registry
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::config("frame registry name is empty"));
        }

        let defaults_pattern = Regex::new(r"(?i)defaults\s*\(")
            .map_err(|e| Error::config(format!("defaults pattern: {}", e)))?;

        Ok(Self {
            name: name.to_string(),
            frames: HashMap::new(),
            names: HashMap::new(),
            defaults_pattern,
        })
    }

    /// Create a registry and register the configured defaults templates
    pub fn with_config(name: &str, config: &FrameSerdeConfig) -> Result<Self> {
        let mut serde = Self::new(name)?;
        serde.add_frames(&config.defaults, FrameType::Default)?;
        Ok(serde)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse and register one frame description
    pub fn add(&mut self, text: &str, frame_type: FrameType) -> Result<&Frame> {
        let mut frame = self.parse_frame(text, frame_type)?;
        if frame_type == FrameType::Normal {
            self.resolve(&mut frame)?;
        }

        let key = FrameKey::new(frame.name(), frame_type);
        info!(
            "Registered {} frame '{}' ({} bytes)",
            frame_type,
            frame.name(),
            frame.len()
        );
        self.names
            .entry(frame_type)
            .or_default()
            .push(frame.name().to_string());
        Ok(&*self.frames.entry(key).or_insert(frame))
    }

    /// Register several frame descriptions, stopping at the first error
    pub fn add_frames<S: AsRef<str>>(&mut self, texts: &[S], frame_type: FrameType) -> Result<()> {
        for text in texts {
            self.add(text.as_ref(), frame_type)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str, frame_type: FrameType) -> Option<&Frame> {
        self.frames.get(&FrameKey::new(name, frame_type))
    }

    /// Like [`FrameSerde::get`] but failing with `FrameNotFound`
    pub fn frame(&self, name: &str, frame_type: FrameType) -> Result<&Frame> {
        self.get(name, frame_type)
            .ok_or_else(|| Error::FrameNotFound(name.to_string()))
    }

    /// Frame names of one type in registration order
    pub fn names(&self, frame_type: FrameType) -> &[String] {
        self.names
            .get(&frame_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Frames of one type in registration order
    pub fn frames(&self, frame_type: FrameType) -> impl Iterator<Item = &Frame> + '_ {
        self.names(frame_type)
            .iter()
            .filter_map(move |name| self.get(name, frame_type))
    }

    pub fn len(&self, frame_type: FrameType) -> usize {
        self.names(frame_type).len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Remove a frame. Frames already built from a deleted template keep
    /// their bytes.
    pub fn delete(&mut self, name: &str, frame_type: FrameType) -> Result<Frame> {
        let frame = self
            .frames
            .remove(&FrameKey::new(name, frame_type))
            .ok_or_else(|| Error::FrameNotFound(name.to_string()))?;

        if let Some(names) = self.names.get_mut(&frame_type) {
            names.retain(|n| n != name);
        }
        info!("Deleted {} frame '{}'", frame_type, name);
        Ok(frame)
    }

    /// Discard every frame
    pub fn clear(&mut self) {
        self.frames.clear();
        self.names.clear();
    }

    /// Build a capture of every frame of `frame_type`.
    ///
    /// Frames shorter than 60 bytes are zero-padded at the end and each frame
    /// is added as many times as its `Count`.
    pub fn capture(&self, frame_type: FrameType, config: CaptureConfig) -> PacketCapture {
        let mut capture = PacketCapture::with_config(config);
        for frame in self.frames(frame_type) {
            let mut data = frame.bytes().to_vec();
            if data.len() < MIN_FRAME_LEN {
                data.resize(MIN_FRAME_LEN, 0);
            }
            for _ in 0..frame.count() {
                capture.add_packet(&data);
            }
        }
        capture
    }

    /// Write every frame of `frame_type` to a pcap file
    pub fn write_pcap<P: AsRef<Path>>(&self, path: P, frame_type: FrameType) -> Result<()> {
        self.write_pcap_with(path, frame_type, CaptureConfig::default())
    }

    pub fn write_pcap_with<P: AsRef<Path>>(
        &self,
        path: P,
        frame_type: FrameType,
        config: CaptureConfig,
    ) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::config("pcap path is empty"));
        }
        self.capture(frame_type, config).write(path)
    }

    /// Split the description into layers and parse each one
    fn parse_frame(&self, text: &str, frame_type: FrameType) -> Result<Frame> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::malformed("frame string is empty"));
        }

        if frame_type == FrameType::Default && self.defaults_pattern.is_match(text) {
            return Err(Error::IllegalDefaultsInTemplate(text.to_string()));
        }

        let (name, chain) = text
            .split_once(NAME_SEPARATOR)
            .ok_or_else(|| Error::malformed(format!("missing '{}' in '{}'", NAME_SEPARATOR, text)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::malformed(format!("missing frame name in '{}'", text)));
        }
        if self.get(name, frame_type).is_some() {
            return Err(Error::DuplicateFrameName(name.to_string()));
        }

        let chain = chain.trim().trim_end_matches('/');
        if chain.trim().is_empty() {
            return Err(Error::malformed(format!("{}: no layers", name)));
        }

        let mut frame = Frame::new(name, frame_type);
        for token in chain.split('/').map(str::trim) {
            let (kind, options) = split_layer_token(name, token)?;
            let mut layer = Layer::parse(kind, options)?;
            if frame_type == FrameType::Normal {
                layer.apply_builtin_defaults();
            }

            if let Layer::Defaults(defaults) = &layer {
                if self.get(&defaults.name, FrameType::Default).is_none() {
                    return Err(Error::UnresolvedDefaultsReference(defaults.name.clone()));
                }
            }

            debug!("{}: parsed {}", name, layer);
            frame.add_layer(options, layer)?;
        }
        Ok(frame)
    }

    /// Turn a parsed normal frame into bytes
    fn resolve(&self, frame: &mut Frame) -> Result<()> {
        for kind in [LayerKind::Payload, LayerKind::Count] {
            if !frame.has_layer(kind) {
                let mut layer = Layer::new(kind);
                layer.apply_builtin_defaults();
                frame.add_layer("", layer)?;
            }
        }

        let template = frame
            .defaults_name()
            .and_then(|name| self.get(name, FrameType::Default));
        for layer in frame.layers_mut() {
            if let Some(defaults) = template.and_then(|t| t.layer(layer.kind())) {
                layer.apply_defaults(defaults);
            }
        }
        frame.refresh_protocols();

        resolve_protocol_numbers(frame);
        fixup_lengths(frame)?;
        frame.write_layers()?;
        patch_checksums(frame)?;

        debug!("{}: resolved to {} bytes", frame.name(), frame.len());
        Ok(())
    }
}

/// Split `Name(options)` into the layer kind and the option text
fn split_layer_token<'a>(frame: &str, token: &'a str) -> Result<(LayerKind, &'a str)> {
    if token.is_empty() {
        return Err(Error::malformed(format!("{}: empty layer", frame)));
    }

    let (name, options) = match token.find('(') {
        Some(open) => {
            let close = token.rfind(')').filter(|close| *close > open).ok_or_else(|| {
                Error::malformed(format!("{}: unbalanced parentheses in '{}'", frame, token))
            })?;
            (&token[..open], &token[open + 1..close])
        }
        None => (token, ""),
    };

    Ok((name.trim().parse::<LayerKind>()?, options))
}

/// Fill IP protocol numbers and the EtherType from the layers present
fn resolve_protocol_numbers(frame: &mut Frame) {
    let transport = frame
        .protocols()
        .iter()
        .find_map(|p| p.kind.ip_protocol());

    if let Some(protocol) = transport {
        if let Some(Layer::IPv4(ip)) = frame.layer_mut(LayerKind::IPv4) {
            ip.protocol = protocol;
        }
        if let Some(Layer::IPv6(ip)) = frame.layer_mut(LayerKind::IPv6) {
            ip.next_header = protocol;
        }
    }

    let network = if frame.has_layer(LayerKind::IPv4) {
        Some(ethertypes::IPV4)
    } else if frame.has_layer(LayerKind::IPv6) {
        Some(ethertypes::IPV6)
    } else {
        None
    };
    if let (Some(ether_type), Some(Layer::Ether(ether))) = (network, frame.layer_mut(LayerKind::Ether)) {
        if ether.ether_type == 0 {
            ether.ether_type = ether_type;
        }
    }
}

/// Set length fields that cover the layers after them
fn fixup_lengths(frame: &mut Frame) -> Result<()> {
    let total = frame.next_offset();
    let remaining = |frame: &Frame, kind: LayerKind| {
        frame.protocol(kind).map(|p| total - p.offset)
    };
    let to_u16 = |kind: LayerKind, len: usize| {
        u16::try_from(len).map_err(|_| {
            Error::invalid_option(kind.name(), "length", format!("{} bytes exceed 65535", len))
        })
    };

    if let Some(len) = remaining(frame, LayerKind::IPv4) {
        let len = to_u16(LayerKind::IPv4, len)?;
        if let Some(Layer::IPv4(ip)) = frame.layer_mut(LayerKind::IPv4) {
            ip.total_length = len;
        }
    }
    if let Some(len) = remaining(frame, LayerKind::IPv6) {
        let len = to_u16(LayerKind::IPv6, len.saturating_sub(Ipv6Layer::HEADER_SIZE))?;
        if let Some(Layer::IPv6(ip)) = frame.layer_mut(LayerKind::IPv6) {
            ip.payload_length = len;
        }
    }
    if let Some(len) = remaining(frame, LayerKind::Udp) {
        let len = to_u16(LayerKind::Udp, len)?;
        if let Some(Layer::Udp(udp)) = frame.layer_mut(LayerKind::Udp) {
            udp.length = len;
        }
    }
    Ok(())
}

/// IP layer closest in front of `offset`
fn enclosing_ip(frame: &Frame, offset: usize) -> Option<IpContext> {
    let ip = frame
        .protocols()
        .iter()
        .filter(|p| matches!(p.kind, LayerKind::IPv4 | LayerKind::IPv6) && p.offset < offset)
        .max_by_key(|p| p.offset)?;

    match frame.layer(ip.kind)? {
        Layer::IPv4(ip) => Some(IpContext::V4 {
            src: ip.src,
            dst: ip.dst,
        }),
        Layer::IPv6(ip) => Some(IpContext::V6 {
            src: ip.src,
            dst: ip.dst,
        }),
        _ => None,
    }
}

/// Compute transport checksums over the written bytes and patch them in
fn patch_checksums(frame: &mut Frame) -> Result<()> {
    let transports: Vec<ProtoInfo> = frame
        .protocols()
        .iter()
        .filter(|p| p.kind.ip_protocol().is_some())
        .copied()
        .collect();

    for proto in transports {
        if let Some(Layer::Udp(udp)) = frame.layer(proto.kind) {
            if !udp.checksum {
                continue;
            }
        }

        let segment = &frame.bytes()[proto.offset..];
        let protocol = proto.kind.ip_protocol().unwrap_or_default();
        let patch = match (proto.kind, enclosing_ip(frame, proto.offset)) {
            (LayerKind::Sctp, _) => Some(sctp_checksum(segment).to_le_bytes().to_vec()),
            (LayerKind::Icmpv4, _) => Some(icmpv4_checksum(segment).to_be_bytes().to_vec()),
            (LayerKind::Icmpv6, Some(IpContext::V4 { .. })) => None,
            (_, Some(IpContext::V4 { src, dst })) => Some(
                ipv4_transport_checksum(&src, &dst, protocol, segment)
                    .to_be_bytes()
                    .to_vec(),
            ),
            (_, Some(IpContext::V6 { src, dst })) => Some(
                ipv6_transport_checksum(&src, &dst, protocol, segment)
                    .to_be_bytes()
                    .to_vec(),
            ),
            (_, None) => None,
        };

        match patch {
            Some(bytes) => frame
                .buffer_mut()
                .write_at(proto.offset + checksum_offset(proto.kind), &bytes)?,
            None => debug!(
                "{}: no matching IP layer, {} checksum left zero",
                frame.name(),
                proto.kind
            ),
        }
    }
    Ok(())
}

fn checksum_offset(kind: LayerKind) -> usize {
    match kind {
        LayerKind::Tcp => TcpLayer::CHECKSUM_OFFSET,
        LayerKind::Udp => UdpLayer::CHECKSUM_OFFSET,
        LayerKind::Sctp => SctpLayer::CHECKSUM_OFFSET,
        _ => IcmpHeader::CHECKSUM_OFFSET,
    }
}
