//! Frames: ordered layers, their byte ranges and the written bytes

use crate::buffer::FrameBuffer;
use crate::layers::{CountLayer, Layer, LayerKind};
use fserde_core::{Error, FrameType, Result};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

/// One layer as it appeared in the frame description
#[derive(Debug, Clone)]
pub struct LayerInfo {
    pub kind: LayerKind,
    /// Raw text between the layer's parentheses
    pub options: String,
    pub layer: Layer,
}

/// Where a layer's bytes sit inside the frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoInfo {
    pub kind: LayerKind,
    pub offset: usize,
    pub length: usize,
}

impl ProtoInfo {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// A named frame
///
/// Each layer kind appears at most once. Protocol offsets are the running sum
/// of the lengths registered before them.
#[derive(Debug, Clone)]
pub struct Frame {
    name: String,
    frame_type: FrameType,
    layers: Vec<LayerInfo>,
    slots: HashMap<LayerKind, usize>,
    protocols: Vec<ProtoInfo>,
    defaults: Option<String>,
    buffer: FrameBuffer,
}

impl Frame {
    pub fn new(name: &str, frame_type: FrameType) -> Self {
        Self {
            name: name.to_string(),
            frame_type,
            layers: Vec::new(),
            slots: HashMap::new(),
            protocols: Vec::new(),
            defaults: None,
            buffer: FrameBuffer::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    pub fn protocols(&self) -> &[ProtoInfo] {
        &self.protocols
    }

    pub fn protocol(&self, kind: LayerKind) -> Option<&ProtoInfo> {
        self.protocols.iter().find(|p| p.kind == kind)
    }

    pub fn has_layer(&self, kind: LayerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.slots.get(&kind).map(|&slot| &self.layers[slot].layer)
    }

    pub fn layer_mut(&mut self, kind: LayerKind) -> Option<&mut Layer> {
        let slot = *self.slots.get(&kind)?;
        Some(&mut self.layers[slot].layer)
    }

    /// Name of the linked defaults template, if any
    pub fn defaults_name(&self) -> Option<&str> {
        self.defaults.as_deref()
    }

    /// Offset the next registered layer will start at
    pub fn next_offset(&self) -> usize {
        self.protocols.last().map_or(0, ProtoInfo::end)
    }

    /// Append a parsed layer and register its byte range.
    ///
    /// A second layer of the same kind is rejected.
    pub fn add_layer(&mut self, options: &str, layer: Layer) -> Result<()> {
        let kind = layer.kind();
        if self.slots.contains_key(&kind) {
            return Err(Error::malformed(format!(
                "{}: layer {} appears more than once",
                self.name, kind
            )));
        }

        if kind.is_vlan_tag() && self.frame_type == FrameType::Normal {
            self.check_tag_position(kind)?;
        }

        if let Layer::Defaults(defaults) = &layer {
            self.defaults = Some(defaults.name.clone());
        }

        let proto = ProtoInfo {
            kind,
            offset: self.next_offset(),
            length: layer.header_len(),
        };
        self.protocols.push(proto);
        self.slots.insert(kind, self.layers.len());
        self.layers.push(LayerInfo {
            kind,
            options: options.to_string(),
            layer,
        });
        Ok(())
    }

    /// Tag bytes are spliced in at offset 12, so a tag may only follow the
    /// Ethernet header, other tags or control layers.
    fn check_tag_position(&self, kind: LayerKind) -> Result<()> {
        let misplaced = !self.has_layer(LayerKind::Ether)
            || self.layers.iter().any(|info| {
                !(info.kind == LayerKind::Ether
                    || info.kind.is_vlan_tag()
                    || info.kind.is_control())
            });
        if misplaced {
            return Err(Error::malformed(format!(
                "{}: {} must directly follow Ether",
                self.name, kind
            )));
        }
        Ok(())
    }

    /// Recompute lengths and offsets after layer fields changed
    pub(crate) fn refresh_protocols(&mut self) {
        let mut offset = 0;
        for (proto, info) in self.protocols.iter_mut().zip(&self.layers) {
            proto.offset = offset;
            proto.length = info.layer.header_len();
            offset += proto.length;
        }
    }

    pub(crate) fn layers_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.iter_mut().map(|info| &mut info.layer)
    }

    /// Write every layer into a fresh buffer in registration order
    pub(crate) fn write_layers(&mut self) -> Result<()> {
        self.buffer.clear();
        for info in &self.layers {
            info.layer.write(&mut self.buffer)?;
        }
        Ok(())
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Written frame bytes (empty for defaults templates)
    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of copies emitted to a capture file
    pub fn count(&self) -> u32 {
        match self.layer(LayerKind::Count) {
            Some(Layer::Count(count)) => count.effective(),
            _ => CountLayer::DEFAULT_COUNT,
        }
    }

    /// Layer table, protocol offsets and a hex dump of the bytes
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({}, {} bytes)", self.name, self.frame_type, self.len());
        for info in &self.layers {
            if info.options.is_empty() {
                let _ = writeln!(out, "  {}", info.layer);
            } else {
                let _ = writeln!(out, "  {}  [{}]", info.layer, info.options);
            }
        }
        for proto in &self.protocols {
            let _ = writeln!(
                out,
                "  {:<8} offset {:>4} length {:>4}",
                proto.name(),
                proto.offset,
                proto.length
            );
        }
        out.push_str(&self.buffer.dump());
        out
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:=", self.name)?;
        for (i, info) in self.layers.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", info.layer)?;
        }
        Ok(())
    }
}
