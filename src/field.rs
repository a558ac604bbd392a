//! Decoded output tree

use crate::bits::Cursor;

/// Kind of a decoded node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SyntaxKind {
    /// Root of a decoded section
    Section,
    /// Root of a decoded descriptor
    Descriptor,
    /// Raw bit pattern
    Bits,
    /// Unsigned integer
    Number,
    /// Checksum value
    Checksum,
    /// Array of 4-bit values
    Nibbles,
    /// Array of bytes
    Octets,
    /// Decoded character payload
    Text,
    /// Loop or loop iteration
    Group,
}

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxKind::Section => write!(f, "Section"),
            SyntaxKind::Descriptor => write!(f, "Descriptor"),
            SyntaxKind::Bits => write!(f, "Bits"),
            SyntaxKind::Number => write!(f, "Number"),
            SyntaxKind::Checksum => write!(f, "Checksum"),
            SyntaxKind::Nibbles => write!(f, "Nibbles"),
            SyntaxKind::Octets => write!(f, "Octets"),
            SyntaxKind::Text => write!(f, "Text"),
            SyntaxKind::Group => write!(f, "Group"),
        }
    }
}

/// Raw value carried by a decoded node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    /// Structural nodes carry no value
    #[default]
    None,
    /// Bits, numbers and checksums
    Number(u64),
    /// One entry per nibble
    Nibbles(Vec<u8>),
    /// One entry per byte
    Octets(Vec<u8>),
    /// Raw bytes together with their decoded text
    Text {
        /// Undecoded payload
        raw: Vec<u8>,
        /// Decoded string
        text: String,
    },
}

impl FieldValue {
    /// Numeric value, if any
    pub fn as_number(&self) -> Option<u64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Byte payload of octet and text values
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Octets(b) => Some(b),
            FieldValue::Text { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// One node of the decoded tree
///
/// Positions are copied integers; the tree holds no reference to the buffer
/// it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntaxField {
    /// Node kind
    pub kind: SyntaxKind,
    /// Field name from the template
    pub name: String,
    /// Raw decoded value
    pub value: FieldValue,
    /// Label resolved through the value mapping table
    pub label: Option<String>,
    /// Presentation string (prefix, formatted value, label)
    pub display: String,
    /// Absolute byte position of the first bit
    pub position: usize,
    /// Offset of the first bit inside the byte at `position`
    pub bit_offset: u8,
    /// Number of bits covered by the node
    pub bit_length: usize,
    /// Children in decode order
    pub children: Vec<SyntaxField>,
}

impl SyntaxField {
    /// Create a childless node starting at `start`
    pub fn new(kind: SyntaxKind, name: impl Into<String>, start: Cursor) -> Self {
        SyntaxField {
            kind,
            name: name.into(),
            value: FieldValue::None,
            label: None,
            display: String::new(),
            position: start.position,
            bit_offset: start.bit_offset,
            bit_length: 0,
            children: Vec::new(),
        }
    }

    /// Cursor at the first bit of the node
    pub fn start(&self) -> Cursor {
        Cursor {
            position: self.position,
            bit_offset: self.bit_offset,
        }
    }

    /// Cursor just past the last bit of the node
    pub fn end(&self) -> Cursor {
        self.start().advance(self.bit_length)
    }

    /// Extend the node so that it ends at `end`
    pub(crate) fn close(&mut self, end: Cursor) {
        self.bit_length = end.bit_index().saturating_sub(self.start().bit_index());
    }

    /// Bytes covered by the node, rounded up
    pub fn byte_length(&self) -> usize {
        self.bit_length.div_ceil(8)
    }

    /// Numeric value, if the node carries one
    pub fn number(&self) -> Option<u64> {
        self.value.as_number()
    }

    /// Decoded text, if the node is a text field
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// First direct child named `name`
    pub fn child(&self, name: &str) -> Option<&SyntaxField> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First node named `name` in depth-first order, including `self`
    pub fn find(&self, name: &str) -> Option<&SyntaxField> {
        self.walk().find(|f| f.name == name)
    }

    /// Every node named `name` in depth-first order
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SyntaxField> + 'a {
        self.walk().filter(move |f| f.name == name)
    }

    /// Depth-first pre-order traversal
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

impl std::fmt::Display for SyntaxField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.display)
        }
    }
}

/// Iterator returned by [`SyntaxField::walk`]
pub struct Walk<'a> {
    stack: Vec<&'a SyntaxField>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a SyntaxField;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
