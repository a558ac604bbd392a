//! Field Definition Model
//!
//! Templates describe a section or descriptor as an ordered list of
//! [`FieldDefinition`]s. A definition is pure data: it knows how to check that
//! it is well formed and how many bits it stands for once its length has been
//! resolved, but it never touches a buffer.

use crate::error::{DecodeError, Result};
use crate::mapping::ValueMappings;

/// How the raw bits of a data field are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Encoding {
    /// Raw bit pattern (flags, reserved bits)
    Bits,
    /// Unsigned big-endian integer
    Unsigned,
    /// Trailing checksum, usually a CRC-32
    Checksum,
    /// Array of 4-bit values (BCD digits)
    Nibbles,
    /// Array of bytes
    Octets,
    /// Character payload handed to a text decoder
    Text,
}

impl Encoding {
    /// Bits per unit when a length is given as a count of units
    pub fn unit_bits(&self) -> usize {
        match self {
            Encoding::Nibbles => 4,
            _ => 8,
        }
    }

    /// Whether the encoding yields a single integer
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Encoding::Bits | Encoding::Unsigned | Encoding::Checksum
        )
    }

    /// Check that `bits` is a legal width for this encoding
    pub fn check_width(&self, bits: usize) -> Result<()> {
        let ok = match self {
            Encoding::Bits | Encoding::Unsigned | Encoding::Checksum => bits <= 64,
            Encoding::Nibbles => bits % 4 == 0,
            Encoding::Octets | Encoding::Text => bits % 8 == 0,
        };
        if !ok {
            return Err(DecodeError::invalid_length(format!(
                "{} bits is not a valid width for {}",
                bits, self
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Bits => write!(f, "bits"),
            Encoding::Unsigned => write!(f, "unsigned"),
            Encoding::Checksum => write!(f, "checksum"),
            Encoding::Nibbles => write!(f, "nibbles"),
            Encoding::Octets => write!(f, "octets"),
            Encoding::Text => write!(f, "text"),
        }
    }
}

/// Where a data field gets its length from
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LengthSpec {
    /// A literal number of bits
    Bits(u32),
    /// The value of a previously decoded field
    ///
    /// The value counts units of the encoding (4 bits for nibbles, 8 bits
    /// otherwise) unless `bit_packed` is set, in which case it counts bits.
    Field {
        /// Name of the referenced field
        name: String,
        /// Whether the referenced value is already a bit count
        bit_packed: bool,
    },
    /// An unsigned byte count of `prefix_bits` bits read just before the
    /// payload (text and octet fields only)
    Prefixed {
        /// Width of the length prefix
        prefix_bits: u8,
    },
}

/// Presentation hints carried alongside a data field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Presentation {
    /// Text shown before the value
    pub prefix: Option<String>,
    /// printf-style format, see [`crate::mapping::format_number`]
    pub format: Option<String>,
    /// Value-to-label rules
    pub mappings: ValueMappings,
}

/// A plain field: fixed width or sized by an earlier field
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataField {
    /// Field name
    pub name: String,
    /// Interpretation of the raw bits
    pub encoding: Encoding,
    /// Length specification
    pub length: LengthSpec,
    /// Presentation hints
    #[cfg_attr(feature = "serde", serde(default))]
    pub presentation: Presentation,
}

impl DataField {
    /// Create a field with a literal bit length
    pub fn new(name: impl Into<String>, encoding: Encoding, bits: u32) -> Self {
        DataField {
            name: name.into(),
            encoding,
            length: LengthSpec::Bits(bits),
            presentation: Presentation::default(),
        }
    }

    /// Create a field sized by the value of an earlier field
    pub fn sized_by(
        name: impl Into<String>,
        encoding: Encoding,
        length_field: impl Into<String>,
    ) -> Self {
        DataField {
            name: name.into(),
            encoding,
            length: LengthSpec::Field {
                name: length_field.into(),
                bit_packed: false,
            },
            presentation: Presentation::default(),
        }
    }

    /// Unsigned integer of `bits` bits
    pub fn unsigned(name: impl Into<String>, bits: u32) -> Self {
        Self::new(name, Encoding::Unsigned, bits)
    }

    /// Raw bit pattern of `bits` bits
    pub fn bits(name: impl Into<String>, bits: u32) -> Self {
        Self::new(name, Encoding::Bits, bits)
    }

    /// Checksum of `bits` bits
    pub fn checksum(name: impl Into<String>, bits: u32) -> Self {
        Self::new(name, Encoding::Checksum, bits)
    }

    /// Text whose byte count is read from a `prefix_bits` wide prefix
    pub fn text_prefixed(name: impl Into<String>, prefix_bits: u8) -> Self {
        DataField {
            name: name.into(),
            encoding: Encoding::Text,
            length: LengthSpec::Prefixed { prefix_bits },
            presentation: Presentation::default(),
        }
    }

    /// Treat a referenced length as a bit count
    pub fn bit_packed(mut self) -> Self {
        if let LengthSpec::Field { bit_packed, .. } = &mut self.length {
            *bit_packed = true;
        }
        self
    }

    /// Attach a value mapping table
    pub fn with_mappings(mut self, mappings: ValueMappings) -> Self {
        self.presentation.mappings = mappings;
        self
    }

    /// Attach a printf-style format
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.presentation.format = Some(format.into());
        self
    }

    /// Attach a prefix label
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.presentation.prefix = Some(prefix.into());
        self
    }

    /// Convert a referenced length value into a bit count
    pub fn bits_from_reference(&self, value: u64) -> Result<usize> {
        let bit_packed = matches!(
            self.length,
            LengthSpec::Field {
                bit_packed: true,
                ..
            }
        );
        let unit = if bit_packed {
            1
        } else {
            self.encoding.unit_bits() as u64
        };
        let bits = value
            .checked_mul(unit)
            .and_then(|b| usize::try_from(b).ok())
            .ok_or_else(|| {
                DecodeError::invalid_length(format!(
                    "length {} of '{}' overflows",
                    value, self.name
                ))
            })?;
        self.encoding.check_width(bits)?;
        Ok(bits)
    }

    fn verify(&self, visible: &[Declared]) -> Result<()> {
        require_name(&self.name)?;
        self.presentation.mappings.verify()?;

        match &self.length {
            LengthSpec::Bits(0) => Err(DecodeError::malformed_template(format!(
                "field '{}' has zero length",
                self.name
            ))),
            LengthSpec::Bits(bits) => self.encoding.check_width(*bits as usize).map_err(|_| {
                DecodeError::malformed_template(format!(
                    "field '{}' of kind {} cannot be {} bits wide",
                    self.name, self.encoding, bits
                ))
            }),
            LengthSpec::Field { name, .. } => require_numeric(&self.name, name, visible),
            LengthSpec::Prefixed { prefix_bits } => {
                if !matches!(self.encoding, Encoding::Text | Encoding::Octets) {
                    return Err(DecodeError::malformed_template(format!(
                        "field '{}': length prefixes only apply to text and octets",
                        self.name
                    )));
                }
                if !(1..=32).contains(prefix_bits) {
                    return Err(DecodeError::malformed_template(format!(
                        "field '{}' has a {}-bit length prefix",
                        self.name, prefix_bits
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Unit of a loop's resolved length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LoopKind {
    /// Repeat until this many bytes are consumed
    Bytes,
    /// Repeat this many times
    Count,
}

/// Source of a loop's length
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LoopLength {
    /// Value of an earlier field
    Field(String),
    /// Everything up to the enclosing limit (byte loops only)
    Implicit,
}

/// A repeated group of fields
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopField {
    /// Loop name
    pub name: String,
    /// Byte-length or item-count loop
    pub kind: LoopKind,
    /// Where the length comes from
    pub length: LoopLength,
    /// Signed bias added to the resolved length
    #[cfg_attr(feature = "serde", serde(default))]
    pub correction: i64,
    /// Fields decoded once per iteration
    pub body: Vec<FieldDefinition>,
    /// Name given to each iteration node; defaults to the loop name
    #[cfg_attr(feature = "serde", serde(default))]
    pub item_name: Option<String>,
}

impl LoopField {
    /// Loop over `length_field` bytes
    pub fn bytes(
        name: impl Into<String>,
        length_field: impl Into<String>,
        body: Vec<FieldDefinition>,
    ) -> Self {
        Self::build(name, LoopKind::Bytes, LoopLength::Field(length_field.into()), body)
    }

    /// Repeat `count_field` times
    pub fn count(
        name: impl Into<String>,
        count_field: impl Into<String>,
        body: Vec<FieldDefinition>,
    ) -> Self {
        Self::build(name, LoopKind::Count, LoopLength::Field(count_field.into()), body)
    }

    /// Loop until the enclosing limit
    pub fn implicit(name: impl Into<String>, body: Vec<FieldDefinition>) -> Self {
        Self::build(name, LoopKind::Bytes, LoopLength::Implicit, body)
    }

    fn build(
        name: impl Into<String>,
        kind: LoopKind,
        length: LoopLength,
        body: Vec<FieldDefinition>,
    ) -> Self {
        LoopField {
            name: name.into(),
            kind,
            length,
            correction: 0,
            body,
            item_name: None,
        }
    }

    /// Apply a signed correction to the resolved length
    pub fn with_correction(mut self, correction: i64) -> Self {
        self.correction = correction;
        self
    }

    /// Name iteration nodes `item[i]` instead of `loop[i]`
    pub fn with_item_name(mut self, item_name: impl Into<String>) -> Self {
        self.item_name = Some(item_name.into());
        self
    }

    /// Whether the resolved length counts bytes rather than iterations
    pub fn is_byte_length(&self) -> bool {
        self.kind == LoopKind::Bytes
    }

    /// Apply the correction to a resolved length
    pub fn corrected(&self, resolved: u64) -> Result<u64> {
        let total = i128::from(resolved) + i128::from(self.correction);
        u64::try_from(total).map_err(|_| {
            DecodeError::invalid_length(format!(
                "loop '{}': length {} with correction {} is negative",
                self.name, resolved, self.correction
            ))
        })
    }

    /// Name of the n-th iteration node
    pub fn item_label(&self, index: usize) -> String {
        let base = self.item_name.as_deref().unwrap_or(&self.name);
        format!("{}[{}]", base, index)
    }

    fn verify(&self, visible: &[Declared]) -> Result<()> {
        require_name(&self.name)?;
        if self.body.is_empty() {
            return Err(DecodeError::malformed_template(format!(
                "loop '{}' has an empty body",
                self.name
            )));
        }
        match &self.length {
            LoopLength::Field(name) => require_numeric(&self.name, name, visible)?,
            LoopLength::Implicit if self.kind == LoopKind::Count => {
                return Err(DecodeError::malformed_template(format!(
                    "count loop '{}' cannot use an implicit length",
                    self.name
                )));
            }
            LoopLength::Implicit => {}
        }

        let mut scope = visible.to_vec();
        verify_scope(&self.body, &mut scope)
    }
}

/// Comparison applied by a condition
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Predicate {
    /// Equal to a scalar
    Equals(u64),
    /// Member of a set
    In(Vec<u64>),
    /// Inside the closed range `[min, max]`
    Range {
        /// Lower bound
        min: u64,
        /// Upper bound
        max: u64,
    },
}

impl Predicate {
    /// Evaluate against a decoded value
    pub fn test(&self, value: u64) -> bool {
        match self {
            Predicate::Equals(v) => *v == value,
            Predicate::In(set) => set.contains(&value),
            Predicate::Range { min, max } => (*min..=*max).contains(&value),
        }
    }
}

/// A test on an earlier field's value
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    /// Operand field name
    pub field: String,
    /// Comparison
    pub predicate: Predicate,
}

impl Condition {
    /// `field == value`
    pub fn equals(field: impl Into<String>, value: u64) -> Self {
        Condition {
            field: field.into(),
            predicate: Predicate::Equals(value),
        }
    }

    /// `field in values`
    pub fn one_of(field: impl Into<String>, values: impl Into<Vec<u64>>) -> Self {
        Condition {
            field: field.into(),
            predicate: Predicate::In(values.into()),
        }
    }

    /// `min <= field <= max`
    pub fn range(field: impl Into<String>, min: u64, max: u64) -> Self {
        Condition {
            field: field.into(),
            predicate: Predicate::Range { min, max },
        }
    }
}

/// Fields decoded only when a condition holds
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionalField {
    /// The test
    pub condition: Condition,
    /// Fields decoded when the test holds
    pub then: Vec<FieldDefinition>,
    /// Fields decoded otherwise; empty when there is no else branch
    #[cfg_attr(feature = "serde", serde(default))]
    pub otherwise: Vec<FieldDefinition>,
}

impl ConditionalField {
    /// Create a conditional without an else branch
    pub fn new(condition: Condition, then: Vec<FieldDefinition>) -> Self {
        ConditionalField {
            condition,
            then,
            otherwise: Vec::new(),
        }
    }

    /// Add an else branch
    pub fn with_else(mut self, otherwise: Vec<FieldDefinition>) -> Self {
        self.otherwise = otherwise;
        self
    }

    fn verify(&self, visible: &mut Vec<Declared>) -> Result<()> {
        require_numeric("condition", &self.condition.field, visible)?;
        if self.then.is_empty() {
            return Err(DecodeError::malformed_template(format!(
                "condition on '{}' has an empty then branch",
                self.condition.field
            )));
        }
        match &self.condition.predicate {
            Predicate::In(set) if set.is_empty() => {
                return Err(DecodeError::malformed_template(format!(
                    "condition on '{}' tests an empty set",
                    self.condition.field
                )));
            }
            Predicate::Range { min, max } if min > max => {
                return Err(DecodeError::malformed_template(format!(
                    "condition on '{}' has inverted range [{}, {}]",
                    self.condition.field, min, max
                )));
            }
            _ => {}
        }

        // names from either branch stay visible after the conditional
        let mut then_scope = visible.clone();
        verify_scope(&self.then, &mut then_scope)?;
        let mut else_scope = visible.clone();
        verify_scope(&self.otherwise, &mut else_scope)?;

        let before = visible.len();
        visible.extend(then_scope.drain(before..));
        visible.extend(else_scope.drain(before..));
        Ok(())
    }
}

/// One entry of a template's field list
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldDefinition {
    /// Plain field
    Data(DataField),
    /// Repeated group
    Loop(LoopField),
    /// Conditional branch
    Conditional(ConditionalField),
}

impl FieldDefinition {
    /// Name of the definition; conditionals are anonymous
    pub fn name(&self) -> Option<&str> {
        match self {
            FieldDefinition::Data(d) => Some(&d.name),
            FieldDefinition::Loop(l) => Some(&l.name),
            FieldDefinition::Conditional(_) => None,
        }
    }

    /// Check that the definition is well formed on its own
    ///
    /// References are checked against the definition's own nested scopes
    /// only; use [`verify_fields`] to check a whole field list.
    pub fn verify(&self) -> Result<()> {
        let mut visible = Vec::new();
        self.verify_in(&mut visible)
    }

    fn verify_in(&self, visible: &mut Vec<Declared>) -> Result<()> {
        match self {
            FieldDefinition::Data(d) => {
                d.verify(visible)?;
                visible.push(Declared {
                    name: d.name.clone(),
                    numeric: d.encoding.is_numeric(),
                });
            }
            FieldDefinition::Loop(l) => {
                l.verify(visible)?;
                visible.push(Declared {
                    name: l.name.clone(),
                    numeric: false,
                });
            }
            FieldDefinition::Conditional(c) => c.verify(visible)?,
        }
        Ok(())
    }
}

impl From<DataField> for FieldDefinition {
    fn from(field: DataField) -> Self {
        FieldDefinition::Data(field)
    }
}

impl From<LoopField> for FieldDefinition {
    fn from(field: LoopField) -> Self {
        FieldDefinition::Loop(field)
    }
}

impl From<ConditionalField> for FieldDefinition {
    fn from(field: ConditionalField) -> Self {
        FieldDefinition::Conditional(field)
    }
}

/// Verify an ordered field list, including every length and condition
/// reference
pub fn verify_fields(fields: &[FieldDefinition]) -> Result<()> {
    let mut visible = Vec::new();
    verify_scope(fields, &mut visible)
}

fn verify_scope(fields: &[FieldDefinition], visible: &mut Vec<Declared>) -> Result<()> {
    fields.iter().try_for_each(|f| f.verify_in(visible))
}

/// Names a field list contributes to its own level of the decoded tree
///
/// Fields of either conditional branch are included, since the taken branch
/// is spliced into the parent; loop bodies are not.
pub fn spliced_names(fields: &[FieldDefinition]) -> Vec<&str> {
    let mut names = Vec::new();
    for field in fields {
        if let FieldDefinition::Conditional(c) = field {
            names.extend(spliced_names(&c.then));
            names.extend(spliced_names(&c.otherwise));
        } else {
            names.extend(field.name());
        }
    }
    names
}

/// A name visible to later references
#[derive(Debug, Clone)]
struct Declared {
    name: String,
    numeric: bool,
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DecodeError::malformed_template(
            "field definition without a name".to_string(),
        ));
    }
    Ok(())
}

fn require_numeric(owner: &str, referenced: &str, visible: &[Declared]) -> Result<()> {
    match visible.iter().rev().find(|d| d.name == referenced) {
        None => Err(DecodeError::malformed_template(format!(
            "'{}' refers to '{}' which is not declared before it",
            owner, referenced
        ))),
        Some(declared) if !declared.numeric => Err(DecodeError::malformed_template(format!(
            "'{}' refers to '{}' which does not hold a number",
            owner, referenced
        ))),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<FieldDefinition> {
        vec![
            DataField::unsigned("table_id", 8).into(),
            DataField::bits("section_syntax_indicator", 1).into(),
            DataField::bits("reserved", 3).into(),
            DataField::unsigned("section_length", 12).into(),
        ]
    }

    #[test]
    fn test_valid_field_list() -> Result<()> {
        let mut fields = header();
        fields.push(
            LoopField::bytes(
                "programs",
                "section_length",
                vec![DataField::unsigned("program_number", 16).into()],
            )
            .with_correction(-4)
            .into(),
        );
        fields.push(DataField::checksum("CRC_32", 32).into());
        verify_fields(&fields)
    }

    #[test]
    fn test_rejects_empty_name() {
        let field: FieldDefinition = DataField::unsigned("  ", 8).into();
        assert!(field.verify().is_err());
    }

    #[test]
    fn test_rejects_bad_widths() {
        assert!(FieldDefinition::from(DataField::unsigned("x", 0)).verify().is_err());
        assert!(FieldDefinition::from(DataField::unsigned("x", 65)).verify().is_err());
        assert!(FieldDefinition::from(DataField::new("x", Encoding::Nibbles, 6))
            .verify()
            .is_err());
        assert!(FieldDefinition::from(DataField::new("x", Encoding::Octets, 12))
            .verify()
            .is_err());
        assert!(FieldDefinition::from(DataField::new("x", Encoding::Octets, 24))
            .verify()
            .is_ok());
    }

    #[test]
    fn test_rejects_forward_reference() {
        let fields: Vec<FieldDefinition> = vec![
            DataField::sized_by("payload", Encoding::Octets, "payload_length").into(),
            DataField::unsigned("payload_length", 8).into(),
        ];
        assert!(matches!(
            verify_fields(&fields),
            Err(DecodeError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_rejects_non_numeric_reference() {
        let text_length: Vec<FieldDefinition> = vec![
            DataField::text_prefixed("name", 8).into(),
            DataField::sized_by("payload", Encoding::Octets, "name").into(),
        ];
        let err = verify_fields(&text_length).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTemplate(_)));
        assert!(err.to_string().contains("does not hold a number"));

        let loop_count: Vec<FieldDefinition> = vec![
            LoopField::implicit("items", vec![DataField::unsigned("v", 8).into()]).into(),
            LoopField::count("again", "items", vec![DataField::unsigned("w", 8).into()]).into(),
        ];
        assert!(verify_fields(&loop_count).is_err());

        let nibble_condition: Vec<FieldDefinition> = vec![
            DataField::new("bcd", Encoding::Nibbles, 8).into(),
            ConditionalField::new(
                Condition::equals("bcd", 0),
                vec![DataField::unsigned("x", 8).into()],
            )
            .into(),
        ];
        assert!(verify_fields(&nibble_condition).is_err());

        // bits and checksums hold numbers too
        let flag_length: Vec<FieldDefinition> = vec![
            DataField::bits("flags", 4).into(),
            DataField::sized_by("payload", Encoding::Octets, "flags").into(),
        ];
        assert!(verify_fields(&flag_length).is_ok());
        assert!(Encoding::Checksum.is_numeric());
        assert!(!Encoding::Text.is_numeric());
    }

    #[test]
    fn test_spliced_names() {
        let fields: Vec<FieldDefinition> = vec![
            DataField::unsigned("table_id", 8).into(),
            ConditionalField::new(
                Condition::equals("table_id", 0x4E),
                vec![DataField::unsigned("service_id", 16).into()],
            )
            .with_else(vec![DataField::unsigned("network_id", 16).into()])
            .into(),
            LoopField::implicit("events", vec![DataField::unsigned("event_id", 16).into()]).into(),
        ];
        assert_eq!(
            spliced_names(&fields),
            vec!["table_id", "service_id", "network_id", "events"]
        );
    }

    #[test]
    fn test_loop_rules() {
        let empty = LoopField::implicit("items", Vec::new());
        assert!(FieldDefinition::from(empty).verify().is_err());

        let implicit_count = LoopField {
            kind: LoopKind::Count,
            ..LoopField::implicit("items", vec![DataField::unsigned("v", 8).into()])
        };
        assert!(FieldDefinition::from(implicit_count).verify().is_err());
    }

    #[test]
    fn test_loop_body_sees_outer_scope() -> Result<()> {
        let mut fields = header();
        fields.push(
            LoopField::implicit(
                "entries",
                vec![
                    DataField::unsigned("entry_length", 8).into(),
                    DataField::sized_by("entry", Encoding::Octets, "entry_length").into(),
                    DataField::sized_by("echo", Encoding::Octets, "table_id").into(),
                ],
            )
            .into(),
        );
        verify_fields(&fields)
    }

    #[test]
    fn test_conditional_rules() -> Result<()> {
        let empty_then = ConditionalField::new(Condition::equals("table_id", 2), Vec::new());
        let mut fields = header();
        fields.push(empty_then.into());
        assert!(verify_fields(&fields).is_err());

        let empty_set = ConditionalField::new(
            Condition::one_of("table_id", Vec::new()),
            vec![DataField::unsigned("x", 8).into()],
        );
        let mut fields = header();
        fields.push(empty_set.into());
        assert!(verify_fields(&fields).is_err());

        // branch fields are visible to later siblings
        let mut fields = header();
        fields.push(
            ConditionalField::new(
                Condition::range("table_id", 0x4E, 0x6F),
                vec![DataField::unsigned("segment_length", 8).into()],
            )
            .with_else(vec![DataField::unsigned("other_length", 8).into()])
            .into(),
        );
        fields.push(DataField::sized_by("segment", Encoding::Octets, "segment_length").into());
        fields.push(DataField::sized_by("other", Encoding::Octets, "other_length").into());
        verify_fields(&fields)
    }

    #[test]
    fn test_prefixed_length_rules() {
        assert!(FieldDefinition::from(DataField::text_prefixed("name", 8))
            .verify()
            .is_ok());
        assert!(FieldDefinition::from(DataField::text_prefixed("name", 0))
            .verify()
            .is_err());
        let numeric = DataField {
            length: LengthSpec::Prefixed { prefix_bits: 8 },
            ..DataField::unsigned("n", 8)
        };
        assert!(FieldDefinition::from(numeric).verify().is_err());
    }

    #[test]
    fn test_reference_units() -> Result<()> {
        let octets = DataField::sized_by("payload", Encoding::Octets, "len");
        assert_eq!(octets.bits_from_reference(3)?, 24);
        let nibbles = DataField::sized_by("bcd", Encoding::Nibbles, "len");
        assert_eq!(nibbles.bits_from_reference(3)?, 12);
        let packed = DataField::sized_by("flags", Encoding::Bits, "len").bit_packed();
        assert_eq!(packed.bits_from_reference(5)?, 5);
        assert!(packed.bits_from_reference(65).is_err());
        Ok(())
    }

    #[test]
    fn test_loop_correction() -> Result<()> {
        let body = vec![DataField::unsigned("v", 8).into()];
        let l = LoopField::bytes("items", "len", body).with_correction(-4);
        assert_eq!(l.corrected(10)?, 6);
        assert!(l.corrected(3).is_err());
        assert_eq!(l.item_label(2), "items[2]");
        assert_eq!(l.clone().with_item_name("item").item_label(0), "item[0]");
        Ok(())
    }

    #[test]
    fn test_predicates() {
        assert!(Predicate::Equals(3).test(3));
        assert!(!Predicate::Equals(3).test(4));
        assert!(Predicate::In(vec![1, 5, 9]).test(5));
        assert!(!Predicate::In(vec![1, 5, 9]).test(6));
        assert!(Predicate::Range { min: 2, max: 4 }.test(4));
        assert!(!Predicate::Range { min: 2, max: 4 }.test(5));
    }
}
