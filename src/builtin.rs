//! Built-in templates for common MPEG-2 PSI and DVB SI tables
//!
//! Covers PAT, CAT, PMT, NIT, SDT and TDT plus the descriptors they most
//! often carry. Applications add their own templates on top through the
//! registry.

use crate::definition::{
    Condition, ConditionalField, DataField, Encoding, FieldDefinition, LoopField,
};
use crate::error::Result;
use crate::mapping::ValueMappings;
use crate::registry::TemplateRegistry;
use crate::template::Template;

/// Register every built-in template
pub fn register_all(registry: &mut TemplateRegistry) -> Result<()> {
    for template in tables().into_iter().chain(descriptors()) {
        registry.register(template)?;
    }
    Ok(())
}

/// Built-in section templates
pub fn tables() -> Vec<Template> {
    vec![pat(), cat(), pmt(), nit(), sdt(), tdt()]
}

/// Built-in descriptor templates
pub fn descriptors() -> Vec<Template> {
    vec![
        ca_descriptor(),
        iso_639_language_descriptor(),
        network_name_descriptor(),
        service_descriptor(),
        stream_identifier_descriptor(),
    ]
}

fn table_ids() -> ValueMappings {
    ValueMappings::new()
        .with(0x00, "program_association_section")
        .with(0x01, "conditional_access_section")
        .with(0x02, "TS_program_map_section")
        .with(0x40, "network_information_section - actual network")
        .with(0x41, "network_information_section - other network")
        .with(0x42, "service_description_section - actual transport stream")
        .with(0x46, "service_description_section - other transport stream")
        .with(0x70, "time_date_section")
        .with_range(0x80, 0xFE, "user defined")
}

fn descriptor_tags() -> ValueMappings {
    ValueMappings::new()
        .with(0x02, "video_stream_descriptor")
        .with(0x03, "audio_stream_descriptor")
        .with(0x05, "registration_descriptor")
        .with(0x09, "CA_descriptor")
        .with(0x0A, "ISO_639_language_descriptor")
        .with(0x40, "network_name_descriptor")
        .with(0x41, "service_list_descriptor")
        .with(0x48, "service_descriptor")
        .with(0x4D, "short_event_descriptor")
        .with(0x52, "stream_identifier_descriptor")
        .with(0x56, "teletext_descriptor")
        .with(0x59, "subtitling_descriptor")
        .with(0x6A, "AC-3_descriptor")
        .with(0x7F, "extension_descriptor")
        .with_range(0x80, 0xFE, "user defined")
}

fn stream_types() -> ValueMappings {
    ValueMappings::new()
        .with(0x01, "ISO/IEC 11172-2 Video")
        .with(0x02, "ITU-T H.262 | ISO/IEC 13818-2 Video")
        .with(0x03, "ISO/IEC 11172-3 Audio")
        .with(0x04, "ISO/IEC 13818-3 Audio")
        .with(0x05, "ITU-T H.222.0 | ISO/IEC 13818-1 private_sections")
        .with(0x06, "ITU-T H.222.0 | ISO/IEC 13818-1 PES packets containing private data")
        .with(0x0B, "ISO/IEC 13818-6 type B")
        .with(0x0F, "ISO/IEC 13818-7 Audio with ADTS transport syntax")
        .with(0x11, "ISO/IEC 14496-3 Audio with the LATM transport syntax")
        .with(0x1B, "AVC video stream")
        .with(0x24, "HEVC video stream")
        .with_range(0x80, 0xFF, "User Private")
}

fn service_types() -> ValueMappings {
    ValueMappings::new()
        .with(0x01, "digital television service")
        .with(0x02, "digital radio sound service")
        .with(0x03, "Teletext service")
        .with(0x0A, "advanced codec digital radio sound service")
        .with(0x0C, "data broadcast service")
        .with(0x11, "MPEG-2 HD digital television service")
        .with(0x16, "H.264/AVC SD digital television service")
        .with(0x19, "H.264/AVC HD digital television service")
        .with(0x1F, "HEVC digital television service")
        .with_range(0x80, 0xFE, "user defined")
}

fn running_status() -> ValueMappings {
    ValueMappings::new()
        .with(0, "undefined")
        .with(1, "not running")
        .with(2, "starts in a few seconds")
        .with(3, "pausing")
        .with(4, "running")
        .with(5, "service off-air")
}

fn audio_types() -> ValueMappings {
    ValueMappings::new()
        .with(0x00, "Undefined")
        .with(0x01, "Clean effects")
        .with(0x02, "Hearing impaired")
        .with(0x03, "Visual impaired commentary")
}

fn hex(name: &str, bits: u32, format: &str) -> FieldDefinition {
    DataField::unsigned(name, bits).with_format(format).into()
}

fn num(name: &str, bits: u32) -> FieldDefinition {
    DataField::unsigned(name, bits).into()
}

fn flag(name: &str, bits: u32) -> FieldDefinition {
    DataField::bits(name, bits).into()
}

fn crc_32() -> FieldDefinition {
    DataField::checksum("CRC_32", 32).into()
}

/// Generic descriptor entry, used inside descriptor loops of tables
///
/// Section decoding keeps every descriptor as tag, length and raw payload and
/// fails as a whole on a malformed entry. Typed decoding with the registered
/// descriptor templates, and skipping a broken descriptor while keeping its
/// siblings, is left to the caller: re-decode the loop's span with
/// [`crate::descriptor::decode_descriptor_loop`].
fn descriptor_entry() -> Vec<FieldDefinition> {
    vec![
        DataField::unsigned("descriptor_tag", 8)
            .with_format("0x%02X")
            .with_mappings(descriptor_tags())
            .into(),
        num("descriptor_length", 8),
        DataField::sized_by("descriptor_payload", Encoding::Octets, "descriptor_length").into(),
    ]
}

/// Descriptor loop sized by `length_field`; see [`descriptor_entry`]
fn descriptor_loop(name: &str, length_field: &str) -> FieldDefinition {
    LoopField::bytes(name, length_field, descriptor_entry())
        .with_item_name("descriptor")
        .into()
}

/// table_id through last_section_number of a long-form section
fn long_header(extension: &str) -> Vec<FieldDefinition> {
    vec![
        DataField::unsigned("table_id", 8)
            .with_format("0x%02X")
            .with_mappings(table_ids())
            .into(),
        flag("section_syntax_indicator", 1),
        flag("private_indicator", 1),
        flag("reserved", 2),
        num("section_length", 12),
        hex(extension, 16, "0x%04X"),
        flag("reserved", 2),
        num("version_number", 5),
        flag("current_next_indicator", 1),
        num("section_number", 8),
        num("last_section_number", 8),
    ]
}

/// Header bytes after section_length plus CRC_32 in a long-form section
const LONG_FORM_OVERHEAD: i64 = 5 + 4;

fn pat() -> Template {
    let program = vec![
        num("program_number", 16),
        flag("reserved", 3),
        ConditionalField::new(
            Condition::equals("program_number", 0),
            vec![hex("network_PID", 13, "0x%04X")],
        )
        .with_else(vec![hex("program_map_PID", 13, "0x%04X")])
        .into(),
    ];

    Template::table("program_association_section", vec![0x00])
        .with_group("PSI")
        .with_display_name(0x00, "PAT")
        .with_fields(long_header("transport_stream_id"))
        .field(
            LoopField::bytes("programs", "section_length", program)
                .with_correction(-LONG_FORM_OVERHEAD)
                .with_item_name("program"),
        )
        .field(crc_32())
        .with_unique_key(["table_id", "transport_stream_id", "section_number"])
}

fn cat() -> Template {
    Template::table("conditional_access_section", vec![0x01])
        .with_group("PSI")
        .with_display_name(0x01, "CAT")
        .with_fields(long_header("reserved_extension"))
        .field(
            LoopField::bytes("descriptors", "section_length", descriptor_entry())
                .with_correction(-LONG_FORM_OVERHEAD)
                .with_item_name("descriptor"),
        )
        .field(crc_32())
        .with_unique_key(["table_id", "section_number"])
}

fn pmt() -> Template {
    let stream = vec![
        DataField::unsigned("stream_type", 8)
            .with_format("0x%02X")
            .with_mappings(stream_types())
            .into(),
        flag("reserved", 3),
        hex("elementary_PID", 13, "0x%04X"),
        flag("reserved", 4),
        num("ES_info_length", 12),
        descriptor_loop("ES_descriptors", "ES_info_length"),
    ];

    Template::table("TS_program_map_section", vec![0x02])
        .with_group("PSI")
        .with_display_name(0x02, "PMT")
        .with_fields(long_header("program_number"))
        .field(flag("reserved", 3))
        .field(hex("PCR_PID", 13, "0x%04X"))
        .field(flag("reserved", 4))
        .field(num("program_info_length", 12))
        .field(descriptor_loop("program_descriptors", "program_info_length"))
        // the stream loop runs up to the CRC_32
        .field(
            LoopField::implicit("streams", stream)
                .with_correction(-4)
                .with_item_name("stream"),
        )
        .field(crc_32())
        .with_unique_key(["table_id", "program_number", "section_number"])
}

fn nit() -> Template {
    let transport_stream = vec![
        hex("transport_stream_id", 16, "0x%04X"),
        hex("original_network_id", 16, "0x%04X"),
        flag("reserved_future_use", 4),
        num("transport_descriptors_length", 12),
        descriptor_loop("transport_descriptors", "transport_descriptors_length"),
    ];

    Template::table("network_information_section", vec![0x40, 0x41])
        .with_group("SI")
        .with_display_name(0x40, "NIT actual")
        .with_display_name(0x41, "NIT other")
        .with_fields(long_header("network_id"))
        .field(flag("reserved_future_use", 4))
        .field(num("network_descriptors_length", 12))
        .field(descriptor_loop("network_descriptors", "network_descriptors_length"))
        .field(flag("reserved_future_use", 4))
        .field(num("transport_stream_loop_length", 12))
        .field(
            LoopField::bytes("transport_streams", "transport_stream_loop_length", transport_stream)
                .with_item_name("transport_stream"),
        )
        .field(crc_32())
        .with_unique_key(["table_id", "network_id", "section_number"])
}

fn sdt() -> Template {
    let service = vec![
        hex("service_id", 16, "0x%04X"),
        flag("reserved_future_use", 6),
        flag("EIT_schedule_flag", 1),
        flag("EIT_present_following_flag", 1),
        DataField::unsigned("running_status", 3)
            .with_mappings(running_status())
            .into(),
        flag("free_CA_mode", 1),
        num("descriptors_loop_length", 12),
        descriptor_loop("descriptors", "descriptors_loop_length"),
    ];

    Template::table("service_description_section", vec![0x42, 0x46])
        .with_group("SI")
        .with_display_name(0x42, "SDT actual")
        .with_display_name(0x46, "SDT other")
        .with_fields(long_header("transport_stream_id"))
        .field(hex("original_network_id", 16, "0x%04X"))
        .field(flag("reserved_future_use", 8))
        .field(
            LoopField::implicit("services", service)
                .with_correction(-4)
                .with_item_name("service"),
        )
        .field(crc_32())
        .with_unique_key([
            "table_id",
            "transport_stream_id",
            "original_network_id",
            "section_number",
        ])
}

fn tdt() -> Template {
    Template::table("time_date_section", vec![0x70])
        .with_group("SI")
        .with_display_name(0x70, "TDT")
        .field(
            DataField::unsigned("table_id", 8)
                .with_format("0x%02X")
                .with_mappings(table_ids()),
        )
        .field(flag("section_syntax_indicator", 1))
        .field(flag("reserved_future_use", 1))
        .field(flag("reserved", 2))
        .field(num("section_length", 12))
        .field(DataField::unsigned("UTC_date", 16).with_prefix("MJD "))
        .field(DataField::new("UTC_time", Encoding::Nibbles, 24))
        .with_unique_key(["table_id"])
}

fn descriptor_header() -> Vec<FieldDefinition> {
    vec![
        hex("descriptor_tag", 8, "0x%02X"),
        num("descriptor_length", 8),
    ]
}

fn ca_descriptor() -> Template {
    Template::descriptor("CA_descriptor", 0x09)
        .with_group("MPEG")
        .with_fields(descriptor_header())
        .field(hex("CA_system_ID", 16, "0x%04X"))
        .field(flag("reserved", 3))
        .field(hex("CA_PID", 13, "0x%04X"))
        .field(
            LoopField::implicit("private_data", vec![hex("private_data_byte", 8, "0x%02X")])
                .with_item_name("byte"),
        )
}

fn iso_639_language_descriptor() -> Template {
    Template::descriptor("ISO_639_language_descriptor", 0x0A)
        .with_group("MPEG")
        .with_fields(descriptor_header())
        .field(
            LoopField::implicit(
                "languages",
                vec![
                    DataField::new("ISO_639_language_code", Encoding::Text, 24).into(),
                    DataField::unsigned("audio_type", 8)
                        .with_mappings(audio_types())
                        .into(),
                ],
            )
            .with_item_name("language"),
        )
}

fn network_name_descriptor() -> Template {
    Template::descriptor("network_name_descriptor", 0x40)
        .with_group("DVB")
        .with_fields(descriptor_header())
        .field(DataField::sized_by("network_name", Encoding::Text, "descriptor_length"))
}

fn service_descriptor() -> Template {
    Template::descriptor("service_descriptor", 0x48)
        .with_group("DVB")
        .with_fields(descriptor_header())
        .field(
            DataField::unsigned("service_type", 8)
                .with_format("0x%02X")
                .with_mappings(service_types()),
        )
        .field(DataField::text_prefixed("service_provider_name", 8))
        .field(DataField::text_prefixed("service_name", 8))
}

fn stream_identifier_descriptor() -> Template {
    Template::descriptor("stream_identifier_descriptor", 0x52)
        .with_group("DVB")
        .with_fields(descriptor_header())
        .field(num("component_tag", 8))
}
