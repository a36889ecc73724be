use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use roboframe_envelope::Envelope;
use roboframe_frame::{CodecError, Decoded};
use roboframe_schema::{describe, Generated, Presence, Record, SchemaName};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Encode: the Arrow IPC stream bytes. Decode: the bare record JSON.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    schema_name: SchemaName,
    message_type: &'a str,
    event: &'a str,
    timestamp: u64,
    record: &'a Record,
    corrupted: Vec<String>,
}

pub fn print_envelope(envelope: &Envelope, payload: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            envelope.to_json().unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "SCHEMA", "TYPE", "TIMESTAMP", "BYTES"])
                .add_row(vec![
                    envelope.event_name().to_string(),
                    envelope.schema_name.to_string(),
                    envelope.message_type.to_string(),
                    envelope.timestamp.to_string(),
                    payload.len().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "event={} schema={} type={} timestamp={} bytes={}",
            envelope.event_name(),
            envelope.schema_name,
            envelope.message_type,
            envelope.timestamp,
            payload.len()
        ),
        OutputFormat::Raw => print_raw(payload),
    }
}

pub fn print_decoded(envelope: &Envelope, decoded: &Decoded<Record>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DecodedOutput {
                schema_name: envelope.schema_name,
                message_type: envelope.message_type.as_str(),
                event: envelope.event_name(),
                timestamp: envelope.timestamp,
                record: &decoded.record,
                corrupted: corruption_messages(&decoded.corrupted),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in record_fields(&decoded.record) {
                table.add_row(vec![field, value]);
            }
            println!("{} ({})", envelope.schema_name, envelope.event_name());
            println!("{table}");
            for message in corruption_messages(&decoded.corrupted) {
                println!("corrupt: {message}");
            }
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = record_fields(&decoded.record)
                .into_iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect();
            println!("{} {}", envelope.schema_name, fields.join(" "));
        }
        OutputFormat::Raw => println!(
            "{}",
            serde_json::to_string(&decoded.record).unwrap_or_else(|_| "{}".to_string())
        ),
    }
}

pub fn print_schema(schema: SchemaName, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => println!("{}", describe(schema)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "ARROW TYPE", "KIND", "PRESENCE", "NULLABLE"]);
            for spec in schema.fields() {
                table.add_row(vec![
                    spec.name.to_string(),
                    format!("{:?}", spec.kind.data_type()),
                    spec.kind.to_string(),
                    presence_label(&spec.presence),
                    spec.nullable().to_string(),
                ]);
            }
            println!("{schema} ({})", schema.message_kind());
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for spec in schema.fields() {
                println!(
                    "{:<20} {:<16} {}",
                    spec.name,
                    spec.kind,
                    presence_label(&spec.presence)
                );
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn presence_label(presence: &Presence) -> String {
    match presence {
        Presence::Required => "required".to_string(),
        Presence::Default(value) => format!("default {value}"),
        Presence::Generated(Generated::CommandId) => "generated id".to_string(),
        Presence::Generated(Generated::WallClock) => "generated time".to_string(),
        Presence::Nullable => "nullable".to_string(),
    }
}

/// Top-level record fields as display strings, sorted by name.
fn record_fields(record: &Record) -> Vec<(String, String)> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(field, value)| {
                let text = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (field, text)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn corruption_messages(errors: &[CodecError]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}
