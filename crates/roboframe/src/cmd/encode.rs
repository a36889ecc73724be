use roboframe_envelope::{unwrap, Encoder};
use roboframe_frame::BuilderConfig;
use roboframe_schema::{Record, SchemaName};
use serde_json::Value;
use tracing::info;

use crate::cmd::{read_input, EncodeArgs};
use crate::exit::{envelope_error, schema_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_envelope, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = args
        .schema
        .parse::<SchemaName>()
        .map_err(|err| schema_error("invalid schema", err))?;
    let value = resolve_record(&args)?;
    let record =
        Record::from_json(schema, &value).map_err(|err| schema_error("invalid record", err))?;

    let encoder = Encoder::with_config(BuilderConfig {
        padding_rows: args.padding_rows,
    });
    let envelope = encoder
        .encode(&record)
        .map_err(|err| envelope_error("encode failed", err))?;
    let payload = unwrap(&envelope).map_err(|err| envelope_error("encode failed", err))?;

    info!(
        schema = %schema,
        event = envelope.event_name(),
        bytes = payload.len(),
        "encoded record"
    );
    print_envelope(&envelope, &payload, format);
    Ok(SUCCESS)
}

fn resolve_record(args: &EncodeArgs) -> CliResult<Value> {
    let (text, source) = match &args.json {
        Some(json) => (json.clone(), "--json"),
        None => (read_input(args.file.as_deref())?, "input"),
    };
    serde_json::from_str(&text)
        .map_err(|err| CliError::new(USAGE, format!("{source} is not valid JSON: {err}")))
}
