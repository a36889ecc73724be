use roboframe_envelope::{Decoder, Envelope};
use roboframe_frame::CodecConfig;
use roboframe_schema::SchemaName;
use tracing::{info, warn};

use crate::cmd::{read_input, DecodeArgs};
use crate::exit::{envelope_error, schema_error, CliResult, SUCCESS};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let expected = args
        .expect
        .as_deref()
        .map(str::parse::<SchemaName>)
        .transpose()
        .map_err(|err| schema_error("invalid schema", err))?;

    let text = read_input(args.file.as_deref())?;
    let envelope =
        Envelope::from_json(&text).map_err(|err| envelope_error("invalid envelope", err))?;

    let decoder = Decoder::with_config(CodecConfig {
        max_frame_size: args.max_frame_size,
    });
    let decoded = match expected {
        Some(expected) => decoder.decode_expecting(&envelope, expected),
        None => decoder.decode(&envelope),
    }
    .map_err(|err| envelope_error("decode failed", err))?;

    if decoded.is_clean() {
        info!(schema = %envelope.schema_name, "decoded record");
    } else {
        warn!(
            schema = %envelope.schema_name,
            dropped = decoded.corrupted.len(),
            "decoded record with corrupt fields"
        );
    }
    print_decoded(&envelope, &decoded, format);
    Ok(SUCCESS)
}
