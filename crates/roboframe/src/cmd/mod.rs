use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use roboframe_frame::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_PADDING_ROWS};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod schema;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one record (JSON) into an envelope.
    Encode(EncodeArgs),
    /// Decode an envelope (JSON) back into its record.
    Decode(DecodeArgs),
    /// Describe a wire schema.
    Schema(SchemaArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Schema(args) => schema::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Schema of the record (arm_telemetry, rover_telemetry, arm_command, rover_command).
    pub schema: String,
    /// Record as inline JSON.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the record JSON from a file. Default: stdin.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Distinct synthetic rows added to text columns of padded schemas.
    #[arg(long, default_value_t = DEFAULT_PADDING_ROWS, env = "ROBOFRAME_PADDING_ROWS")]
    pub padding_rows: usize,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Read the envelope JSON from a file. Default: stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Require the envelope to carry this schema.
    #[arg(long, value_name = "SCHEMA")]
    pub expect: Option<String>,
    /// Maximum accepted serialized frame size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE, env = "ROBOFRAME_MAX_FRAME_SIZE")]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema to describe.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Read a file, or all of stdin when no path is given.
pub fn read_input(file: Option<&Path>) -> CliResult<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => std::io::read_to_string(std::io::stdin())
            .map_err(|err| io_error("failed reading stdin", err)),
    }
}
