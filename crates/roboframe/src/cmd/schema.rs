use roboframe_schema::SchemaName;

use crate::cmd::SchemaArgs;
use crate::exit::{schema_error, CliResult, SUCCESS};
use crate::output::{print_schema, OutputFormat};

pub fn run(args: SchemaArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = args
        .name
        .parse::<SchemaName>()
        .map_err(|err| schema_error("invalid schema", err))?;
    print_schema(schema, format);
    Ok(SUCCESS)
}
