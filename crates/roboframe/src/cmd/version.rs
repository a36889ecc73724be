use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: String,
    profile: &'static str,
    os: &'static str,
    arch: &'static str,
    arrow_ipc: &'static str,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("roboframe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let output = VersionOutput {
        name: "roboframe",
        version: env!("CARGO_PKG_VERSION"),
        target: target_triple(),
        profile: option_env!("ROBOFRAME_BUILD_PROFILE").unwrap_or("unknown"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        arrow_ipc: "stream",
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            println!("name: {}", output.name);
            println!("version: {}", output.version);
            println!("target: {}", output.target);
            println!("profile: {}", output.profile);
            println!("os: {}", output.os);
            println!("arch: {}", output.arch);
            println!("arrow_ipc: {}", output.arrow_ipc);
        }
    }
    Ok(SUCCESS)
}

fn target_triple() -> String {
    match option_env!("ROBOFRAME_BUILD_TARGET") {
        Some(target) => target.to_string(),
        None => format!(
            "{}-unknown-{}",
            std::env::consts::ARCH,
            std::env::consts::OS
        ),
    }
}
