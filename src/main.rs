mod cli;

use cli::{Config, read_program, read_text, setup_logging};
use clap::Parser;
use shader_lower::pipeline::compile_and_report;
use std::process;
use tracing::{info, warn};

fn main() {
    let config = Config::parse();
    setup_logging(&config);

    let program = match read_program(&config.input) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    info!(
        path = %config.input.display(),
        decls = program.decls.len(),
        "loaded typed program"
    );

    // Diagnostics fall back to plain text when the source cannot be read
    let source = config.source.as_deref().and_then(|path| match read_text(path) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("{e}");
            None
        }
    });
    let filename = config
        .source
        .as_deref()
        .unwrap_or(&config.input)
        .display()
        .to_string();

    match compile_and_report(&filename, source.as_deref(), &program, &config.lower_config()) {
        Ok(output) => {
            if let Some(text) = output.disassembly {
                print!("{text}");
            }
        }
        Err(()) => process::exit(1),
    }
}
