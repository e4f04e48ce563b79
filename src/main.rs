use std::io::Read;
use std::path::PathBuf;
use std::process::exit;
use std::rc::Rc;

use clap::Parser as CliParser;

use cprep::driver::{self, DriverError};
use cprep::file::FsOpener;
use cprep::pp::MacroTable;

/// Command-line arguments for the preprocessor.
#[derive(CliParser, Debug)]
#[command(name = "cprep", version, about = "C++ preprocessor written in Rust")]
struct Cli {
    /// Input source files; standard input when empty
    input_files: Vec<PathBuf>,

    /// Write output here instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Predefine a macro
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]", action = clap::ArgAction::Append)]
    defines: Vec<String>,

    /// Enable verbose diagnostic output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    let defines: Vec<(String, Option<String>)> = cli
        .defines
        .iter()
        .map(|def| match def.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (def.clone(), None),
        })
        .collect();

    let mut output = String::new();
    let mut failed = false;

    if cli.input_files.is_empty() {
        // no arguments: read standard input under an empty file name
        let mut text = String::new();
        match std::io::stdin().read_to_string(&mut text) {
            Ok(_) => {
                let macros = MacroTable::new();
                driver::apply_defines(&macros, &defines);
                match driver::preprocess_source(&text, "", macros, Rc::new(FsOpener)) {
                    Ok(out) => {
                        output.push_str(&out);
                        output.push('\n');
                    }
                    Err(err) => {
                        eprintln!("{}", err);
                        failed = true;
                    }
                }
            }
            Err(err) => {
                log::error!("Open file failed: <stdin>: {}", err);
                failed = true;
            }
        }
    } else {
        for path in &cli.input_files {
            match driver::preprocess_file(&path.to_string_lossy(), &defines) {
                Ok(out) => {
                    output.push_str(&out);
                    output.push('\n');
                }
                Err(DriverError::Io { path, source }) => {
                    // unreadable inputs are logged; processing continues
                    log::error!("Open file failed: {}: {}", path, source);
                }
                Err(DriverError::Parse(err)) => {
                    eprintln!("{}", err);
                    failed = true;
                }
            }
        }
    }

    match &cli.output {
        Some(path) => {
            if let Err(err) = std::fs::write(path, &output) {
                log::error!("Write failed: {}: {}", path.display(), err);
                failed = true;
            }
        }
        None => print!("{}", output),
    }

    if failed {
        exit(1);
    }
}
