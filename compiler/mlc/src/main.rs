// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(clippy::mod_module_files, clippy::pedantic)]

use clap::{Parser, Subcommand};
use miette::Report;
use mlc::{compile, write_artifacts, Config};
use mlc_ast::ast::{Lang, Module};
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};

#[derive(Parser)]
#[command(name = "mlc", version, about = "Morloc polyglot compiler middle end")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a parsed module set into a nexus and per-language pools.
    Build {
        /// Path to the parser's JSON module dump, or `-` for stdin.
        modules: PathBuf,
        /// Output directory for the generated scripts.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Override the executor for a language, e.g. `py=python3.11`.
        #[arg(long = "executor", value_name = "LANG=CMD")]
        executors: Vec<String>,
        /// Override the library root used to resolve source paths.
        #[arg(long)]
        lib: Option<PathBuf>,
    },
    /// List the supported backend languages.
    Languages,
}

fn main() -> ExitCode {
    env_logger::init();
    match Cli::parse().command {
        Command::Build {
            modules,
            out,
            executors,
            lib,
        } => build(&modules, &out, &executors, lib),
        Command::Languages => {
            for lang in Lang::ALL {
                println!("{lang}\tpool.{}\t{}", lang.extension(), lang.default_executor());
            }
            ExitCode::SUCCESS
        }
    }
}

fn build(modules: &Path, out: &Path, executors: &[String], lib: Option<PathBuf>) -> ExitCode {
    let source = match read_source(modules) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", modules.display());
            return ExitCode::FAILURE;
        }
    };
    let parsed: Vec<Module> = match serde_json::from_str(&source) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("error: malformed module dump: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = Config::new();
    if let Some(lib) = lib {
        config = config.with_lib_root(lib);
    }
    for entry in executors {
        let Some((lang, command)) = parse_executor(entry) else {
            eprintln!("error: malformed executor override `{entry}` (expected LANG=CMD)");
            return ExitCode::FAILURE;
        };
        config = config.with_executor(lang, command);
    }

    let artifacts = match compile(parsed, &config) {
        Ok(artifacts) => artifacts,
        Err(errors) => {
            for error in errors {
                eprint!("{:?}", Report::new(error));
            }
            return ExitCode::FAILURE;
        }
    };

    match write_artifacts(&artifacts, out) {
        Ok(written) => {
            for path in written {
                println!("wrote {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: cannot write artifacts: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_executor(entry: &str) -> Option<(Lang, String)> {
    let (lang, command) = entry.split_once('=')?;
    let lang = Lang::from_str(lang).ok()?;
    Some((lang, command.to_string()))
}

fn read_source(path: &Path) -> io::Result<String> {
    if path.as_os_str() == "-" {
        io::read_to_string(io::stdin())
    } else {
        fs::read_to_string(path)
    }
}
