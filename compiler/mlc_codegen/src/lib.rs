// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(clippy::mod_module_files, clippy::pedantic, clippy::unwrap_used)]

pub mod grammar;
pub mod nexus;
pub mod pool;

use miette::Diagnostic;
use mlc_ast::ast::Lang;
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error)]
pub enum Error {
    #[error("no executor is configured for language `{0}`")]
    #[diagnostic(
        code("Mlc.Emit.MissingExecutor"),
        help("configure an executor command for the language, e.g. `python3`")
    )]
    MissingExecutor(Lang),
}

/// The conventional on-disk name for a language's pool script.
#[must_use]
pub fn pool_file_name(lang: Lang) -> String {
    format!("pool.{}", lang.extension())
}
