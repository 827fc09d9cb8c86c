// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(clippy::mod_module_files, clippy::pedantic, clippy::unwrap_used)]

pub mod compile;
pub mod config;

pub use compile::{compile, write_artifacts, Artifacts};
pub use config::Config;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error)]
#[diagnostic(transparent)]
#[error(transparent)]
pub enum Error {
    Frontend(mlc_frontend::Error),
    Manifold(mlc_manifold::Error),
    Codegen(mlc_codegen::Error),
}
