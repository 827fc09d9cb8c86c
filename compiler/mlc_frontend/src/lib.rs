// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(clippy::mod_module_files, clippy::pedantic, clippy::unwrap_used)]

pub mod dealias;
pub mod resolve;
pub mod signatures;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error)]
#[diagnostic(transparent)]
#[error(transparent)]
pub enum Error {
    Resolve(resolve::Error),
    Dealias(dealias::Error),
    Signatures(signatures::Error),
}
