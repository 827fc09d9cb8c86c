// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use mlc_ast::ast::Lang;
use rustc_hash::FxHashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Compiler configuration: the executor command used to launch each
/// language's pool and the library root against which relative source
/// paths are resolved. `MORLOC_LIB` overrides the library root.
#[derive(Clone, Debug)]
pub struct Config {
    executors: FxHashMap<Lang, String>,
    lib_root: PathBuf,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        let executors = Lang::ALL
            .iter()
            .map(|lang| (*lang, lang.default_executor().to_string()))
            .collect();
        let lib_root = env::var_os("MORLOC_LIB")
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        Self {
            executors,
            lib_root,
        }
    }

    /// Overrides the executor command for one language.
    #[must_use]
    pub fn with_executor(mut self, lang: Lang, command: impl Into<String>) -> Self {
        self.executors.insert(lang, command.into());
        self
    }

    /// Overrides the library root.
    #[must_use]
    pub fn with_lib_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.lib_root = root.into();
        self
    }

    #[must_use]
    pub fn executors(&self) -> &FxHashMap<Lang, String> {
        &self.executors
    }

    #[must_use]
    pub fn lib_root(&self) -> &Path {
        &self.lib_root
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
