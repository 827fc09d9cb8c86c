// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Nexus emission. The nexus is a small Python script exposing one CLI
//! subcommand per exported root manifold; each subcommand launches the
//! owning pool through its configured executor and streams the pool's
//! stdout while propagating the exit status.

#[cfg(test)]
mod tests;

use crate::{pool_file_name, Error};
use mlc_ast::ast::Lang;
use mlc_manifold::manifold::{Arg, Manifold, ManifoldId};
use rustc_hash::FxHashMap;
use std::fmt::Write;

/// One subcommand of the generated nexus.
#[derive(Clone, Debug)]
pub struct NexusCommand {
    /// The subcommand name (the exported composition).
    pub name: String,
    /// The root manifold invoked by the subcommand.
    pub id: ManifoldId,
    /// The language of the pool owning the manifold.
    pub lang: Lang,
    /// The number of positional arguments.
    pub arity: usize,
    /// The general type, rendered for the help listing.
    pub type_str: String,
}

/// Extracts the nexus command table from the manifold list.
#[must_use]
pub fn commands(manifolds: &[Manifold]) -> Vec<NexusCommand> {
    manifolds
        .iter()
        .filter(|m| m.exported)
        .map(|m| {
            let arity = if m.bound_vars.is_empty() {
                m.args
                    .iter()
                    .filter(|a| matches!(a, Arg::Positional(_)))
                    .count()
            } else {
                m.bound_vars.len()
            };
            NexusCommand {
                name: m.composition.to_string(),
                id: m.id,
                lang: m.language(),
                arity,
                type_str: m
                    .abstract_type
                    .as_ref()
                    .map_or_else(|| "?".to_string(), ToString::to_string),
            }
        })
        .collect()
}

/// Emits the nexus dispatcher script.
pub fn emit_nexus(
    commands: &[NexusCommand],
    executors: &FxHashMap<Lang, String>,
) -> Result<String, Error> {
    let mut table = String::new();
    for command in commands {
        let executor = executors
            .get(&command.lang)
            .ok_or(Error::MissingExecutor(command.lang))?;
        writeln!(
            table,
            "    \"{}\": ({}, \"{}\", \"{}\", {}, \"{}\"),",
            command.name,
            usize::from(command.id),
            pool_file_name(command.lang),
            executor,
            command.arity,
            command.type_str
        )
        .expect("string write should succeed");
    }

    Ok(format!(
        r#"#!/usr/bin/env python3

# Generated by the Morloc compiler; do not edit.

import os
import subprocess
import sys

COMMANDS = {{
{table}}}


def usage(out):
    out.write("Usage: nexus <command> [arguments]\n")
    out.write("\n")
    out.write("Commands:\n")
    for name in sorted(COMMANDS):
        out.write("  %s :: %s\n" % (name, COMMANDS[name][4]))


def main():
    if len(sys.argv) < 2:
        usage(sys.stderr)
        sys.exit(1)
    if sys.argv[1] in ("-h", "--help"):
        usage(sys.stdout)
        sys.exit(0)
    name = sys.argv[1]
    if name not in COMMANDS:
        sys.stderr.write("unknown command: %s\n" % name)
        usage(sys.stderr)
        sys.exit(1)
    mid, pool, executor, arity, _ = COMMANDS[name]
    args = sys.argv[2:]
    if len(args) != arity:
        sys.stderr.write("%s expects %d arguments, got %d\n" % (name, arity, len(args)))
        sys.exit(1)
    pool_path = os.path.join(os.path.dirname(os.path.abspath(__file__)), pool)
    result = subprocess.run([executor, pool_path, str(mid)] + args)
    sys.exit(result.returncode)


if __name__ == "__main__":
    main()
"#
    ))
}
