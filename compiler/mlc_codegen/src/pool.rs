// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pool emission. Every manifold is classified relative to the language
//! being emitted; `Cis` and `Source` manifolds become wrapper functions,
//! `Trans` manifolds appear inline in their callers as foreign calls, and
//! `Uncalled` manifolds are skipped.

#[cfg(test)]
mod tests;

use crate::grammar::{DispatchCase, Grammar};
use crate::{pool_file_name, Error};
use log::debug;
use mlc_ast::ast::{Lang, Lit, Type};
use mlc_manifold::manifold::{Arg, DataVal, Manifold};
use mlc_manifold::serial::SerialMap;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// The classification of a manifold relative to an emitted language.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ManifoldClass {
    /// Sourced, exported, and never called: a direct re-export wrapper.
    Source,
    /// Called and implemented in the emitted language.
    Cis,
    /// Called from the emitted language but implemented elsewhere.
    Trans,
    /// Not part of this pool.
    Uncalled,
}

/// Classifies a manifold with respect to the language being emitted.
#[must_use]
pub fn classify(manifold: &Manifold, lang: Lang) -> ManifoldClass {
    let in_lang = manifold.language() == lang;
    if manifold.called {
        if in_lang {
            ManifoldClass::Cis
        } else {
            ManifoldClass::Trans
        }
    } else if in_lang && manifold.exported && !manifold.realizations.is_empty() {
        ManifoldClass::Source
    } else {
        ManifoldClass::Uncalled
    }
}

/// Emits the complete pool script for the grammar's language.
pub fn emit_pool(
    grammar: &dyn Grammar,
    manifolds: &[Manifold],
    serial: &SerialMap,
    executors: &FxHashMap<Lang, String>,
) -> Result<String, Error> {
    let lang = grammar.lang();
    let emitted: Vec<&Manifold> = manifolds
        .iter()
        .filter(|m| {
            matches!(
                classify(m, lang),
                ManifoldClass::Cis | ManifoldClass::Source
            )
        })
        .collect();
    debug!("emitting {} manifolds into the {lang} pool", emitted.len());

    let mut out = String::new();
    out.push_str(grammar.shebang());
    out.push_str("\n\n");
    out.push_str(&grammar.comment("Generated by the Morloc compiler; do not edit."));
    out.push_str("\n\n");
    out.push_str(grammar.preamble());
    out.push('\n');

    let paths = source_paths(&emitted, serial, lang);
    if !paths.is_empty() {
        for path in paths {
            out.push_str(&grammar.import(&path));
            out.push('\n');
        }
        out.push('\n');
    }

    for manifold in &emitted {
        out.push_str(&emit_function(grammar, manifolds, manifold, serial, executors)?);
        out.push('\n');
    }

    let cases: Vec<DispatchCase> = emitted
        .iter()
        .map(|m| DispatchCase {
            id: m.id,
            packer: serial.packer_for(result_type(m, lang)).to_string(),
        })
        .collect();
    out.push_str(&grammar.dispatch(&cases));
    Ok(out)
}

/// Source files the pool must load: serialization sources first, then the
/// sources of every emitted realization and function-reference argument.
fn source_paths(emitted: &[&Manifold], serial: &SerialMap, lang: Lang) -> Vec<Rc<str>> {
    let mut paths: Vec<Rc<str>> = Vec::new();
    let push = |paths: &mut Vec<Rc<str>>, path: &Rc<str>| {
        if !paths.contains(path) {
            paths.push(path.clone());
        }
    };

    for path in &serial.sources {
        push(&mut paths, path);
    }
    for manifold in emitted {
        if let Some(path) = manifold
            .realization_in(lang)
            .and_then(|r| r.source_path.as_ref())
        {
            push(&mut paths, path);
        }
        for arg in &manifold.args {
            if let Arg::Nest(_, realizations) = arg {
                if let Some(path) = realizations
                    .iter()
                    .find(|r| r.lang == lang)
                    .and_then(|r| r.source_path.as_ref())
                {
                    push(&mut paths, path);
                }
            }
        }
    }
    paths
}

fn emit_function(
    grammar: &dyn Grammar,
    manifolds: &[Manifold],
    manifold: &Manifold,
    serial: &SerialMap,
    executors: &FxHashMap<Lang, String>,
) -> Result<String, Error> {
    let lang = grammar.lang();
    let positional = manifold
        .args
        .iter()
        .filter(|a| matches!(a, Arg::Positional(_)))
        .count();
    let params: Vec<String> = if manifold.bound_vars.is_empty() && positional > 0 {
        (0..positional).map(|i| format!("x{i}")).collect()
    } else {
        manifold
            .bound_vars
            .iter()
            .map(|v| v.as_str().to_string())
            .collect()
    };

    let domains: Vec<&Type> = manifold
        .realization_in(lang)
        .and_then(|r| r.concrete_type())
        .or(manifold.abstract_type.as_ref())
        .map(Type::domains)
        .unwrap_or_default();

    let mut body = Vec::new();
    for (k, arg) in manifold.args.iter().enumerate() {
        let domain = domains.get(k).copied();
        let rhs = match arg {
            // Bound variables arrive serialized from the command line.
            Arg::Name(v) => grammar.call(serial.unpacker_for(domain), &[v.to_string()]),
            Arg::Positional(i) => {
                grammar.call(serial.unpacker_for(domain), &[format!("x{i}")])
            }
            Arg::Data(data) => render_data(grammar, data),
            Arg::Nest(v, realizations) => realizations
                .iter()
                .find(|r| r.lang == lang)
                .map_or_else(|| v.to_string(), |r| r.source_name.to_string()),
            Arg::Call(child_id) => {
                let child = &manifolds[usize::from(*child_id)];
                let child_args: Vec<String> = child
                    .bound_vars
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                if child.language() == lang {
                    grammar.call(&format!("m{}", usize::from(child.id)), &child_args)
                } else {
                    let child_lang = child.language();
                    let executor = executors
                        .get(&child_lang)
                        .ok_or(Error::MissingExecutor(child_lang))?;
                    let call = grammar.foreign_call(
                        executor,
                        &pool_file_name(child_lang),
                        child.id,
                        &child_args,
                    );
                    grammar.call(serial.unpacker_for(domain), &[call])
                }
            }
        };
        body.push(grammar.assign(&format!("a{k}"), &rhs));
    }

    let locals: Vec<String> = (0..manifold.args.len()).map(|k| format!("a{k}")).collect();
    let result = match manifold.realization_in(lang) {
        Some(realization) => grammar.try_call(&realization.source_name, &locals),
        // A value manifold has no callee; it returns its only argument.
        None => locals
            .first()
            .cloned()
            .unwrap_or_else(|| grammar.unit_lit()),
    };
    body.push(grammar.ret(&result));

    Ok(grammar.function(&format!("m{}", usize::from(manifold.id)), &params, &body))
}

/// The type a manifold's wrapper returns, used to pick its packer.
fn result_type(manifold: &Manifold, lang: Lang) -> Option<&Type> {
    manifold
        .realization_in(lang)
        .and_then(|r| r.concrete_type())
        .or(manifold.abstract_type.as_ref())
        .map(final_output)
}

fn final_output(ty: &Type) -> &Type {
    match ty {
        Type::Forall(_, body) => final_output(body),
        Type::Fun(_, output) => final_output(output),
        _ => ty,
    }
}

fn render_data(grammar: &dyn Grammar, data: &DataVal) -> String {
    match data {
        DataVal::Lit(lit) => match lit {
            Lit::Num(_) => lit.to_string(),
            Lit::Str(s) => grammar.quote(s),
            Lit::Bool(b) => grammar.bool_lit(*b),
            Lit::Unit => grammar.unit_lit(),
        },
        DataVal::List(items) => {
            let items: Vec<String> = items.iter().map(|i| render_data(grammar, i)).collect();
            grammar.list(&items)
        }
        DataVal::Tuple(items) => {
            let items: Vec<String> = items.iter().map(|i| render_data(grammar, i)).collect();
            grammar.tuple(&items)
        }
        DataVal::Record(fields) => {
            let fields: Vec<(String, String)> = fields
                .iter()
                .map(|(key, value)| (key.to_string(), render_data(grammar, value)))
                .collect();
            grammar.record(&fields)
        }
    }
}
