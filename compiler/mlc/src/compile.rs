// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The compilation pipeline: module DAG resolution, type-alias desugaring,
//! signature unification, manifold construction, and code emission. No
//! artifact is written unless the whole pipeline succeeds.


use crate::config::Config;
use crate::Error;
use log::debug;
use mlc_ast::assigner::Assigner;
use mlc_ast::ast::{ExprKind, Lang, Module};
use mlc_codegen::grammar::grammar_for;
use mlc_codegen::{nexus, pool, pool_file_name};
use mlc_frontend::{dealias, resolve, signatures};
use mlc_manifold::{build, serial};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The generated artifacts: the nexus script and one pool per language.
#[derive(Clone, Debug)]
pub struct Artifacts {
    /// The nexus dispatcher script.
    pub nexus: String,
    /// The pool scripts, one per realized language.
    pub pools: Vec<(Lang, String)>,
}

/// Compiles a parsed module set into nexus and pool scripts.
pub fn compile(mut modules: Vec<Module>, config: &Config) -> Result<Artifacts, Vec<Error>> {
    let mut assigner = Assigner::new();
    for module in &mut modules {
        assigner.visit_module(module);
    }
    resolve_source_paths(&mut modules, config.lib_root());

    let dag = resolve::resolve(&modules)
        .map_err(|errors| wrap(errors, mlc_frontend::Error::Resolve))?;
    debug!("resolved module graph rooted at `{}`", dag.root());

    dealias::desugar(&mut modules, &dag)
        .map_err(|errors| wrap(errors, mlc_frontend::Error::Dealias))?;

    let terms = signatures::build(&modules, &dag)
        .map_err(|errors| wrap(errors, mlc_frontend::Error::Signatures))?;

    let manifolds = build::build(&modules, &dag, &terms).map_err(|errors| {
        errors
            .into_iter()
            .map(|e| Error::Manifold(mlc_manifold::Error::Build(e)))
            .collect::<Vec<_>>()
    })?;

    let mut pools = Vec::new();
    for lang in Lang::ALL {
        let emitted = manifolds.iter().any(|m| {
            matches!(
                pool::classify(m, lang),
                pool::ManifoldClass::Cis | pool::ManifoldClass::Source
            )
        });
        if !emitted {
            continue;
        }
        let grammar = grammar_for(lang);
        let map = serial::plan(
            &modules,
            lang,
            grammar.generic_packer(),
            grammar.generic_unpacker(),
        );
        let text = pool::emit_pool(grammar.as_ref(), &manifolds, &map, config.executors())
            .map_err(|e| vec![Error::Codegen(e)])?;
        pools.push((lang, text));
    }

    let nexus = nexus::emit_nexus(&nexus::commands(&manifolds), config.executors())
        .map_err(|e| vec![Error::Codegen(e)])?;

    Ok(Artifacts { nexus, pools })
}

fn wrap<E>(errors: Vec<E>, f: impl Fn(E) -> mlc_frontend::Error) -> Vec<Error> {
    errors.into_iter().map(|e| Error::Frontend(f(e))).collect()
}

/// Resolves relative source paths against the configured library root.
fn resolve_source_paths(modules: &mut [Module], lib_root: &Path) {
    if lib_root == Path::new(".") {
        return;
    }
    for module in modules {
        for item in &mut module.body {
            if let ExprKind::Source(source) = &mut item.kind {
                if let Some(path) = &source.path {
                    if !Path::new(path.as_ref()).is_absolute() {
                        let resolved = lib_root.join(path.as_ref());
                        source.path = Some(resolved.to_string_lossy().as_ref().into());
                    }
                }
            }
        }
    }
}

/// Writes the artifacts into `out_dir`, marking each script executable.
/// Returns the written paths.
pub fn write_artifacts(artifacts: &Artifacts, out_dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    let nexus_path = out_dir.join("nexus.py");
    fs::write(&nexus_path, &artifacts.nexus)?;
    make_executable(&nexus_path)?;
    written.push(nexus_path);

    for (lang, text) in &artifacts.pools {
        let pool_path = out_dir.join(pool_file_name(*lang));
        fs::write(&pool_path, text)?;
        make_executable(&pool_path)?;
        written.push(pool_path);
    }

    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
