// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resolution of the module import graph. The parsed modules form a DAG with
//! a unique root (the compilation entry); each edge is reduced to an alias
//! map from the exporter's name to the importer's local name.

#[cfg(test)]
mod tests;

use miette::Diagnostic;
use mlc_ast::ast::{EVar, ExprKind, MVar, Module};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error)]
pub enum Error {
    #[error("modules form an import cycle: {0}")]
    #[diagnostic(code("Mlc.Resolve.CyclicDependency"))]
    CyclicDependency(String),

    #[error("module `{0}` imports unknown module `{1}`")]
    #[diagnostic(code("Mlc.Resolve.ModuleMissing"))]
    ModuleMissing(String, String),

    #[error("`{0}` is both included and excluded in the import of `{1}`")]
    #[diagnostic(code("Mlc.Resolve.ImportContradiction"))]
    ImportContradiction(String, String),

    #[error("`{0}` is not exported by module `{1}`")]
    #[diagnostic(code("Mlc.Resolve.ImportMissing"))]
    ImportMissing(String, String),

    #[error("compilation root is not unique: {0}")]
    #[diagnostic(
        code("Mlc.Resolve.NonUniqueRoot"),
        help("exactly one module must be imported by no other")
    )]
    NonUniqueRoot(String),
}

/// One resolved import edge: the target module and the alias map reducing
/// the target's exported surface to the importer's local names.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    /// The imported module.
    pub module: MVar,
    /// Pairs of (name exported by the target, local name in the importer).
    pub aliases: Vec<(EVar, EVar)>,
}

/// The resolved module graph.
#[derive(Clone, Debug)]
pub struct Dag {
    root: MVar,
    order: Vec<MVar>,
    edges: FxHashMap<MVar, Vec<Edge>>,
    locals: FxHashMap<MVar, FxHashSet<EVar>>,
}

impl Dag {
    /// The unique parentless module, the compilation entry.
    #[must_use]
    pub fn root(&self) -> &MVar {
        &self.root
    }

    /// Modules in dependency order: every module precedes its importers.
    #[must_use]
    pub fn order(&self) -> &[MVar] {
        &self.order
    }

    /// The resolved import edges of a module.
    #[must_use]
    pub fn edges(&self, module: &MVar) -> &[Edge] {
        self.edges.get(module).map_or(&[], Vec::as_slice)
    }

    /// Follows alias maps from `module` until the term's defining module is
    /// reached. The local alias wins over the source name at every hop.
    #[must_use]
    pub fn resolve_term(&self, module: &MVar, name: &EVar) -> Option<(MVar, EVar)> {
        for edge in self.edges(module) {
            if let Some((remote, _)) = edge.aliases.iter().find(|(_, local)| local == name) {
                return self.resolve_term(&edge.module, remote);
            }
        }
        self.locals
            .get(module)
            .filter(|locals| locals.contains(name))
            .map(|_| (module.clone(), name.clone()))
    }
}

/// Builds the module DAG, failing on cycles, missing or contradictory
/// imports, and a non-unique root.
pub fn resolve(modules: &[Module]) -> Result<Dag, Vec<Error>> {
    let mut errors = Vec::new();
    let by_name: FxHashMap<&MVar, &Module> = modules.iter().map(|m| (&m.name, m)).collect();

    let mut edges: FxHashMap<MVar, Vec<Edge>> = FxHashMap::default();
    let mut imported: FxHashSet<&MVar> = FxHashSet::default();
    for module in modules {
        let mut resolved = Vec::new();
        for import in &module.imports {
            let Some(target) = by_name.get(&import.module) else {
                errors.push(Error::ModuleMissing(
                    module.name.to_string(),
                    import.module.to_string(),
                ));
                continue;
            };
            imported.insert(&target.name);
            let exports: FxHashSet<&EVar> = target.exports.iter().collect();
            let excluded: FxHashSet<&EVar> = import.exclude.iter().collect();

            let mut aliases = Vec::new();
            match &import.include {
                Some(include) => {
                    for (remote, alias) in include {
                        if excluded.contains(remote) {
                            errors.push(Error::ImportContradiction(
                                remote.to_string(),
                                target.name.to_string(),
                            ));
                            continue;
                        }
                        if !exports.contains(remote) {
                            errors.push(Error::ImportMissing(
                                remote.to_string(),
                                target.name.to_string(),
                            ));
                            continue;
                        }
                        let local = alias.clone().unwrap_or_else(|| remote.clone());
                        aliases.push((remote.clone(), local));
                    }
                }
                None => {
                    for remote in &target.exports {
                        if !excluded.contains(remote) {
                            aliases.push((remote.clone(), remote.clone()));
                        }
                    }
                }
            }
            resolved.push(Edge {
                module: target.name.clone(),
                aliases,
            });
        }
        edges.insert(module.name.clone(), resolved);
    }

    let order = match topological_order(modules, &edges) {
        Ok(order) => order,
        Err(err) => {
            errors.push(err);
            return Err(errors);
        }
    };

    let roots: Vec<&Module> = modules
        .iter()
        .filter(|m| !imported.contains(&m.name))
        .collect();
    let root = match roots.as_slice() {
        [root] => root.name.clone(),
        [] => {
            errors.push(Error::CyclicDependency(names(modules.iter().map(|m| &m.name))));
            return Err(errors);
        }
        _ => {
            errors.push(Error::NonUniqueRoot(names(roots.iter().map(|m| &m.name))));
            return Err(errors);
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let locals = modules
        .iter()
        .map(|module| (module.name.clone(), bound_terms(module)))
        .collect();

    Ok(Dag {
        root,
        order,
        edges,
        locals,
    })
}

/// The terms a module binds in its own body: declarations, signatures, and
/// source aliases.
fn bound_terms(module: &Module) -> FxHashSet<EVar> {
    let mut terms = FxHashSet::default();
    for item in &module.body {
        match &item.kind {
            ExprKind::Decl(decl) => {
                terms.insert(decl.name.clone());
            }
            ExprKind::Sig(sig) => {
                terms.insert(sig.name.clone());
            }
            ExprKind::Source(source) => {
                for (remote, alias) in &source.names {
                    terms.insert(
                        alias
                            .clone()
                            .unwrap_or_else(|| EVar::from(remote.as_ref())),
                    );
                }
            }
            _ => {}
        }
    }
    terms
}

fn topological_order(
    modules: &[Module],
    edges: &FxHashMap<MVar, Vec<Edge>>,
) -> Result<Vec<MVar>, Error> {
    // Kahn's algorithm over the "imports" relation; modules with no imports
    // come first.
    let mut remaining: FxHashMap<&MVar, FxHashSet<&MVar>> = modules
        .iter()
        .map(|m| {
            (
                &m.name,
                edges
                    .get(&m.name)
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .map(|e| &e.module)
                    .collect(),
            )
        })
        .collect();

    let mut order = Vec::with_capacity(modules.len());
    while !remaining.is_empty() {
        let mut ready: Vec<&MVar> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if ready.is_empty() {
            return Err(Error::CyclicDependency(names(remaining.keys().copied())));
        }
        ready.sort();
        for name in &ready {
            remaining.remove(*name);
            order.push((*name).clone());
        }
        for deps in remaining.values_mut() {
            for name in &ready {
                deps.remove(*name);
            }
        }
    }
    Ok(order)
}

fn names<'a>(vals: impl Iterator<Item = &'a MVar>) -> String {
    let mut names: Vec<&str> = vals.map(MVar::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}
