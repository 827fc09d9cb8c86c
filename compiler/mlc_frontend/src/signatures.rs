// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Unification of the type information attached to each term: at most one
//! general signature, any number of language-tagged realizations, and the
//! term's declarations. The merged bundles are recorded per term and in a
//! global table keyed by expression node ID.


use crate::resolve::Dag;
use miette::Diagnostic;
use mlc_ast::ast::{EVar, ExprI, ExprKind, Lang, MVar, Module, NodeId, Type};
use mlc_ast::visit::{self, Visitor};
use mlc_data_structures::index_map::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error)]
pub enum Error {
    #[error("term `{0}` has more than one general type in module `{1}`")]
    #[diagnostic(code("Mlc.Signatures.MultipleGeneralTypes"))]
    MultipleGeneralTypes(String, String),

    #[error("concrete signature for `{0}` in {1} has no matching source in module `{2}`")]
    #[diagnostic(code("Mlc.Signatures.ConcreteWithoutSource"))]
    ConcreteWithoutSource(String, Lang, String),

    #[error("term `{0}` has incompatible general types: `{1}` vs `{2}`")]
    #[diagnostic(code("Mlc.Signatures.IncompatibleGeneralType"))]
    IncompatibleGeneralType(String, String, String),
}

/// A language-specific implementation of a term.
#[derive(Clone, Debug, PartialEq)]
pub struct Realization {
    /// The backend language.
    pub lang: Lang,
    /// The function name in the source file.
    pub source_name: Rc<str>,
    /// The source file path, if any.
    pub source_path: Option<Rc<str>>,
    /// The concrete signatures declared for this realization.
    pub concrete_types: Vec<Type>,
}

impl Realization {
    /// The primary concrete type, when one was declared.
    #[must_use]
    pub fn concrete_type(&self) -> Option<&Type> {
        self.concrete_types.first()
    }
}

/// Everything known about one term: its general type, its realizations,
/// and its declarations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TermTypes {
    /// The general (language-free) type, at most one per scope.
    pub general: Option<Type>,
    /// The concrete realizations, each tagged with a language.
    pub concrete: Vec<Realization>,
    /// Node IDs of the term's value declarations.
    pub declarations: Vec<NodeId>,
}

impl TermTypes {
    /// True when the term has at least one value declaration.
    #[must_use]
    pub fn is_defined(&self) -> bool {
        !self.declarations.is_empty()
    }

    /// True when the term has at least one sourced realization.
    #[must_use]
    pub fn is_sourced(&self) -> bool {
        !self.concrete.is_empty()
    }
}

/// The global term-type table keyed by expression node ID.
pub type Table = IndexMap<NodeId, TermTypes>;

/// The output of the pass: the node-keyed table plus each module's visible
/// term environment (its own terms joined with its imports).
#[derive(Debug, Default)]
pub struct Terms {
    /// `NodeId -> TermTypes` for every variable reference.
    pub table: Table,
    /// Per-module visible terms under local names.
    pub visible: FxHashMap<MVar, FxHashMap<EVar, TermTypes>>,
}

impl Terms {
    /// The visible terms of one module.
    #[must_use]
    pub fn in_module(&self, module: &MVar) -> Option<&FxHashMap<EVar, TermTypes>> {
        self.visible.get(module)
    }
}

/// Collects and merges term types for every module, then indexes every
/// variable reference in the global table.
pub fn build(modules: &[Module], dag: &Dag) -> Result<Terms, Vec<Error>> {
    let mut errors = Vec::new();
    let by_name: FxHashMap<&MVar, &Module> = modules.iter().map(|m| (&m.name, m)).collect();

    let mut visible: FxHashMap<MVar, FxHashMap<EVar, TermTypes>> = FxHashMap::default();
    for name in dag.order() {
        let Some(module) = by_name.get(name) else {
            continue;
        };
        let mut terms = own_terms(module, &mut errors);
        for edge in dag.edges(name) {
            let Some(imported) = visible.get(&edge.module) else {
                continue;
            };
            for (remote, local) in &edge.aliases {
                let Some(tt) = imported.get(remote) else {
                    continue;
                };
                match terms.get_mut(local) {
                    None => {
                        terms.insert(local.clone(), tt.clone());
                    }
                    Some(existing) => merge(local, existing, tt, &mut errors),
                }
            }
        }
        visible.insert(name.clone(), terms);
    }

    let mut table = Table::new();
    for module in modules {
        let terms = &visible[&module.name];
        let mut indexer = Indexer {
            visible: terms,
            locals: Vec::new(),
            table: &mut table,
        };
        indexer.visit_module(module);
    }

    if errors.is_empty() {
        Ok(Terms { table, visible })
    } else {
        Err(errors)
    }
}

/// Partitions a module's body items by term into the signature, source, and
/// declaration buckets, merged into one `TermTypes` per term.
fn own_terms(module: &Module, errors: &mut Vec<Error>) -> FxHashMap<EVar, TermTypes> {
    let mut terms: FxHashMap<EVar, TermTypes> = FxHashMap::default();

    for item in &module.body {
        if let ExprKind::Source(source) = &item.kind {
            for (remote, alias) in &source.names {
                let term = alias
                    .clone()
                    .unwrap_or_else(|| EVar::from(remote.as_ref()));
                terms.entry(term).or_default().concrete.push(Realization {
                    lang: source.lang,
                    source_name: remote.clone(),
                    source_path: source.path.clone(),
                    concrete_types: Vec::new(),
                });
            }
        }
    }

    for item in &module.body {
        match &item.kind {
            ExprKind::Sig(sig) => {
                let entry = terms.entry(sig.name.clone()).or_default();
                match sig.lang {
                    None => {
                        if entry.general.is_some() {
                            errors.push(Error::MultipleGeneralTypes(
                                sig.name.to_string(),
                                module.name.to_string(),
                            ));
                        } else {
                            entry.general = Some(sig.ty.clone());
                        }
                    }
                    Some(lang) => {
                        match entry.concrete.iter_mut().find(|r| r.lang == lang) {
                            Some(realization) => realization.concrete_types.push(sig.ty.clone()),
                            None => errors.push(Error::ConcreteWithoutSource(
                                sig.name.to_string(),
                                lang,
                                module.name.to_string(),
                            )),
                        }
                    }
                }
            }
            ExprKind::Decl(decl) => {
                terms
                    .entry(decl.name.clone())
                    .or_default()
                    .declarations
                    .push(item.id);
            }
            _ => {}
        }
    }

    terms
}

/// Merges an imported `TermTypes` into the local bundle for the same term.
fn merge(term: &EVar, existing: &mut TermTypes, imported: &TermTypes, errors: &mut Vec<Error>) {
    match (&existing.general, &imported.general) {
        (Some(a), Some(b)) => match unify(a, b) {
            Some(ty) => existing.general = Some(ty),
            None => errors.push(Error::IncompatibleGeneralType(
                term.to_string(),
                a.to_string(),
                b.to_string(),
            )),
        },
        (None, Some(b)) => existing.general = Some(b.clone()),
        _ => {}
    }
    existing.concrete.extend(imported.concrete.iter().cloned());
    existing
        .declarations
        .extend(imported.declarations.iter().copied());
}

/// Structural unification of two general types. Existentials absorb
/// non-existentials; composite forms recurse componentwise.
fn unify(a: &Type, b: &Type) -> Option<Type> {
    match (a, b) {
        (Type::Exists(..), _) => Some(b.clone()),
        (_, Type::Exists(..)) => Some(a.clone()),
        (Type::Var(x), Type::Var(y)) if x.name == y.name => Some(a.clone()),
        (Type::Forall(va, ba), Type::Forall(vb, bb)) if va.name == vb.name => {
            Some(Type::Forall(va.clone(), Box::new(unify(ba, bb)?)))
        }
        (Type::Fun(a1, b1), Type::Fun(a2, b2)) => {
            Some(Type::fun(unify(a1, a2)?, unify(b1, b2)?))
        }
        (Type::App(n1, args1), Type::App(n2, args2))
            if n1.name == n2.name && args1.len() == args2.len() =>
        {
            let args = args1
                .iter()
                .zip(args2.iter())
                .map(|(x, y)| unify(x, y))
                .collect::<Option<Vec<_>>>()?;
            Some(Type::App(n1.clone(), args))
        }
        (Type::Record(r1), Type::Record(r2))
            if r1.name.name == r2.name.name
                && r1.tag == r2.tag
                && r1.fields.len() == r2.fields.len() =>
        {
            let mut merged = r1.clone();
            merged.fields = r1
                .fields
                .iter()
                .zip(r2.fields.iter())
                .map(|((k1, t1), (k2, t2))| {
                    if k1 == k2 {
                        Some((k1.clone(), unify(t1, t2)?))
                    } else {
                        None
                    }
                })
                .collect::<Option<Vec<_>>>()?;
            Some(Type::Record(merged))
        }
        _ => None,
    }
}

/// Walks expressions recording `NodeId -> TermTypes` for every variable
/// reference that is not locally shadowed.
struct Indexer<'a> {
    visible: &'a FxHashMap<EVar, TermTypes>,
    locals: Vec<FxHashSet<EVar>>,
    table: &'a mut Table,
}

impl Indexer<'_> {
    fn is_shadowed(&self, name: &EVar) -> bool {
        self.locals.iter().any(|scope| scope.contains(name))
    }
}

impl<'a, 'b> Visitor<'a> for Indexer<'b> {
    fn visit_expr(&mut self, expr: &'a ExprI) {
        match &expr.kind {
            ExprKind::Var(v) => {
                if !self.is_shadowed(v) {
                    if let Some(tt) = self.visible.get(v) {
                        self.table.insert(expr.id, tt.clone());
                    }
                }
            }
            ExprKind::Decl(decl) => {
                // The declaration LHS and where-clause names shadow any
                // outer term of the same name for the body's traversal.
                let mut scope: FxHashSet<EVar> = FxHashSet::default();
                scope.insert(decl.name.clone());
                for item in &decl.wheres {
                    if let ExprKind::Decl(inner) = &item.kind {
                        scope.insert(inner.name.clone());
                    }
                }
                self.locals.push(scope);
                visit::walk_expr(self, expr);
                self.locals.pop();
            }
            ExprKind::Lam(params, body) => {
                self.locals.push(params.iter().cloned().collect());
                self.visit_expr(body);
                self.locals.pop();
            }
            _ => visit::walk_expr(self, expr),
        }
    }
}
