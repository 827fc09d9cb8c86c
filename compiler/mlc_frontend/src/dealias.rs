// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Desugaring of `type` aliases. Aliases are gathered per module, threaded
//! through import alias maps, reconciled when two paths disagree, and then
//! substituted into every type annotation. Substitution is idempotent and
//! self-recursive aliases are rejected.

#[cfg(test)]
mod tests;

use crate::resolve::Dag;
use log::debug;
use miette::Diagnostic;
use mlc_ast::ast::{Decl, ExprI, ExprKind, MVar, Module, TVar, Type};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error)]
pub enum Error {
    #[error("type alias `{0}` refers to itself")]
    #[diagnostic(code("Mlc.Dealias.SelfRecursiveTypeAlias"))]
    SelfRecursiveTypeAlias(String),

    #[error("type alias `{0}` expects {1} parameters but was applied to {2}")]
    #[diagnostic(code("Mlc.Dealias.BadTypeAliasParameters"))]
    BadTypeAliasParameters(String, usize, usize),

    #[error("conflicting definitions of type alias `{0}` are visible in module `{1}`")]
    #[diagnostic(code("Mlc.Dealias.ConflictingTypeAliases"))]
    ConflictingTypeAliases(String, String),
}

#[derive(Clone, Debug)]
struct AliasDef {
    name: TVar,
    params: Vec<TVar>,
    ty: Type,
}

type Aliases = FxHashMap<Rc<str>, AliasDef>;

/// Substitutes every type alias visible in each module into the module's
/// signatures and annotations, then resolves surviving existentials to
/// their first default instantiation.
pub fn desugar(modules: &mut [Module], dag: &Dag) -> Result<(), Vec<Error>> {
    let mut errors = Vec::new();

    let mut local: FxHashMap<MVar, Aliases> = FxHashMap::default();
    for module in modules.iter() {
        local.insert(module.name.clone(), gather(module, &mut errors));
    }

    // Thread aliases through the DAG in dependency order so a module's
    // imports are fully resolved before the module itself.
    let mut visible: FxHashMap<MVar, Aliases> = FxHashMap::default();
    for name in dag.order() {
        let mut aliases = local.remove(name).unwrap_or_default();
        for edge in dag.edges(name) {
            let Some(imported) = visible.get(&edge.module) else {
                continue;
            };
            for (remote, local_name) in &edge.aliases {
                let Some(def) = imported.get(remote.as_str()) else {
                    continue;
                };
                let renamed = AliasDef {
                    name: TVar::general(local_name.as_str()),
                    params: def.params.clone(),
                    ty: def.ty.clone(),
                };
                match aliases.get(local_name.as_str()) {
                    None => {
                        aliases.insert(local_name.as_str().into(), renamed);
                    }
                    Some(existing) => {
                        if !reconcilable(existing, &renamed) {
                            errors.push(Error::ConflictingTypeAliases(
                                existing.name.to_string(),
                                name.to_string(),
                            ));
                        }
                    }
                }
            }
        }
        visible.insert(name.clone(), aliases);
    }

    for module in modules.iter_mut() {
        let aliases = &visible[&module.name];
        debug!("desugaring {} aliases in module {}", aliases.len(), module.name);
        for item in &mut module.body {
            substitute_item(item, aliases, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn gather(module: &Module, errors: &mut Vec<Error>) -> Aliases {
    let mut aliases = Aliases::default();
    for item in &module.body {
        if let ExprKind::TypeAlias(alias) = &item.kind {
            if mentions(&alias.ty, &alias.name.name) {
                errors.push(Error::SelfRecursiveTypeAlias(alias.name.to_string()));
                continue;
            }
            aliases.insert(
                alias.name.name.clone(),
                AliasDef {
                    name: alias.name.clone(),
                    params: alias.params.clone(),
                    ty: alias.ty.clone(),
                },
            );
        }
    }
    aliases
}

fn substitute_item(item: &mut ExprI, aliases: &Aliases, errors: &mut Vec<Error>) {
    match &mut item.kind {
        ExprKind::Sig(sig) => {
            sig.ty = resolve_existentials(&substitute(&sig.ty, aliases, &mut Vec::new(), errors));
        }
        ExprKind::Decl(Decl { body, wheres, .. }) => {
            substitute_item(body, aliases, errors);
            for inner in wheres {
                substitute_item(inner, aliases, errors);
            }
        }
        ExprKind::Ann(inner, ty) => {
            *ty = resolve_existentials(&substitute(ty, aliases, &mut Vec::new(), errors));
            substitute_item(inner, aliases, errors);
        }
        ExprKind::Access(inner, _) | ExprKind::Lam(_, inner) => {
            substitute_item(inner, aliases, errors);
        }
        ExprKind::App(callee, args) => {
            substitute_item(callee, aliases, errors);
            for arg in args {
                substitute_item(arg, aliases, errors);
            }
        }
        ExprKind::List(items) | ExprKind::Tuple(items) => {
            for inner in items {
                substitute_item(inner, aliases, errors);
            }
        }
        ExprKind::Record(fields) => {
            for (_, inner) in fields {
                substitute_item(inner, aliases, errors);
            }
        }
        ExprKind::Source(_) | ExprKind::TypeAlias(_) | ExprKind::Var(_) | ExprKind::Lit(_) => {}
    }
}

fn substitute(
    ty: &Type,
    aliases: &Aliases,
    active: &mut Vec<Rc<str>>,
    errors: &mut Vec<Error>,
) -> Type {
    match ty {
        Type::Var(v) => match aliases.get(&v.name) {
            Some(def) => expand(def, &[], v, aliases, active, errors),
            None => ty.clone(),
        },
        Type::App(name, args) => {
            let args: Vec<Type> = args
                .iter()
                .map(|arg| substitute(arg, aliases, active, errors))
                .collect();
            match aliases.get(&name.name) {
                Some(def) => expand(def, &args, name, aliases, active, errors),
                None => Type::App(name.clone(), args),
            }
        }
        Type::Forall(v, body) => {
            // A quantified variable shadows any alias of the same name.
            if aliases.contains_key(&v.name) {
                let mut narrowed = aliases.clone();
                narrowed.remove(&v.name);
                Type::Forall(
                    v.clone(),
                    Box::new(substitute(body, &narrowed, active, errors)),
                )
            } else {
                Type::Forall(v.clone(), Box::new(substitute(body, aliases, active, errors)))
            }
        }
        Type::Exists(v, defaults) => Type::Exists(
            v.clone(),
            defaults
                .iter()
                .map(|d| substitute(d, aliases, active, errors))
                .collect(),
        ),
        Type::Fun(input, output) => Type::fun(
            substitute(input, aliases, active, errors),
            substitute(output, aliases, active, errors),
        ),
        Type::Record(record) => {
            let mut record = record.clone();
            record.params = record
                .params
                .iter()
                .map(|p| substitute(p, aliases, active, errors))
                .collect();
            record.fields = record
                .fields
                .iter()
                .map(|(key, field)| (key.clone(), substitute(field, aliases, active, errors)))
                .collect();
            Type::Record(record)
        }
    }
}

fn expand(
    def: &AliasDef,
    args: &[Type],
    site: &TVar,
    aliases: &Aliases,
    active: &mut Vec<Rc<str>>,
    errors: &mut Vec<Error>,
) -> Type {
    if active.contains(&def.name.name) {
        errors.push(Error::SelfRecursiveTypeAlias(def.name.to_string()));
        return Type::Var(site.clone());
    }
    if def.params.len() != args.len() {
        errors.push(Error::BadTypeAliasParameters(
            def.name.to_string(),
            def.params.len(),
            args.len(),
        ));
        return Type::Var(site.clone());
    }
    let map: FxHashMap<Rc<str>, &Type> = def
        .params
        .iter()
        .map(|p| p.name.clone())
        .zip(args.iter())
        .collect();
    let body = subst_params(&def.ty, &map);
    active.push(def.name.name.clone());
    let resolved = substitute(&body, aliases, active, errors);
    active.pop();
    resolved
}

/// Positional parameter substitution within an alias body.
fn subst_params(ty: &Type, map: &FxHashMap<Rc<str>, &Type>) -> Type {
    match ty {
        Type::Var(v) => map.get(&v.name).map_or_else(|| ty.clone(), |t| (*t).clone()),
        Type::Forall(v, body) => {
            if map.contains_key(&v.name) {
                let mut narrowed = map.clone();
                narrowed.remove(&v.name);
                Type::Forall(v.clone(), Box::new(subst_params(body, &narrowed)))
            } else {
                Type::Forall(v.clone(), Box::new(subst_params(body, map)))
            }
        }
        Type::Exists(v, defaults) => Type::Exists(
            v.clone(),
            defaults.iter().map(|d| subst_params(d, map)).collect(),
        ),
        Type::Fun(input, output) => Type::fun(subst_params(input, map), subst_params(output, map)),
        Type::App(name, args) => Type::App(
            name.clone(),
            args.iter().map(|a| subst_params(a, map)).collect(),
        ),
        Type::Record(record) => {
            let mut record = record.clone();
            record.params = record.params.iter().map(|p| subst_params(p, map)).collect();
            record.fields = record
                .fields
                .iter()
                .map(|(key, field)| (key.clone(), subst_params(field, map)))
                .collect();
            Type::Record(record)
        }
    }
}

/// Resolves every existential that carries default instantiations to its
/// first default. Existentials without defaults pass through unchanged.
#[must_use]
pub fn resolve_existentials(ty: &Type) -> Type {
    match ty {
        Type::Exists(v, defaults) => match defaults.first() {
            Some(first) => resolve_existentials(first),
            None => Type::Exists(v.clone(), Vec::new()),
        },
        Type::Var(_) => ty.clone(),
        Type::Forall(v, body) => Type::Forall(v.clone(), Box::new(resolve_existentials(body))),
        Type::Fun(input, output) => Type::fun(
            resolve_existentials(input),
            resolve_existentials(output),
        ),
        Type::App(name, args) => Type::App(
            name.clone(),
            args.iter().map(resolve_existentials).collect(),
        ),
        Type::Record(record) => {
            let mut record = record.clone();
            record.params = record.params.iter().map(resolve_existentials).collect();
            record.fields = record
                .fields
                .iter()
                .map(|(key, field)| (key.clone(), resolve_existentials(field)))
                .collect();
            Type::Record(record)
        }
    }
}

fn mentions(ty: &Type, name: &Rc<str>) -> bool {
    match ty {
        Type::Var(v) => v.name == *name,
        Type::Forall(v, body) => v.name != *name && mentions(body, name),
        Type::Exists(_, defaults) => defaults.iter().any(|d| mentions(d, name)),
        Type::Fun(input, output) => mentions(input, name) || mentions(output, name),
        Type::App(v, args) => v.name == *name || args.iter().any(|a| mentions(a, name)),
        Type::Record(record) => {
            record.params.iter().any(|p| mentions(p, name))
                || record.fields.iter().any(|(_, field)| mentions(field, name))
        }
    }
}

/// Two alias definitions reconcile when they have equal arity and each body
/// is a structural subtype of the other under a shared quantifier prefix.
fn reconcilable(a: &AliasDef, b: &AliasDef) -> bool {
    if a.params.len() != b.params.len() {
        return false;
    }
    let mut env: Vec<(Rc<str>, Rc<str>)> = a
        .params
        .iter()
        .zip(b.params.iter())
        .map(|(pa, pb)| (pa.name.clone(), pb.name.clone()))
        .collect();
    subtype(&a.ty, &b.ty, &mut env) && {
        let mut flipped: Vec<(Rc<str>, Rc<str>)> = env
            .iter()
            .map(|(x, y)| (y.clone(), x.clone()))
            .collect();
        subtype(&b.ty, &a.ty, &mut flipped)
    }
}

fn subtype(a: &Type, b: &Type, env: &mut Vec<(Rc<str>, Rc<str>)>) -> bool {
    match (a, b) {
        (Type::Forall(va, ba), Type::Forall(vb, bb)) => {
            env.push((va.name.clone(), vb.name.clone()));
            let result = subtype(ba, bb, env);
            env.pop();
            result
        }
        (Type::Exists(..), _) | (_, Type::Exists(..)) => true,
        (Type::Var(x), Type::Var(y)) => {
            x.name == y.name
                || env
                    .iter()
                    .rev()
                    .any(|(ea, eb)| *ea == x.name && *eb == y.name)
        }
        // Function arguments are contravariant.
        (Type::Fun(a1, b1), Type::Fun(a2, b2)) => subtype(a2, a1, env) && subtype(b1, b2, env),
        (Type::App(n1, args1), Type::App(n2, args2)) => {
            n1.name == n2.name
                && args1.len() == args2.len()
                && args1
                    .iter()
                    .zip(args2.iter())
                    .all(|(x, y)| subtype(x, y, env))
        }
        (Type::Record(r1), Type::Record(r2)) => {
            r1.name.name == r2.name.name
                && r1.tag == r2.tag
                && r1.fields.len() == r2.fields.len()
                && r1
                    .fields
                    .iter()
                    .zip(r2.fields.iter())
                    .all(|((k1, t1), (k2, t2))| k1 == k2 && subtype(t1, t2, env))
        }
        _ => false,
    }
}
