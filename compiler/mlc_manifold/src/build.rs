// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Construction of the manifold list. Each exported root declaration is
//! walked in pre-order; every application receives a fresh manifold, and
//! declared (unsourced) compositions are expanded inline with their lambda
//! parameters bound to the provided arguments.


use crate::manifold::{Arg, DataVal, Manifold, ManifoldId};
use log::debug;
use miette::Diagnostic;
use mlc_ast::ast::{EVar, ExprI, ExprKind, Lang, MVar, Module, Type};
use mlc_frontend::resolve::Dag;
use mlc_frontend::signatures::{TermTypes, Terms};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Clone, Debug, Diagnostic, Error)]
pub enum Error {
    #[error("exported term `{0}` is not a lambda or application chain in module `{1}`")]
    #[diagnostic(code("Mlc.Build.NonLambdaRoot"))]
    NonLambdaRoot(String, String),

    #[error("lambda expressions are not supported as application arguments (in `{0}`)")]
    #[diagnostic(
        code("Mlc.Build.LambdaArgument"),
        help("bind the lambda to a name with a declaration and apply the name instead")
    )]
    LambdaArgument(String),

    #[error("unbound variable `{0}` in module `{1}`")]
    #[diagnostic(code("Mlc.Build.UnboundVariable"))]
    UnboundVariable(String, String),

    #[error("recursive composition `{0}` is not supported")]
    #[diagnostic(code("Mlc.Build.RecursiveComposition"))]
    RecursiveComposition(String),

    #[error("composition `{0}` expects {1} arguments but was applied to {2}")]
    #[diagnostic(code("Mlc.Build.CompositionArity"))]
    CompositionArity(String, usize, usize),

    #[error("unsupported argument expression in composition `{0}`")]
    #[diagnostic(code("Mlc.Build.UnsupportedArgument"))]
    UnsupportedArgument(String),

    #[error("internal invariant violated: {0}")]
    #[diagnostic(
        code("Mlc.Internal"),
        help("this is a compiler bug; please report it")
    )]
    Internal(String),
}

/// Builds the manifold list for every exported root declaration.
pub fn build(modules: &[Module], dag: &Dag, terms: &Terms) -> Result<Vec<Manifold>, Vec<Error>> {
    let root_name = dag.root().clone();
    let Some(root) = modules.iter().find(|m| m.name == root_name) else {
        return Err(vec![Error::Internal(format!(
            "root module `{root_name}` is missing from the module set"
        ))]);
    };

    let mut decls: FxHashMap<usize, &ExprI> = FxHashMap::default();
    for module in modules {
        for item in &module.body {
            if matches!(item.kind, ExprKind::Decl(_)) {
                decls.insert(usize::from(item.id), item);
            }
        }
    }

    let mut builder = Builder {
        terms,
        decls,
        exports: root.exports.clone(),
        root: root_name,
        next_id: ManifoldId::FIRST,
        manifolds: Vec::new(),
        active: Vec::new(),
        errors: Vec::new(),
    };

    for export in &root.exports {
        builder.process_export(export);
    }

    if builder.errors.is_empty() {
        let mut manifolds = builder.manifolds;
        assign_languages(&mut manifolds, Lang::Python);
        debug!("built {} manifolds", manifolds.len());
        Ok(manifolds)
    } else {
        Err(builder.errors)
    }
}

struct Builder<'a> {
    terms: &'a Terms,
    decls: FxHashMap<usize, &'a ExprI>,
    exports: Vec<EVar>,
    root: MVar,
    next_id: ManifoldId,
    manifolds: Vec<Manifold>,
    active: Vec<EVar>,
    errors: Vec<Error>,
}

type Env = FxHashMap<EVar, Arg>;

impl<'a> Builder<'a> {
    fn next(&mut self) -> ManifoldId {
        let id = self.next_id;
        self.next_id = self.next_id.successor();
        id
    }

    fn set_called(&mut self, id: ManifoldId) {
        self.manifolds[usize::from(id)].called = true;
    }

    fn process_export(&mut self, export: &EVar) {
        let tt = self
            .terms
            .in_module(&self.root)
            .and_then(|visible| visible.get(export))
            .cloned();
        let Some(tt) = tt else {
            self.errors
                .push(Error::UnboundVariable(export.to_string(), self.root.to_string()));
            return;
        };

        if tt.is_defined() {
            let Some(decl) = self.declaration(&tt) else {
                return;
            };
            let (bound, body) = flatten_lam(decl);
            self.active.push(export.clone());
            self.root_body(export, &bound, body, &tt);
            self.active.pop();
        } else if tt.is_sourced() {
            // Pure re-export of a foreign function.
            self.source_manifold(export, export, &tt);
        } else {
            self.errors
                .push(Error::UnboundVariable(export.to_string(), self.root.to_string()));
        }
    }

    /// The declaration body of a defined term.
    fn declaration(&mut self, tt: &TermTypes) -> Option<&'a ExprI> {
        let decl_id = *tt.declarations.first()?;
        let Some(item) = self.decls.get(&usize::from(decl_id)).copied() else {
            self.errors.push(Error::Internal(format!(
                "declaration node {decl_id} has no expression"
            )));
            return None;
        };
        let ExprKind::Decl(decl) = &item.kind else {
            self.errors.push(Error::Internal(format!(
                "node {decl_id} is not a declaration"
            )));
            return None;
        };
        Some(&decl.body)
    }

    fn root_body(&mut self, comp: &EVar, bound: &[EVar], body: &'a ExprI, tt: &TermTypes) {
        let body = strip_ann(body);
        let env = Env::default();
        let arg = match &body.kind {
            ExprKind::App(..) => {
                let (head, args) = flatten_app(body);
                self.build_call(head, &args, &env, bound, comp, true)
            }
            ExprKind::Var(v) if bound.contains(v) => Some(Arg::Name(v.clone())),
            ExprKind::Var(_) => self.build_call(body, &[], &env, bound, comp, true),
            ExprKind::Lit(lit) => Some(Arg::Data(DataVal::Lit(lit.clone()))),
            ExprKind::List(_) | ExprKind::Tuple(_) | ExprKind::Record(_) => {
                self.data_val(body, comp).map(Arg::Data)
            }
            _ => {
                self.errors
                    .push(Error::NonLambdaRoot(comp.to_string(), self.root.to_string()));
                None
            }
        };

        match arg {
            // The call already produced the composition's root manifold.
            Some(Arg::Call(_)) | None => {}
            Some(other) => {
                let id = self.next();
                self.manifolds.push(Manifold {
                    id,
                    call_id: Some(body.id),
                    morloc_name: comp.clone(),
                    composition: comp.clone(),
                    abstract_type: tt.general.clone(),
                    realizations: Vec::new(),
                    lang: None,
                    exported: true,
                    called: true,
                    defined: true,
                    bound_vars: bound.to_vec(),
                    args: vec![other],
                });
            }
        }
    }

    /// Emits a manifold that forwards positional inputs straight to a
    /// sourced function, the shape used when a foreign function is exported
    /// without a wrapping composition.
    fn source_manifold(&mut self, morloc_name: &EVar, comp: &EVar, tt: &TermTypes) -> ManifoldId {
        let arity = term_arity(tt);
        let id = self.next();
        self.manifolds.push(Manifold {
            id,
            call_id: None,
            morloc_name: morloc_name.clone(),
            composition: comp.clone(),
            abstract_type: tt.general.clone(),
            realizations: tt.concrete.clone(),
            lang: None,
            exported: true,
            called: false,
            defined: tt.is_defined(),
            bound_vars: Vec::new(),
            args: (0..arity).map(Arg::Positional).collect(),
        });
        id
    }

    fn build_call(
        &mut self,
        head: &ExprI,
        arg_exprs: &[&'a ExprI],
        env: &Env,
        bound: &[EVar],
        comp: &EVar,
        is_root: bool,
    ) -> Option<Arg> {
        let head = strip_ann(head);
        let ExprKind::Var(name) = &head.kind else {
            if matches!(head.kind, ExprKind::Lam(..)) {
                self.errors.push(Error::LambdaArgument(comp.to_string()));
            } else {
                self.errors.push(Error::UnsupportedArgument(comp.to_string()));
            }
            return None;
        };

        if env.contains_key(name) || bound.contains(name) {
            // Composition parameters cannot be applied; they have no entry
            // in the term-type table.
            self.errors
                .push(Error::UnboundVariable(name.to_string(), self.root.to_string()));
            return None;
        }
        if self.active.contains(name) {
            self.errors.push(Error::RecursiveComposition(name.to_string()));
            return None;
        }
        let Some(tt) = self.terms.table.get(head.id).cloned() else {
            self.errors
                .push(Error::UnboundVariable(name.to_string(), self.root.to_string()));
            return None;
        };

        if tt.is_defined() && !tt.is_sourced() {
            return self.expand_composition(name, &tt, arg_exprs, env, bound, comp, is_root);
        }
        if !tt.is_sourced() {
            self.errors
                .push(Error::UnboundVariable(name.to_string(), self.root.to_string()));
            return None;
        }

        // A bare reference to a sourced function at the root forwards its
        // inputs positionally instead of calling with zero arguments.
        if is_root && arg_exprs.is_empty() && !tt.is_defined() && term_arity(&tt) > 0 {
            let id = self.source_manifold(name, comp, &tt);
            return Some(Arg::Call(id));
        }

        let id = self.next();
        self.manifolds.push(Manifold {
            id,
            call_id: Some(head.id),
            morloc_name: name.clone(),
            composition: comp.clone(),
            abstract_type: tt.general.clone(),
            realizations: tt.concrete.clone(),
            lang: None,
            exported: is_root || self.exports.contains(name),
            called: is_root,
            defined: tt.is_defined(),
            bound_vars: bound.to_vec(),
            args: Vec::new(),
        });

        let mut args = Vec::with_capacity(arg_exprs.len());
        for expr in arg_exprs {
            if let Some(arg) = self.classify_arg(expr, env, bound, comp) {
                args.push(arg);
            }
        }
        for arg in &args {
            if let Arg::Call(child) = arg {
                self.set_called(*child);
            }
        }
        self.manifolds[usize::from(id)].args = args;
        Some(Arg::Call(id))
    }

    /// Expands a declared composition in place, binding its parameters to
    /// the provided arguments.
    #[allow(clippy::too_many_arguments)]
    fn expand_composition(
        &mut self,
        name: &EVar,
        tt: &TermTypes,
        arg_exprs: &[&'a ExprI],
        env: &Env,
        bound: &[EVar],
        comp: &EVar,
        is_root: bool,
    ) -> Option<Arg> {
        let mut args = Vec::with_capacity(arg_exprs.len());
        for expr in arg_exprs {
            args.push(self.classify_arg(expr, env, bound, comp)?);
        }

        let decl = self.declaration(tt)?;
        let (params, body) = flatten_lam(decl);
        if params.len() != args.len() {
            self.errors.push(Error::CompositionArity(
                name.to_string(),
                params.len(),
                args.len(),
            ));
            return None;
        }
        let inner_env: Env = params.into_iter().zip(args).collect();

        self.active.push(name.clone());
        let body = strip_ann(body);
        let result = match &body.kind {
            ExprKind::App(..) => {
                let (head, inner_args) = flatten_app(body);
                self.build_call(head, &inner_args, &inner_env, bound, comp, is_root)
            }
            _ => self.classify_arg(body, &inner_env, bound, comp),
        };
        self.active.pop();
        result
    }

    fn classify_arg(
        &mut self,
        expr: &'a ExprI,
        env: &Env,
        bound: &[EVar],
        comp: &EVar,
    ) -> Option<Arg> {
        let expr = strip_ann(expr);
        match &expr.kind {
            ExprKind::Var(v) => {
                if let Some(arg) = env.get(v) {
                    Some(arg.clone())
                } else if bound.contains(v) {
                    Some(Arg::Name(v.clone()))
                } else {
                    // Free variables pass through as function references.
                    let realizations = self
                        .terms
                        .table
                        .get(expr.id)
                        .map(|tt| tt.concrete.clone())
                        .unwrap_or_default();
                    Some(Arg::Nest(v.clone(), realizations))
                }
            }
            ExprKind::Lit(lit) => Some(Arg::Data(DataVal::Lit(lit.clone()))),
            ExprKind::List(_) | ExprKind::Tuple(_) | ExprKind::Record(_) => {
                self.data_val(expr, comp).map(Arg::Data)
            }
            ExprKind::App(..) => {
                let (head, args) = flatten_app(expr);
                let result = self.build_call(head, &args, env, bound, comp, false);
                if let Some(Arg::Call(id)) = &result {
                    self.set_called(*id);
                }
                result
            }
            ExprKind::Lam(..) => {
                self.errors.push(Error::LambdaArgument(comp.to_string()));
                None
            }
            _ => {
                self.errors.push(Error::UnsupportedArgument(comp.to_string()));
                None
            }
        }
    }

    fn data_val(&mut self, expr: &ExprI, comp: &EVar) -> Option<DataVal> {
        let expr = strip_ann(expr);
        match &expr.kind {
            ExprKind::Lit(lit) => Some(DataVal::Lit(lit.clone())),
            ExprKind::List(items) => items
                .iter()
                .map(|item| self.data_val(item, comp))
                .collect::<Option<Vec<_>>>()
                .map(DataVal::List),
            ExprKind::Tuple(items) => items
                .iter()
                .map(|item| self.data_val(item, comp))
                .collect::<Option<Vec<_>>>()
                .map(DataVal::Tuple),
            ExprKind::Record(fields) => fields
                .iter()
                .map(|(key, value)| Some((key.clone(), self.data_val(value, comp)?)))
                .collect::<Option<Vec<_>>>()
                .map(DataVal::Record),
            _ => {
                self.errors.push(Error::UnsupportedArgument(comp.to_string()));
                None
            }
        }
    }
}

/// Assigns each manifold's emission language: the caller's language when a
/// matching realization exists, otherwise the first realization's language,
/// otherwise the caller's (or the default at the root). Inline expansion
/// can number a callee after its arguments, so languages flow along `Call`
/// edges rather than in index order.
fn assign_languages(manifolds: &mut [Manifold], default: Lang) {
    let mut is_child = vec![false; manifolds.len()];
    for manifold in manifolds.iter() {
        for arg in &manifold.args {
            if let Arg::Call(child) = arg {
                is_child[usize::from(*child)] = true;
            }
        }
    }

    let mut stack: Vec<(ManifoldId, Option<Lang>)> = manifolds
        .iter()
        .rev()
        .filter(|m| !is_child[usize::from(m.id)])
        .map(|m| (m.id, None))
        .collect();

    while let Some((id, parent_lang)) = stack.pop() {
        let index = usize::from(id);
        let lang = parent_lang
            .filter(|l| manifolds[index].realization_in(*l).is_some())
            .or_else(|| manifolds[index].realizations.first().map(|r| r.lang))
            .or(parent_lang)
            .unwrap_or(default);
        manifolds[index].lang = Some(lang);

        let children: Vec<ManifoldId> = manifolds[index]
            .args
            .iter()
            .filter_map(|arg| match arg {
                Arg::Call(child) => Some(*child),
                _ => None,
            })
            .collect();
        for child in children {
            stack.push((child, Some(lang)));
        }
    }
}

fn term_arity(tt: &TermTypes) -> usize {
    tt.general
        .as_ref()
        .map(Type::arity)
        .or_else(|| {
            tt.concrete
                .iter()
                .find_map(|r| r.concrete_type().map(Type::arity))
        })
        .unwrap_or(0)
}

fn strip_ann(expr: &ExprI) -> &ExprI {
    match &expr.kind {
        ExprKind::Ann(inner, _) => strip_ann(inner),
        _ => expr,
    }
}

fn flatten_app(expr: &ExprI) -> (&ExprI, Vec<&ExprI>) {
    match &expr.kind {
        ExprKind::App(callee, args) => {
            let (head, mut flattened) = flatten_app(callee);
            flattened.extend(args.iter());
            (head, flattened)
        }
        _ => (expr, Vec::new()),
    }
}

fn flatten_lam(expr: &ExprI) -> (Vec<EVar>, &ExprI) {
    match &expr.kind {
        ExprKind::Lam(params, body) => {
            let (inner, rest) = flatten_lam(body);
            let mut params = params.clone();
            params.extend(inner);
            (params, rest)
        }
        _ => (Vec::new(), expr),
    }
}
