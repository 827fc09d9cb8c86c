// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{ExprI, ExprKind, Module};

pub trait Visitor<'a>: Sized {
    fn visit_module(&mut self, module: &'a Module) {
        walk_module(self, module);
    }

    fn visit_expr(&mut self, expr: &'a ExprI) {
        walk_expr(self, expr);
    }
}

pub fn walk_module<'a>(vis: &mut impl Visitor<'a>, module: &'a Module) {
    module.body.iter().for_each(|item| vis.visit_expr(item));
}

pub fn walk_expr<'a>(vis: &mut impl Visitor<'a>, expr: &'a ExprI) {
    match &expr.kind {
        ExprKind::Decl(decl) => {
            vis.visit_expr(&decl.body);
            decl.wheres.iter().for_each(|item| vis.visit_expr(item));
        }
        ExprKind::Access(inner, _) | ExprKind::Lam(_, inner) | ExprKind::Ann(inner, _) => {
            vis.visit_expr(inner);
        }
        ExprKind::List(items) | ExprKind::Tuple(items) => {
            items.iter().for_each(|item| vis.visit_expr(item));
        }
        ExprKind::Record(fields) => {
            fields.iter().for_each(|(_, value)| vis.visit_expr(value));
        }
        ExprKind::App(callee, args) => {
            vis.visit_expr(callee);
            args.iter().for_each(|arg| vis.visit_expr(arg));
        }
        ExprKind::Source(_)
        | ExprKind::Sig(_)
        | ExprKind::TypeAlias(_)
        | ExprKind::Var(_)
        | ExprKind::Lit(_) => {}
    }
}
