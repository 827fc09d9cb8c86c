// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{ExprI, ExprKind, Module, NodeId};

/// Assigns a fresh ID to every expression node whose ID is still the default
/// placeholder. IDs already assigned by the parser are kept.
#[derive(Debug)]
pub struct Assigner {
    next_id: NodeId,
}

impl Assigner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: NodeId::FIRST,
        }
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id = self.next_id.successor();
        id
    }

    fn assign(&mut self, id: &mut NodeId) {
        if id.is_default() {
            *id = self.next_id();
        }
    }

    pub fn visit_module(&mut self, module: &mut Module) {
        for item in &mut module.body {
            self.visit_expr(item);
        }
    }

    pub fn visit_expr(&mut self, expr: &mut ExprI) {
        self.assign(&mut expr.id);
        match &mut expr.kind {
            ExprKind::Decl(decl) => {
                self.visit_expr(&mut decl.body);
                for item in &mut decl.wheres {
                    self.visit_expr(item);
                }
            }
            ExprKind::Access(inner, _) | ExprKind::Lam(_, inner) | ExprKind::Ann(inner, _) => {
                self.visit_expr(inner);
            }
            ExprKind::List(items) | ExprKind::Tuple(items) => {
                for item in items {
                    self.visit_expr(item);
                }
            }
            ExprKind::Record(fields) => {
                for (_, value) in fields {
                    self.visit_expr(value);
                }
            }
            ExprKind::App(callee, args) => {
                self.visit_expr(callee);
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            ExprKind::Source(_)
            | ExprKind::Sig(_)
            | ExprKind::TypeAlias(_)
            | ExprKind::Var(_)
            | ExprKind::Lit(_) => {}
        }
    }
}

impl Default for Assigner {
    fn default() -> Self {
        Self::new()
    }
}
