// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{DispatchCase, Grammar};
use mlc_ast::ast::Lang;
use mlc_manifold::manifold::ManifoldId;
use std::fmt::Write;

/// The R backend grammar.
pub struct RGrammar;

impl Grammar for RGrammar {
    fn lang(&self) -> Lang {
        Lang::R
    }

    fn shebang(&self) -> &'static str {
        "#!/usr/bin/env Rscript"
    }

    fn preamble(&self) -> &'static str {
        include_str!("r_prelude.R")
    }

    fn generic_packer(&self) -> &'static str {
        "mlc_pack"
    }

    fn generic_unpacker(&self) -> &'static str {
        "mlc_unpack"
    }

    fn comment(&self, text: &str) -> String {
        format!("# {text}")
    }

    fn indent(&self) -> &'static str {
        "  "
    }

    fn assign(&self, lhs: &str, rhs: &str) -> String {
        format!("{lhs} <- {rhs}")
    }

    fn call(&self, func: &str, args: &[String]) -> String {
        format!("{func}({})", args.join(", "))
    }

    fn try_call(&self, func: &str, args: &[String]) -> String {
        let mut wrapped = vec![func.to_string()];
        wrapped.extend(args.iter().cloned());
        self.call("mlc_try", &wrapped)
    }

    fn function(&self, name: &str, params: &[String], body: &[String]) -> String {
        let mut out = format!("{name} <- function({}) {{\n", params.join(", "));
        if body.is_empty() {
            writeln!(out, "{}NULL", self.indent()).expect("string write should succeed");
        }
        for line in body {
            writeln!(out, "{}{line}", self.indent()).expect("string write should succeed");
        }
        out.push_str("}\n");
        out
    }

    fn ret(&self, expr: &str) -> String {
        expr.to_string()
    }

    fn quote(&self, text: &str) -> String {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn bool_lit(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    fn unit_lit(&self) -> String {
        "NULL".to_string()
    }

    fn list(&self, items: &[String]) -> String {
        format!("list({})", items.join(", "))
    }

    fn tuple(&self, items: &[String]) -> String {
        self.list(items)
    }

    fn record(&self, fields: &[(String, String)]) -> String {
        let rendered: Vec<String> = fields
            .iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect();
        format!("list({})", rendered.join(", "))
    }

    fn import(&self, path: &str) -> String {
        format!("source({})", self.quote(path))
    }

    fn foreign_call(
        &self,
        executor: &str,
        pool: &str,
        id: ManifoldId,
        args: &[String],
    ) -> String {
        let cmd = format!(
            "c({}, {}, {})",
            self.quote(executor),
            self.quote(pool),
            self.quote(&usize::from(id).to_string())
        );
        let rendered_args = if args.is_empty() {
            "character(0)".to_string()
        } else {
            format!("c({})", args.join(", "))
        };
        format!("mlc_foreign({cmd}, {rendered_args})")
    }

    fn dispatch(&self, cases: &[DispatchCase]) -> String {
        let tab = self.indent();
        let mut out = String::new();
        let header = [
            "main_args <- commandArgs(trailingOnly = TRUE)",
            "if (length(main_args) < 1) {",
            "  mlc_err(\"pool expects an integer manifold id\")",
            "}",
            "mid <- suppressWarnings(as.integer(main_args[[1]]))",
            "if (is.na(mid)) {",
            "  mlc_err(\"pool expects an integer manifold id\")",
            "}",
            "pool_args <- as.list(main_args[-1])",
            "result <- switch(",
            "  as.character(mid),",
        ];
        for line in header {
            writeln!(out, "{line}").expect("string write should succeed");
        }
        for case in cases {
            writeln!(
                out,
                "{tab}`{id}` = {packer}(do.call(m{id}, pool_args)),",
                id = usize::from(case.id),
                packer = case.packer
            )
            .expect("string write should succeed");
        }
        writeln!(out, "{tab}mlc_err(paste(\"unknown manifold id:\", main_args[[1]]))")
            .expect("string write should succeed");
        writeln!(out, ")").expect("string write should succeed");
        writeln!(out, "cat(result, \"\\n\", sep = \"\")").expect("string write should succeed");
        out
    }
}
