// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{classify, emit_pool, ManifoldClass};
use crate::grammar::{grammar_for, Grammar};
use expect_test::{expect, Expect};
use mlc_ast::assigner::Assigner;
use mlc_ast::ast::{EVar, ExprI, ExprKind, Lang, Module, SourceDecl, Type};
use mlc_frontend::{resolve::resolve, signatures};
use mlc_manifold::manifold::Manifold;
use mlc_manifold::{build, serial};
use rustc_hash::FxHashMap;

fn module(name: &str, exports: &[&str], body: Vec<ExprI>) -> Module {
    Module {
        name: name.into(),
        exports: exports.iter().map(|e| EVar::from(*e)).collect(),
        imports: Vec::new(),
        body,
    }
}

fn source(lang: Lang, path: &str, names: &[(&str, Option<&str>)]) -> ExprI {
    ExprI::new(ExprKind::Source(SourceDecl {
        lang,
        path: Some(path.into()),
        names: names
            .iter()
            .map(|(remote, alias)| ((*remote).into(), alias.map(EVar::from)))
            .collect(),
    }))
}

fn int_to_int() -> Type {
    Type::fun(Type::var("Int"), Type::var("Int"))
}

fn pipeline(mut modules: Vec<Module>) -> (Vec<Module>, Vec<Manifold>) {
    let mut assigner = Assigner::new();
    for module in &mut modules {
        assigner.visit_module(module);
    }
    let dag = resolve(&modules).expect("modules should resolve");
    let terms = signatures::build(&modules, &dag).expect("signatures should merge");
    let manifolds = build::build(&modules, &dag, &terms).expect("manifolds should build");
    (modules, manifolds)
}

fn executors() -> FxHashMap<Lang, String> {
    Lang::ALL
        .iter()
        .map(|lang| (*lang, lang.default_executor().to_string()))
        .collect()
}

fn check_pool(modules: Vec<Module>, lang: Lang, expect: &Expect) {
    let (modules, manifolds) = pipeline(modules);
    let grammar = grammar_for(lang);
    let map = serial::plan(
        &modules,
        lang,
        grammar.generic_packer(),
        grammar.generic_unpacker(),
    );
    let text = emit_pool(grammar.as_ref(), &manifolds, &map, &executors())
        .expect("pool should emit");
    let text = text.replace(grammar.preamble(), "<runtime prelude>\n");
    expect.assert_eq(&text);
}

fn cross_language_modules() -> Vec<Module> {
    vec![module(
        "Main",
        &["h"],
        vec![
            source(Lang::Python, "g.py", &[("g", None)]),
            source(Lang::R, "f.R", &[("f", None)]),
            ExprI::sig("f", int_to_int()),
            ExprI::sig("g", int_to_int()),
            ExprI::decl(
                "h",
                ExprI::lam(
                    &["x"],
                    ExprI::app(
                        ExprI::var("g"),
                        vec![ExprI::app(ExprI::var("f"), vec![ExprI::var("x")])],
                    ),
                ),
            ),
        ],
    )]
}

#[test]
fn cis_and_trans_classification_follows_the_assigned_language() {
    let (_, manifolds) = pipeline(cross_language_modules());

    assert_eq!(classify(&manifolds[0], Lang::Python), ManifoldClass::Cis);
    assert_eq!(classify(&manifolds[0], Lang::R), ManifoldClass::Trans);
    assert_eq!(classify(&manifolds[1], Lang::R), ManifoldClass::Cis);
    assert_eq!(classify(&manifolds[1], Lang::Python), ManifoldClass::Trans);
}

#[test]
fn python_pool_wraps_the_foreign_branch_in_a_foreign_call() {
    check_pool(
        cross_language_modules(),
        Lang::Python,
        &expect![[r#"
            #!/usr/bin/env python3

            # Generated by the Morloc compiler; do not edit.

            <runtime prelude>

            exec(compile(open("g.py").read(), "g.py", "exec"))

            def m0(x):
                a0 = mlc_unpack(mlc_foreign(["Rscript", "pool.R", "1"], [x]))
                return mlc_try(g, a0)

            if __name__ == "__main__":
                if len(sys.argv) < 2:
                    mlc_err("pool expects an integer manifold id")
                try:
                    mid = int(sys.argv[1])
                except ValueError:
                    mlc_err("pool expects an integer manifold id")
                args = sys.argv[2:]
                if mid == 0:
                    result = mlc_pack(m0(*args))
                else:
                    mlc_err("unknown manifold id: %s" % sys.argv[1])
                sys.stdout.write(result + "\n")
        "#]],
    );
}

#[test]
fn r_pool_unpacks_its_serialized_input_and_calls_the_source() {
    check_pool(
        cross_language_modules(),
        Lang::R,
        &expect![[r#"
            #!/usr/bin/env Rscript

            # Generated by the Morloc compiler; do not edit.

            <runtime prelude>

            source("f.R")

            m1 <- function(x) {
              a0 <- mlc_unpack(x)
              mlc_try(f, a0)
            }

            main_args <- commandArgs(trailingOnly = TRUE)
            if (length(main_args) < 1) {
              mlc_err("pool expects an integer manifold id")
            }
            mid <- suppressWarnings(as.integer(main_args[[1]]))
            if (is.na(mid)) {
              mlc_err("pool expects an integer manifold id")
            }
            pool_args <- as.list(main_args[-1])
            result <- switch(
              as.character(mid),
              `1` = mlc_pack(do.call(m1, pool_args)),
              mlc_err(paste("unknown manifold id:", main_args[[1]]))
            )
            cat(result, "\n", sep = "")
        "#]],
    );
}

#[test]
fn literal_export_emits_a_value_wrapper() {
    check_pool(
        vec![module(
            "Main",
            &["x"],
            vec![ExprI::decl("x", ExprI::num(1.0))],
        )],
        Lang::Python,
        &expect![[r#"
            #!/usr/bin/env python3

            # Generated by the Morloc compiler; do not edit.

            <runtime prelude>

            def m0():
                a0 = 1
                return a0

            if __name__ == "__main__":
                if len(sys.argv) < 2:
                    mlc_err("pool expects an integer manifold id")
                try:
                    mid = int(sys.argv[1])
                except ValueError:
                    mlc_err("pool expects an integer manifold id")
                args = sys.argv[2:]
                if mid == 0:
                    result = mlc_pack(m0(*args))
                else:
                    mlc_err("unknown manifold id: %s" % sys.argv[1])
                sys.stdout.write(result + "\n")
        "#]],
    );
}

#[test]
fn sourced_re_export_unpacks_positional_placeholders() {
    check_pool(
        vec![module(
            "Main",
            &["f"],
            vec![
                source(Lang::Python, "a.py", &[("f", None)]),
                ExprI::sig("f", int_to_int()),
            ],
        )],
        Lang::Python,
        &expect![[r#"
            #!/usr/bin/env python3

            # Generated by the Morloc compiler; do not edit.

            <runtime prelude>

            exec(compile(open("a.py").read(), "a.py", "exec"))

            def m0(x0):
                a0 = mlc_unpack(x0)
                return mlc_try(f, a0)

            if __name__ == "__main__":
                if len(sys.argv) < 2:
                    mlc_err("pool expects an integer manifold id")
                try:
                    mid = int(sys.argv[1])
                except ValueError:
                    mlc_err("pool expects an integer manifold id")
                args = sys.argv[2:]
                if mid == 0:
                    result = mlc_pack(m0(*args))
                else:
                    mlc_err("unknown manifold id: %s" % sys.argv[1])
                sys.stdout.write(result + "\n")
        "#]],
    );
}
