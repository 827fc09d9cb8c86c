// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{resolve, Dag};
use expect_test::{expect, Expect};
use mlc_ast::ast::{EVar, ExprI, Import, Module};
use std::fmt::Write;

fn module(name: &str, exports: &[&str], imports: Vec<Import>, body: Vec<ExprI>) -> Module {
    Module {
        name: name.into(),
        exports: exports.iter().map(|e| EVar::from(*e)).collect(),
        imports,
        body,
    }
}

fn import(module: &str, include: &[(&str, Option<&str>)], exclude: &[&str]) -> Import {
    Import {
        module: module.into(),
        include: Some(
            include
                .iter()
                .map(|(remote, alias)| (EVar::from(*remote), alias.map(EVar::from)))
                .collect(),
        ),
        exclude: exclude.iter().map(|e| EVar::from(*e)).collect(),
        alias: None,
    }
}

fn dump(dag: &Dag) -> String {
    let mut out = String::new();
    writeln!(out, "root: {}", dag.root()).expect("string write should succeed");
    writeln!(out, "order: {:?}", dag.order().iter().map(ToString::to_string).collect::<Vec<_>>())
        .expect("string write should succeed");
    for module in dag.order() {
        for edge in dag.edges(module) {
            let aliases: Vec<String> = edge
                .aliases
                .iter()
                .map(|(remote, local)| format!("{remote}->{local}"))
                .collect();
            writeln!(out, "{module} <- {}: {}", edge.module, aliases.join(", "))
                .expect("string write should succeed");
        }
    }
    out
}

fn check(modules: &[Module], expect: &Expect) {
    let actual = match resolve(modules) {
        Ok(dag) => dump(&dag),
        Err(errors) => errors
            .iter()
            .map(|e| format!("{e:?}\n"))
            .collect::<String>(),
    };
    expect.assert_eq(&actual);
}

#[test]
fn single_module_is_its_own_root() {
    check(
        &[module("Main", &["x"], Vec::new(), vec![ExprI::decl("x", ExprI::num(1.0))])],
        &expect![[r#"
            root: Main
            order: ["Main"]
        "#]],
    );
}

#[test]
fn omitted_include_imports_the_full_export_surface() {
    check(
        &[
            module(
                "Main",
                &["h"],
                vec![Import::all("A")],
                vec![ExprI::decl("h", ExprI::var("foo"))],
            ),
            module(
                "A",
                &["foo", "baz"],
                Vec::new(),
                vec![
                    ExprI::decl("foo", ExprI::num(1.0)),
                    ExprI::decl("baz", ExprI::num(2.0)),
                ],
            ),
        ],
        &expect![[r#"
            root: Main
            order: ["A", "Main"]
            Main <- A: foo->foo, baz->baz
        "#]],
    );
}

#[test]
fn include_alias_renames_the_local_name() {
    check(
        &[
            module(
                "Main",
                &["h"],
                vec![import("A", &[("foo", Some("bar"))], &[])],
                vec![ExprI::decl("h", ExprI::var("bar"))],
            ),
            module("A", &["foo"], Vec::new(), vec![ExprI::decl("foo", ExprI::num(1.0))]),
        ],
        &expect![[r#"
            root: Main
            order: ["A", "Main"]
            Main <- A: foo->bar
        "#]],
    );
}

#[test]
fn excluded_names_are_dropped_from_full_imports() {
    check(
        &[
            module(
                "Main",
                &["h"],
                vec![Import {
                    module: "A".into(),
                    include: None,
                    exclude: vec!["baz".into()],
                    alias: None,
                }],
                Vec::new(),
            ),
            module("A", &["foo", "baz"], Vec::new(), Vec::new()),
        ],
        &expect![[r#"
            root: Main
            order: ["A", "Main"]
            Main <- A: foo->foo
        "#]],
    );
}

#[test]
fn included_and_excluded_name_is_a_contradiction() {
    check(
        &[
            module("Main", &[], vec![import("A", &[("foo", None)], &["foo"])], Vec::new()),
            module("A", &["foo"], Vec::new(), Vec::new()),
        ],
        &expect![[r#"
            ImportContradiction("foo", "A")
        "#]],
    );
}

#[test]
fn included_name_must_be_exported() {
    check(
        &[
            module("Main", &[], vec![import("A", &[("hidden", None)], &[])], Vec::new()),
            module("A", &["foo"], Vec::new(), Vec::new()),
        ],
        &expect![[r#"
            ImportMissing("hidden", "A")
        "#]],
    );
}

#[test]
fn unknown_import_target_is_reported() {
    check(
        &[module("Main", &[], vec![Import::all("Ghost")], Vec::new())],
        &expect![[r#"
            ModuleMissing("Main", "Ghost")
        "#]],
    );
}

#[test]
fn import_cycle_is_rejected() {
    check(
        &[
            module("A", &["a"], vec![Import::all("B")], Vec::new()),
            module("B", &["b"], vec![Import::all("A")], Vec::new()),
        ],
        &expect![[r#"
            CyclicDependency("A, B")
        "#]],
    );
}

#[test]
fn two_parentless_modules_are_rejected() {
    check(
        &[
            module("Main", &[], vec![Import::all("A")], Vec::new()),
            module("Other", &[], vec![Import::all("A")], Vec::new()),
            module("A", &["foo"], Vec::new(), Vec::new()),
        ],
        &expect![[r#"
            NonUniqueRoot("Main, Other")
        "#]],
    );
}

#[test]
fn term_resolution_follows_alias_chains() {
    let modules = [
        module(
            "Main",
            &["h"],
            vec![import("A", &[("bar", Some("qux"))], &[])],
            Vec::new(),
        ),
        module(
            "A",
            &["bar"],
            vec![import("B", &[("foo", Some("bar"))], &[])],
            Vec::new(),
        ),
        module("B", &["foo"], Vec::new(), vec![ExprI::decl("foo", ExprI::num(1.0))]),
    ];
    let dag = resolve(&modules).expect("modules should resolve");
    let resolved = dag.resolve_term(&"Main".into(), &"qux".into());
    assert_eq!(resolved, Some(("B".into(), "foo".into())));
}
