// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::desugar;
use crate::resolve::resolve;
use expect_test::{expect, Expect};
use mlc_ast::ast::{EVar, ExprI, ExprKind, Import, Module, TVar, Type, TypeAliasDecl};
use std::fmt::Write;

fn module(name: &str, exports: &[&str], imports: Vec<Import>, body: Vec<ExprI>) -> Module {
    Module {
        name: name.into(),
        exports: exports.iter().map(|e| EVar::from(*e)).collect(),
        imports,
        body,
    }
}

fn alias(name: &str, params: &[&str], ty: Type) -> ExprI {
    ExprI::new(ExprKind::TypeAlias(TypeAliasDecl {
        name: TVar::general(name),
        params: params.iter().map(|p| TVar::general(p)).collect(),
        ty,
    }))
}

fn app(name: &str, args: Vec<Type>) -> Type {
    Type::App(TVar::general(name), args)
}

fn dump_sigs(modules: &[Module]) -> String {
    let mut out = String::new();
    for module in modules {
        for item in &module.body {
            if let ExprKind::Sig(sig) = &item.kind {
                writeln!(out, "{} :: {}", sig.name, sig.ty)
                    .expect("string write should succeed");
            }
        }
    }
    out
}

fn check(mut modules: Vec<Module>, expect: &Expect) {
    let dag = resolve(&modules).expect("modules should resolve");
    let actual = match desugar(&mut modules, &dag) {
        Ok(()) => dump_sigs(&modules),
        Err(errors) => errors
            .iter()
            .map(|e| format!("{e:?}\n"))
            .collect::<String>(),
    };
    expect.assert_eq(&actual);
}

#[test]
fn plain_alias_substitutes_into_signatures() {
    check(
        vec![module(
            "Main",
            &[],
            Vec::new(),
            vec![
                alias("Id", &[], Type::var("Int")),
                ExprI::sig("f", Type::fun(Type::var("Id"), Type::var("Id"))),
            ],
        )],
        &expect![[r#"
            f :: Int -> Int
        "#]],
    );
}

#[test]
fn applied_alias_substitutes_positionally() {
    check(
        vec![module(
            "Main",
            &[],
            Vec::new(),
            vec![
                alias("Pair", &["a"], app("Tuple2", vec![Type::var("a"), Type::var("a")])),
                ExprI::sig("f", Type::fun(app("Pair", vec![Type::var("Int")]), Type::var("Bool"))),
            ],
        )],
        &expect![[r#"
            f :: Tuple2 Int Int -> Bool
        "#]],
    );
}

#[test]
fn alias_chains_resolve_transitively() {
    check(
        vec![module(
            "Main",
            &[],
            Vec::new(),
            vec![
                alias("A", &[], Type::var("B")),
                alias("B", &[], Type::var("Int")),
                ExprI::sig("f", Type::var("A")),
            ],
        )],
        &expect![[r#"
            f :: Int
        "#]],
    );
}

#[test]
fn substitution_is_idempotent() {
    let modules = vec![module(
        "Main",
        &[],
        Vec::new(),
        vec![
            alias("Pair", &["a"], app("Tuple2", vec![Type::var("a"), Type::var("a")])),
            ExprI::sig("f", Type::fun(app("Pair", vec![Type::var("Int")]), Type::var("Bool"))),
        ],
    )];
    let dag = resolve(&modules).expect("modules should resolve");

    let mut once = modules.clone();
    desugar(&mut once, &dag).expect("first pass should succeed");
    let mut twice = once.clone();
    desugar(&mut twice, &dag).expect("second pass should succeed");
    assert_eq!(dump_sigs(&once), dump_sigs(&twice));
}

#[test]
fn self_recursive_alias_is_rejected() {
    check(
        vec![module(
            "Main",
            &[],
            Vec::new(),
            vec![alias("T", &[], Type::var("T"))],
        )],
        &expect![[r#"
            SelfRecursiveTypeAlias("T")
        "#]],
    );
}

#[test]
fn mutually_recursive_aliases_are_rejected() {
    check(
        vec![module(
            "Main",
            &[],
            Vec::new(),
            vec![
                alias("A", &[], Type::var("B")),
                alias("B", &[], Type::var("A")),
                ExprI::sig("f", Type::var("A")),
            ],
        )],
        &expect![[r#"
            SelfRecursiveTypeAlias("A")
        "#]],
    );
}

#[test]
fn alias_arity_mismatch_is_rejected() {
    check(
        vec![module(
            "Main",
            &[],
            Vec::new(),
            vec![
                alias("Pair", &["a"], app("Tuple2", vec![Type::var("a"), Type::var("a")])),
                ExprI::sig(
                    "f",
                    app("Pair", vec![Type::var("Int"), Type::var("Bool")]),
                ),
            ],
        )],
        &expect![[r#"
            BadTypeAliasParameters("Pair", 1, 2)
        "#]],
    );
}

#[test]
fn aliases_flow_through_import_renames() {
    check(
        vec![
            module(
                "Main",
                &[],
                vec![Import {
                    module: "A".into(),
                    include: Some(vec![(EVar::from("T"), Some(EVar::from("U")))]),
                    exclude: Vec::new(),
                    alias: None,
                }],
                vec![ExprI::sig("f", Type::var("U"))],
            ),
            module(
                "A",
                &["T"],
                Vec::new(),
                vec![alias("T", &[], Type::var("Int"))],
            ),
        ],
        &expect![[r#"
            f :: Int
        "#]],
    );
}

#[test]
fn equivalent_imported_aliases_reconcile() {
    let shared = || alias("T", &[], Type::var("Int"));
    check(
        vec![
            module(
                "Main",
                &[],
                vec![Import::all("A"), Import::all("B")],
                vec![ExprI::sig("f", Type::var("T"))],
            ),
            module("A", &["T"], Vec::new(), vec![shared()]),
            module("B", &["T"], Vec::new(), vec![shared()]),
        ],
        &expect![[r#"
            f :: Int
        "#]],
    );
}

#[test]
fn conflicting_imported_aliases_are_rejected() {
    check(
        vec![
            module(
                "Main",
                &[],
                vec![Import::all("A"), Import::all("B")],
                vec![ExprI::sig("f", Type::var("T"))],
            ),
            module("A", &["T"], Vec::new(), vec![alias("T", &[], Type::var("Int"))]),
            module("B", &["T"], Vec::new(), vec![alias("T", &[], Type::var("Str"))]),
        ],
        &expect![[r#"
            ConflictingTypeAliases("T", "Main")
        "#]],
    );
}

#[test]
fn existential_defaults_resolve_to_the_first_instantiation() {
    check(
        vec![module(
            "Main",
            &[],
            Vec::new(),
            vec![ExprI::sig(
                "f",
                Type::fun(
                    Type::Exists(TVar::general("a"), vec![Type::var("Int"), Type::var("Real")]),
                    Type::var("Bool"),
                ),
            )],
        )],
        &expect![[r#"
            f :: Int -> Bool
        "#]],
    );
}
