// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::plan;
use mlc_ast::ast::{EVar, ExprI, ExprKind, Import, Lang, Module, Signature, SourceDecl, TVar, Type};

fn module(name: &str, body: Vec<ExprI>) -> Module {
    Module {
        name: name.into(),
        exports: Vec::new(),
        imports: Vec::<Import>::new(),
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

fn prop_sig(name: &str, lang: Lang, props: &[&str], ty: Type) -> ExprI {
    ExprI::new(ExprKind::Sig(Signature {
        name: name.into(),
        lang: Some(lang),
        props: props.iter().map(|p| (*p).into()).collect(),
        ty,
    }))
}

#[test]
fn pack_signatures_key_the_packer_map_by_domain_type() {
    let modules = [module(
        "Main",
        vec![
            source(Lang::Python, "serial.py", &[("pack_matrix", Some("packMatrix"))]),
            prop_sig(
                "packMatrix",
                Lang::Python,
                &["pack"],
                Type::fun(
                    Type::App(TVar::concrete(Lang::Python, "Matrix"), vec![Type::var("Num")]),
                    Type::var("JSON"),
                ),
            ),
        ],
    )];
    let map = plan(&modules, Lang::Python, "mlc_pack", "mlc_unpack");

    assert_eq!(map.packers.len(), 1);
    assert_eq!(map.packers[0].1.as_ref(), "pack_matrix");
    assert_eq!(map.sources, vec![std::rc::Rc::<str>::from("serial.py")]);
    let matrix = Type::App(TVar::concrete(Lang::Python, "Matrix"), vec![Type::var("Num")]);
    assert_eq!(map.packer_for(Some(&matrix)), "pack_matrix");
    assert_eq!(map.packer_for(Some(&Type::var("Int"))), "mlc_pack");
}

#[test]
fn generic_packers_replace_the_builtin_fallback() {
    let modules = [module(
        "Main",
        vec![
            source(Lang::R, "serial.R", &[("rmorlocinternals_pack", Some("rPack"))]),
            prop_sig(
                "rPack",
                Lang::R,
                &["pack"],
                Type::Forall(
                    TVar::general("a"),
                    Box::new(Type::fun(Type::var("a"), Type::var("JSON"))),
                ),
            ),
        ],
    )];
    let map = plan(&modules, Lang::R, "mlc_pack", "mlc_unpack");

    assert!(map.packers.is_empty());
    assert_eq!(map.generic_packer.as_ref(), "rmorlocinternals_pack");
    assert_eq!(map.generic_unpacker.as_ref(), "mlc_unpack");
}

#[test]
fn languages_without_declared_packers_use_the_builtins() {
    let modules = [module("Main", Vec::new())];
    let map = plan(&modules, Lang::Python, "mlc_pack", "mlc_unpack");

    assert_eq!(map.packer_for(None), "mlc_pack");
    assert_eq!(map.unpacker_for(None), "mlc_unpack");
    assert!(map.sources.is_empty());
}

#[test]
fn other_languages_signatures_are_ignored() {
    let modules = [module(
        "Main",
        vec![prop_sig(
            "pyPack",
            Lang::Python,
            &["pack"],
            Type::Forall(
                TVar::general("a"),
                Box::new(Type::fun(Type::var("a"), Type::var("JSON"))),
            ),
        )],
    )];
    let map = plan(&modules, Lang::R, "mlc_pack", "mlc_unpack");

    assert_eq!(map.generic_packer.as_ref(), "mlc_pack");
}
