// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{commands, emit_nexus};
use expect_test::expect;
use mlc_ast::assigner::Assigner;
use mlc_ast::ast::{EVar, ExprI, ExprKind, Lang, Module, SourceDecl, Type};
use mlc_frontend::{resolve::resolve, signatures};
use mlc_manifold::build;
use rustc_hash::FxHashMap;

fn compile(mut modules: Vec<Module>) -> Vec<mlc_manifold::manifold::Manifold> {
    let mut assigner = Assigner::new();
    for module in &mut modules {
        assigner.visit_module(module);
    }
    let dag = resolve(&modules).expect("modules should resolve");
    let terms = signatures::build(&modules, &dag).expect("signatures should merge");
    build::build(&modules, &dag, &terms).expect("manifolds should build")
}

fn executors() -> FxHashMap<Lang, String> {
    Lang::ALL
        .iter()
        .map(|lang| (*lang, lang.default_executor().to_string()))
        .collect()
}

fn sample_modules() -> Vec<Module> {
    vec![Module {
        name: "Main".into(),
        exports: vec![EVar::from("h")],
        imports: Vec::new(),
        body: vec![
            ExprI::new(ExprKind::Source(SourceDecl {
                lang: Lang::Python,
                path: Some("g.py".into()),
                names: vec![("g".into(), None)],
            })),
            ExprI::sig("g", Type::fun(Type::var("Int"), Type::var("Int"))),
            ExprI::decl(
                "h",
                ExprI::lam(&["x"], ExprI::app(ExprI::var("g"), vec![ExprI::var("x")])),
            ),
        ],
    }]
}

#[test]
fn one_command_per_exported_root_manifold() {
    let manifolds = compile(sample_modules());
    let commands = commands(&manifolds);

    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].name, "h");
    assert_eq!(commands[0].arity, 1);
    assert_eq!(commands[0].lang, Lang::Python);
    assert_eq!(commands[0].type_str, "Int -> Int");
}

#[test]
fn nexus_dispatches_subcommands_to_their_pools() {
    let manifolds = compile(sample_modules());
    let nexus = emit_nexus(&commands(&manifolds), &executors()).expect("nexus should emit");

    expect![[r#"
        #!/usr/bin/env python3

        # Generated by the Morloc compiler; do not edit.

        import os
        import subprocess
        import sys

        COMMANDS = {
            "h": (0, "pool.py", "python3", 1, "Int -> Int"),
        }


        def usage(out):
            out.write("Usage: nexus <command> [arguments]\n")
            out.write("\n")
            out.write("Commands:\n")
            for name in sorted(COMMANDS):
                out.write("  %s :: %s\n" % (name, COMMANDS[name][4]))


        def main():
            if len(sys.argv) < 2:
                usage(sys.stderr)
                sys.exit(1)
            if sys.argv[1] in ("-h", "--help"):
                usage(sys.stdout)
                sys.exit(0)
            name = sys.argv[1]
            if name not in COMMANDS:
                sys.stderr.write("unknown command: %s\n" % name)
                usage(sys.stderr)
                sys.exit(1)
            mid, pool, executor, arity, _ = COMMANDS[name]
            args = sys.argv[2:]
            if len(args) != arity:
                sys.stderr.write("%s expects %d arguments, got %d\n" % (name, arity, len(args)))
                sys.exit(1)
            pool_path = os.path.join(os.path.dirname(os.path.abspath(__file__)), pool)
            result = subprocess.run([executor, pool_path, str(mid)] + args)
            sys.exit(result.returncode)


        if __name__ == "__main__":
            main()
    "#]]
    .assert_eq(&nexus);
}
