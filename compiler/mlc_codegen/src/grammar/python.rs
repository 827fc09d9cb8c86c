// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{DispatchCase, Grammar};
use mlc_ast::ast::Lang;
use mlc_manifold::manifold::ManifoldId;
use std::fmt::Write;

/// The Python 3 backend grammar.
pub struct PythonGrammar;

impl Grammar for PythonGrammar {
    fn lang(&self) -> Lang {
        Lang::Python
    }

    fn shebang(&self) -> &'static str {
        "#!/usr/bin/env python3"
    }

    fn preamble(&self) -> &'static str {
        include_str!("python_prelude.py")
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
        "    "
    }

    fn assign(&self, lhs: &str, rhs: &str) -> String {
        format!("{lhs} = {rhs}")
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
        let mut out = format!("def {name}({}):\n", params.join(", "));
        if body.is_empty() {
            writeln!(out, "{}pass", self.indent()).expect("string write should succeed");
        }
        for line in body {
            writeln!(out, "{}{line}", self.indent()).expect("string write should succeed");
        }
        out
    }

    fn ret(&self, expr: &str) -> String {
        format!("return {expr}")
    }

    fn quote(&self, text: &str) -> String {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    }

    fn bool_lit(&self, value: bool) -> String {
        if value { "True" } else { "False" }.to_string()
    }

    fn unit_lit(&self) -> String {
        "None".to_string()
    }

    fn list(&self, items: &[String]) -> String {
        format!("[{}]", items.join(", "))
    }

    fn tuple(&self, items: &[String]) -> String {
        if items.len() == 1 {
            format!("({},)", items[0])
        } else {
            format!("({})", items.join(", "))
        }
    }

    fn record(&self, fields: &[(String, String)]) -> String {
        let rendered: Vec<String> = fields
            .iter()
            .map(|(key, value)| format!("{}: {value}", self.quote(key)))
            .collect();
        format!("{{{}}}", rendered.join(", "))
    }

    fn import(&self, path: &str) -> String {
        let quoted = self.quote(path);
        format!("exec(compile(open({quoted}).read(), {quoted}, \"exec\"))")
    }

    fn foreign_call(
        &self,
        executor: &str,
        pool: &str,
        id: ManifoldId,
        args: &[String],
    ) -> String {
        let cmd = self.list(&[
            self.quote(executor),
            self.quote(pool),
            self.quote(&usize::from(id).to_string()),
        ]);
        format!("mlc_foreign({cmd}, {})", self.list(args))
    }

    fn dispatch(&self, cases: &[DispatchCase]) -> String {
        let mut out = String::from("if __name__ == \"__main__\":\n");
        let tab = self.indent();
        let lines = [
            "if len(sys.argv) < 2:",
            "    mlc_err(\"pool expects an integer manifold id\")",
            "try:",
            "    mid = int(sys.argv[1])",
            "except ValueError:",
            "    mlc_err(\"pool expects an integer manifold id\")",
            "args = sys.argv[2:]",
        ];
        for line in lines {
            writeln!(out, "{tab}{line}").expect("string write should succeed");
        }
        for (index, case) in cases.iter().enumerate() {
            let keyword = if index == 0 { "if" } else { "elif" };
            writeln!(out, "{tab}{keyword} mid == {}:", usize::from(case.id))
                .expect("string write should succeed");
            writeln!(
                out,
                "{tab}{tab}result = {}(m{}(*args))",
                case.packer,
                usize::from(case.id)
            )
            .expect("string write should succeed");
        }
        writeln!(out, "{tab}else:").expect("string write should succeed");
        writeln!(
            out,
            "{tab}{tab}mlc_err(\"unknown manifold id: %s\" % sys.argv[1])"
        )
        .expect("string write should succeed");
        writeln!(out, "{tab}sys.stdout.write(result + \"\\n\")")
            .expect("string write should succeed");
        out
    }
}
