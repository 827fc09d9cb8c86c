// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The per-language emission strategy. Each backend provides one `Grammar`
//! implementation; the pool emitter's walk is generic over it, so adding a
//! language never touches the emitter itself.

mod python;
mod r;

pub use python::PythonGrammar;
pub use r::RGrammar;

use mlc_ast::ast::Lang;
use mlc_manifold::manifold::ManifoldId;

/// One dispatch case in a pool's command tail: the manifold to invoke and
/// the packer applied to its result.
pub struct DispatchCase {
    /// The manifold ID.
    pub id: ManifoldId,
    /// The packer function applied to the result before printing.
    pub packer: String,
}

/// The language-specific rendering strategy used by the pool emitter.
pub trait Grammar {
    /// The language this grammar emits.
    fn lang(&self) -> Lang;

    /// The interpreter line placed at the top of the pool.
    fn shebang(&self) -> &'static str;

    /// The static runtime preamble: generic (un)packers, the foreign-call
    /// helper, and the try/warn/error helpers.
    fn preamble(&self) -> &'static str;

    /// The name of the built-in generic packer declared in the preamble.
    fn generic_packer(&self) -> &'static str;

    /// The name of the built-in generic unpacker declared in the preamble.
    fn generic_unpacker(&self) -> &'static str;

    /// A line comment.
    fn comment(&self, text: &str) -> String;

    /// One indentation step.
    fn indent(&self) -> &'static str;

    /// An assignment statement.
    fn assign(&self, lhs: &str, rhs: &str) -> String;

    /// A function call expression.
    fn call(&self, func: &str, args: &[String]) -> String;

    /// A call routed through the runtime's try helper so failures abort
    /// with a diagnostic instead of a backtrace.
    fn try_call(&self, func: &str, args: &[String]) -> String;

    /// A complete function declaration with pre-rendered body lines.
    fn function(&self, name: &str, params: &[String], body: &[String]) -> String;

    /// The statement returning the function result.
    fn ret(&self, expr: &str) -> String;

    /// A quoted string literal.
    fn quote(&self, text: &str) -> String;

    /// A boolean literal.
    fn bool_lit(&self, value: bool) -> String;

    /// The unit/null literal.
    fn unit_lit(&self) -> String;

    /// A list constructor.
    fn list(&self, items: &[String]) -> String;

    /// A tuple constructor.
    fn tuple(&self, items: &[String]) -> String;

    /// A record constructor.
    fn record(&self, fields: &[(String, String)]) -> String;

    /// A statement importing one backend source file.
    fn import(&self, path: &str) -> String;

    /// A foreign call: spawn the executor on another pool, passing the
    /// manifold ID and serialized arguments, capturing stdout.
    fn foreign_call(
        &self,
        executor: &str,
        pool: &str,
        id: ManifoldId,
        args: &[String],
    ) -> String;

    /// The dispatch tail reading the manifold ID from the command line.
    fn dispatch(&self, cases: &[DispatchCase]) -> String;
}

/// The grammar for a backend language.
#[must_use]
pub fn grammar_for(lang: Lang) -> Box<dyn Grammar> {
    match lang {
        Lang::Python => Box::new(PythonGrammar),
        Lang::R => Box::new(RGrammar),
    }
}
