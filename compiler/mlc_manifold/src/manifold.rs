// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The manifold graph: one code-generation unit per call site, each owning
//! its arguments, bound variables, language, and realizations.

use indenter::{indented, Format, Indented};
use mlc_ast::ast::{EVar, Lang, Lit, NodeId, Type};
use mlc_frontend::signatures::Realization;
use std::{
    fmt::{self, Display, Formatter, Write},
    rc::Rc,
};

fn set_indentation<'a, 'b>(
    indent: Indented<'a, Formatter<'b>>,
    level: usize,
) -> Indented<'a, Formatter<'b>> {
    let indentation: &'static str = match level {
        0 => "",
        1 => "    ",
        2 => "        ",
        3 => "            ",
        4 => "                ",
        _ => "                    ",
    };
    indent.with_format(Format::Uniform { indentation })
}

/// The unique identifier for a manifold.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ManifoldId(u32);

impl ManifoldId {
    /// The ID of the first manifold.
    pub const FIRST: Self = Self(0);

    /// The successor of this ID.
    #[must_use]
    pub fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for ManifoldId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl From<ManifoldId> for usize {
    fn from(value: ManifoldId) -> Self {
        value.0 as usize
    }
}

impl From<usize> for ManifoldId {
    fn from(value: usize) -> Self {
        Self(u32::try_from(value).expect("manifold index should fit in 32 bits"))
    }
}

/// A literal argument value: a scalar or a composite built from scalars.
#[derive(Clone, Debug, PartialEq)]
pub enum DataVal {
    /// A scalar literal.
    Lit(Lit),
    /// A list of values.
    List(Vec<DataVal>),
    /// A tuple of values.
    Tuple(Vec<DataVal>),
    /// A record of named values.
    Record(Vec<(Rc<str>, DataVal)>),
}

impl Display for DataVal {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Lit(lit) => lit.fmt(f),
            Self::List(items) => {
                f.write_str("[")?;
                mlc_data_structures::display::join(f, items.iter(), ", ")?;
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                mlc_data_structures::display::join(f, items.iter(), ", ")?;
                f.write_str(")")
            }
            Self::Record(fields) => {
                f.write_str("{")?;
                mlc_data_structures::display::join(
                    f,
                    fields.iter().map(|(key, value)| format!("{key} = {value}")),
                    ", ",
                )?;
                f.write_str("}")
            }
        }
    }
}

/// One argument of a manifold.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A bound variable of the enclosing composition; arrives serialized.
    Name(EVar),
    /// A free variable passed through as a function reference.
    Nest(EVar, Vec<Realization>),
    /// A literal, passed unserialized.
    Data(DataVal),
    /// A positional input of the enclosing manifold.
    Positional(usize),
    /// The result of invoking another manifold.
    Call(ManifoldId),
}

impl Display for Arg {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Name(v) => write!(f, "name {v}"),
            Self::Nest(v, _) => write!(f, "nest {v}"),
            Self::Data(d) => write!(f, "data {d}"),
            Self::Positional(i) => write!(f, "pos {i}"),
            Self::Call(id) => write!(f, "call {id}"),
        }
    }
}

/// A code-generation unit for one call site.
#[derive(Clone, Debug)]
pub struct Manifold {
    /// The manifold ID.
    pub id: ManifoldId,
    /// The AST node of the call site, when one exists.
    pub call_id: Option<NodeId>,
    /// The Morloc-level name of the called term.
    pub morloc_name: EVar,
    /// The exported composition this manifold belongs to.
    pub composition: EVar,
    /// The general type of the called term.
    pub abstract_type: Option<Type>,
    /// The realizations of the called term.
    pub realizations: Vec<Realization>,
    /// The language assigned for emission.
    pub lang: Option<Lang>,
    /// True for the root manifold of an exported composition.
    pub exported: bool,
    /// True when the manifold is invoked (as a `Call` argument or by the
    /// nexus).
    pub called: bool,
    /// True when the called term has a value declaration.
    pub defined: bool,
    /// The composition's bound variables.
    pub bound_vars: Vec<EVar>,
    /// The caller-provided arguments.
    pub args: Vec<Arg>,
}

impl Manifold {
    /// The realization for a specific language, if any.
    #[must_use]
    pub fn realization_in(&self, lang: Lang) -> Option<&Realization> {
        self.realizations.iter().find(|r| r.lang == lang)
    }

    /// The language assigned for emission.
    ///
    /// # Panics
    /// Panics when called before language assignment.
    #[must_use]
    pub fn language(&self) -> Lang {
        self.lang.expect("manifold language should be assigned")
    }
}

impl Display for Manifold {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        write!(indent, "{} {} in {}", self.id, self.morloc_name, self.composition)?;
        if let Some(lang) = self.lang {
            write!(indent, " [{lang}]")?;
        }
        indent = set_indentation(indent, 1);
        let mut flags = Vec::new();
        if self.exported {
            flags.push("exported");
        }
        if self.called {
            flags.push("called");
        }
        if self.defined {
            flags.push("defined");
        }
        if !flags.is_empty() {
            write!(indent, "\n{}", flags.join(" "))?;
        }
        if let Some(ty) = &self.abstract_type {
            write!(indent, "\ntype: {ty}")?;
        }
        if !self.bound_vars.is_empty() {
            let bound: Vec<&str> = self.bound_vars.iter().map(EVar::as_str).collect();
            write!(indent, "\nbound: {}", bound.join(" "))?;
        }
        for arg in &self.args {
            write!(indent, "\narg: {arg}")?;
        }
        for realization in &self.realizations {
            write!(indent, "\nvia: {} {}", realization.lang, realization.source_name)?;
            if let Some(path) = &realization.source_path {
                write!(indent, " \"{path}\"")?;
            }
        }
        Ok(())
    }
}

/// Renders a manifold list for snapshots and debugging.
#[must_use]
pub fn dump(manifolds: &[Manifold]) -> String {
    let mut out = String::new();
    for manifold in manifolds {
        out.push_str(&manifold.to_string());
        out.push('\n');
    }
    out
}
