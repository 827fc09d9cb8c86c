// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The abstract syntax tree for Morloc scripts, as delivered by the parser.
//! Every expression node carries a unique integer index that later keys the
//! term-type table and the manifold list.

#![warn(missing_docs)]

use indenter::{indented, Format, Indented};
use mlc_data_structures::display::join;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter, Write},
    hash::{Hash, Hasher},
    rc::Rc,
    str::FromStr,
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

/// The unique identifier for an AST node.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    const DEFAULT_VALUE: u32 = u32::MAX;

    /// The ID of the first node.
    pub const FIRST: Self = Self(0);

    /// The successor of this ID.
    #[must_use]
    pub fn successor(self) -> Self {
        Self(self.0 + 1)
    }

    /// True if this is the default ID.
    #[must_use]
    pub fn is_default(self) -> bool {
        self.0 == Self::DEFAULT_VALUE
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self(Self::DEFAULT_VALUE)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.is_default() {
            f.write_str("_id_")
        } else {
            self.0.fmt(f)
        }
    }
}

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        assert!(!value.is_default(), "default node ID should be replaced");
        value.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self(u32::try_from(value).expect("node index should fit in 32 bits"))
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        assert!(!self.is_default(), "default node ID should be replaced");
        self.0 == other.0
    }
}

impl Eq for NodeId {}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        assert!(!self.is_default(), "default node ID should be replaced");
        self.0.cmp(&other.0)
    }
}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// A module name.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MVar(Rc<str>);

impl MVar {
    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MVar {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

impl Display for MVar {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An expression variable name.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct EVar(Rc<str>);

impl EVar {
    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EVar {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

impl std::borrow::Borrow<str> for EVar {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for EVar {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A type variable name, optionally tagged with the backend language whose
/// concrete type it names.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TVar {
    /// The language tag, or `None` for a general type variable.
    pub lang: Option<Lang>,
    /// The variable name.
    pub name: Rc<str>,
}

impl TVar {
    /// A general (untagged) type variable.
    #[must_use]
    pub fn general(name: &str) -> Self {
        Self {
            lang: None,
            name: name.into(),
        }
    }

    /// A language-tagged type variable.
    #[must_use]
    pub fn concrete(lang: Lang, name: &str) -> Self {
        Self {
            lang: Some(lang),
            name: name.into(),
        }
    }
}

impl Display for TVar {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.lang {
            None => f.write_str(&self.name),
            Some(lang) => write!(f, "{}@{lang}", self.name),
        }
    }
}

/// A backend language. Adding a backend means adding a variant here and a
/// grammar implementation in the code generator.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Lang {
    /// Python 3.
    Python,
    /// R.
    R,
}

impl Lang {
    /// All known backend languages.
    pub const ALL: [Self; 2] = [Self::Python, Self::R];

    /// The canonical pool file extension for the language.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::R => "R",
        }
    }

    /// The default executor command used to launch the language's pool.
    #[must_use]
    pub fn default_executor(self) -> &'static str {
        match self {
            Self::Python => "python3",
            Self::R => "Rscript",
        }
    }
}

impl Display for Lang {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Python => f.write_str("py"),
            Self::R => f.write_str("r"),
        }
    }
}

impl FromStr for Lang {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "py" | "python" | "Python" | "python3" => Ok(Self::Python),
            "r" | "R" => Ok(Self::R),
            _ => Err(()),
        }
    }
}

/// The tag on a named record type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum RecordTag {
    /// A plain record.
    Record,
    /// An object (a record with an associated constructor).
    Object,
    /// A table (a record of columns).
    Table,
}

impl Display for RecordTag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Record => f.write_str("record"),
            Self::Object => f.write_str("object"),
            Self::Table => f.write_str("table"),
        }
    }
}

/// A named record type: tag, name, type parameters, and an ordered field
/// list.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RecordType {
    /// The record tag.
    pub tag: RecordTag,
    /// The record name.
    pub name: TVar,
    /// The type parameters.
    pub params: Vec<Type>,
    /// The fields, in declaration order.
    pub fields: Vec<(Rc<str>, Type)>,
}

/// A Morloc type.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Type {
    /// A type variable.
    Var(TVar),
    /// A universally quantified type.
    Forall(TVar, Box<Type>),
    /// An existential (unsolved) type with its default instantiations.
    Exists(TVar, Vec<Type>),
    /// A function type.
    Fun(Box<Type>, Box<Type>),
    /// An applied parameterized type.
    App(TVar, Vec<Type>),
    /// A named record type.
    Record(RecordType),
}

impl Type {
    /// A general type variable.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::Var(TVar::general(name))
    }

    /// A function from `input` to `output`.
    #[must_use]
    pub fn fun(input: Self, output: Self) -> Self {
        Self::Fun(Box::new(input), Box::new(output))
    }

    /// The number of arguments accepted by the type, skipping quantifiers.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Forall(_, body) => body.arity(),
            Self::Fun(_, output) => 1 + output.arity(),
            _ => 0,
        }
    }

    /// The argument types of the function spine, skipping quantifiers.
    #[must_use]
    pub fn domains(&self) -> Vec<&Self> {
        match self {
            Self::Forall(_, body) => body.domains(),
            Self::Fun(input, output) => {
                let mut types = vec![input.as_ref()];
                types.extend(output.domains());
                types
            }
            _ => Vec::new(),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Var(v) => v.fmt(f),
            Self::Forall(v, body) => write!(f, "forall {v} . {body}"),
            Self::Exists(v, _) => write!(f, "{v}?"),
            Self::Fun(input, output) => {
                if matches!(input.as_ref(), Self::Fun(..) | Self::Forall(..)) {
                    write!(f, "({input}) -> {output}")
                } else {
                    write!(f, "{input} -> {output}")
                }
            }
            Self::App(name, args) => {
                name.fmt(f)?;
                for arg in args {
                    if matches!(arg, Self::Fun(..) | Self::App(_, _) | Self::Forall(..)) {
                        write!(f, " ({arg})")?;
                    } else {
                        write!(f, " {arg}")?;
                    }
                }
                Ok(())
            }
            Self::Record(record) => {
                write!(f, "{} {{", record.name)?;
                join(
                    f,
                    record
                        .fields
                        .iter()
                        .map(|(key, ty)| format!("{key} :: {ty}")),
                    ", ",
                )?;
                f.write_str("}")
            }
        }
    }
}

/// A literal value.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Lit {
    /// A numeric literal.
    Num(f64),
    /// A string literal.
    Str(Rc<str>),
    /// A boolean literal.
    Bool(bool),
    /// The unit literal.
    Unit,
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Unit => f.write_str("()"),
        }
    }
}

/// An import edge declared by a module.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Import {
    /// The imported module.
    pub module: MVar,
    /// The names to import, each with an optional local alias. `None`
    /// imports the target's full export list.
    pub include: Option<Vec<(EVar, Option<EVar>)>>,
    /// Names excluded from the import.
    pub exclude: Vec<EVar>,
    /// An optional alias for the module itself.
    pub alias: Option<MVar>,
}

impl Import {
    /// Imports everything the target exports.
    #[must_use]
    pub fn all(module: &str) -> Self {
        Self {
            module: module.into(),
            include: None,
            exclude: Vec::new(),
            alias: None,
        }
    }
}

/// A source declaration: functions pulled from a backend-language file.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SourceDecl {
    /// The backend language.
    pub lang: Lang,
    /// The path of the source file, if the functions are not builtins.
    pub path: Option<Rc<str>>,
    /// The imported names: the remote name and an optional local alias.
    pub names: Vec<(Rc<str>, Option<EVar>)>,
}

/// A type signature `v :: t`, optionally language-tagged and carrying
/// properties such as `pack` and `unpack`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Signature {
    /// The term the signature describes.
    pub name: EVar,
    /// The language tag; `None` marks the general type.
    pub lang: Option<Lang>,
    /// Signature properties (`pack`, `unpack`, ...).
    pub props: Vec<Rc<str>>,
    /// The declared type.
    pub ty: Type,
}

/// A value declaration `v = e` with optional where-clauses.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Decl {
    /// The declared term.
    pub name: EVar,
    /// The right-hand side.
    pub body: Box<ExprI>,
    /// Where-clause items (declarations and signatures scoped to the body).
    pub wheres: Vec<ExprI>,
}

/// A type alias declaration `type V p... = t`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TypeAliasDecl {
    /// The alias name.
    pub name: TVar,
    /// The alias parameters.
    pub params: Vec<TVar>,
    /// The aliased type.
    pub ty: Type,
}

/// An indexed expression node.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ExprI {
    /// The node ID.
    pub id: NodeId,
    /// The expression kind.
    pub kind: ExprKind,
}

/// The expression kinds. Module declarations, imports, and exports live on
/// the [`Module`] record rather than in this sum.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum ExprKind {
    /// A source declaration.
    Source(SourceDecl),
    /// A value declaration.
    Decl(Decl),
    /// A type signature.
    Sig(Signature),
    /// A type alias.
    TypeAlias(TypeAliasDecl),
    /// A variable reference.
    Var(EVar),
    /// A field accessor `e.k`.
    Access(Box<ExprI>, Rc<str>),
    /// A list literal.
    List(Vec<ExprI>),
    /// A tuple literal.
    Tuple(Vec<ExprI>),
    /// A record literal.
    Record(Vec<(Rc<str>, ExprI)>),
    /// A lambda.
    Lam(Vec<EVar>, Box<ExprI>),
    /// A function application.
    App(Box<ExprI>, Vec<ExprI>),
    /// A type annotation `e :: t`.
    Ann(Box<ExprI>, Type),
    /// A literal.
    Lit(Lit),
}

impl ExprI {
    /// A node with the default (unassigned) ID.
    #[must_use]
    pub fn new(kind: ExprKind) -> Self {
        Self {
            id: NodeId::default(),
            kind,
        }
    }

    /// A variable reference.
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::new(ExprKind::Var(name.into()))
    }

    /// A function application.
    #[must_use]
    pub fn app(f: Self, args: Vec<Self>) -> Self {
        Self::new(ExprKind::App(Box::new(f), args))
    }

    /// A lambda.
    #[must_use]
    pub fn lam(params: &[&str], body: Self) -> Self {
        Self::new(ExprKind::Lam(
            params.iter().map(|p| EVar::from(*p)).collect(),
            Box::new(body),
        ))
    }

    /// A numeric literal.
    #[must_use]
    pub fn num(value: f64) -> Self {
        Self::new(ExprKind::Lit(Lit::Num(value)))
    }

    /// A string literal.
    #[must_use]
    pub fn str(value: &str) -> Self {
        Self::new(ExprKind::Lit(Lit::Str(value.into())))
    }

    /// A value declaration without where-clauses.
    #[must_use]
    pub fn decl(name: &str, body: Self) -> Self {
        Self::new(ExprKind::Decl(Decl {
            name: name.into(),
            body: Box::new(body),
            wheres: Vec::new(),
        }))
    }

    /// A general type signature without properties.
    #[must_use]
    pub fn sig(name: &str, ty: Type) -> Self {
        Self::new(ExprKind::Sig(Signature {
            name: name.into(),
            lang: None,
            props: Vec::new(),
            ty,
        }))
    }
}

impl Display for ExprI {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        match &self.kind {
            ExprKind::Source(source) => {
                write!(indent, "Source {} [{}]:", self.id, source.lang)?;
                if let Some(path) = &source.path {
                    write!(indent, " \"{path}\"")?;
                }
                indent = set_indentation(indent, 1);
                for (remote, alias) in &source.names {
                    match alias {
                        Some(alias) => write!(indent, "\n{remote} as {alias}")?,
                        None => write!(indent, "\n{remote}")?,
                    }
                }
                Ok(())
            }
            ExprKind::Decl(decl) => {
                write!(indent, "Decl {} ({}):", self.id, decl.name)?;
                indent = set_indentation(indent, 1);
                write!(indent, "\n{}", decl.body)?;
                for item in &decl.wheres {
                    write!(indent, "\nwhere {item}")?;
                }
                Ok(())
            }
            ExprKind::Sig(sig) => {
                write!(indent, "Sig {} ({}", self.id, sig.name)?;
                if let Some(lang) = sig.lang {
                    write!(indent, " {lang}")?;
                }
                write!(indent, "): {}", sig.ty)
            }
            ExprKind::TypeAlias(alias) => {
                write!(indent, "TypeAlias {} ({}", self.id, alias.name)?;
                for param in &alias.params {
                    write!(indent, " {param}")?;
                }
                write!(indent, ") = {}", alias.ty)
            }
            ExprKind::Var(v) => write!(indent, "Var {} ({v})", self.id),
            ExprKind::Access(expr, key) => {
                write!(indent, "Access {} (.{key}):", self.id)?;
                indent = set_indentation(indent, 1);
                write!(indent, "\n{expr}")
            }
            ExprKind::List(items) => {
                write!(indent, "List {}:", self.id)?;
                indent = set_indentation(indent, 1);
                for item in items {
                    write!(indent, "\n{item}")?;
                }
                Ok(())
            }
            ExprKind::Tuple(items) => {
                write!(indent, "Tuple {}:", self.id)?;
                indent = set_indentation(indent, 1);
                for item in items {
                    write!(indent, "\n{item}")?;
                }
                Ok(())
            }
            ExprKind::Record(fields) => {
                write!(indent, "Record {}:", self.id)?;
                indent = set_indentation(indent, 1);
                for (key, value) in fields {
                    write!(indent, "\n{key} = {value}")?;
                }
                Ok(())
            }
            ExprKind::Lam(params, body) => {
                let params = params.iter().map(EVar::as_str).collect::<Vec<_>>();
                write!(indent, "Lam {} ({}):", self.id, params.join(" "))?;
                indent = set_indentation(indent, 1);
                write!(indent, "\n{body}")
            }
            ExprKind::App(callee, args) => {
                write!(indent, "App {}:", self.id)?;
                indent = set_indentation(indent, 1);
                write!(indent, "\n{callee}")?;
                for arg in args {
                    write!(indent, "\n{arg}")?;
                }
                Ok(())
            }
            ExprKind::Ann(expr, ty) => {
                write!(indent, "Ann {} :: {ty}:", self.id)?;
                indent = set_indentation(indent, 1);
                write!(indent, "\n{expr}")
            }
            ExprKind::Lit(lit) => write!(indent, "Lit {} ({lit})", self.id),
        }
    }
}

/// A parsed module, the unit handed over by the external parser.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Module {
    /// The module name.
    pub name: MVar,
    /// The exported terms.
    pub exports: Vec<EVar>,
    /// The import edges.
    pub imports: Vec<Import>,
    /// The body items.
    pub body: Vec<ExprI>,
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut indent = set_indentation(indented(f), 0);
        write!(indent, "Module ({}):", self.name)?;
        indent = set_indentation(indent, 1);
        if !self.exports.is_empty() {
            write!(indent, "\nexports:")?;
            for export in &self.exports {
                write!(indent, " {export}")?;
            }
        }
        for import in &self.imports {
            write!(indent, "\nimport {}", import.module)?;
        }
        for item in &self.body {
            write!(indent, "\n{item}")?;
        }
        Ok(())
    }
}
