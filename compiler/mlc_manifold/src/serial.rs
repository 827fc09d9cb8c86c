// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Planning of the per-language serialization maps. Signatures carrying the
//! `pack` and `unpack` properties populate the type-keyed maps; a packer
//! whose domain is a bare type variable is generic and replaces the
//! built-in fallback shipped with the language runtime preamble.

#[cfg(test)]
mod tests;

use mlc_ast::ast::{ExprKind, Lang, Module, Signature, Type};
use std::rc::Rc;

/// The serialization map for one backend language.
#[derive(Clone, Debug)]
pub struct SerialMap {
    /// The language.
    pub lang: Lang,
    /// Type-specific packers, keyed by the packed type.
    pub packers: Vec<(Type, Rc<str>)>,
    /// Type-specific unpackers, keyed by the produced type.
    pub unpackers: Vec<(Type, Rc<str>)>,
    /// The generic packer used when no type-specific entry matches.
    pub generic_packer: Rc<str>,
    /// The generic unpacker used when no type-specific entry matches.
    pub generic_unpacker: Rc<str>,
    /// Source files declaring the (un)packers.
    pub sources: Vec<Rc<str>>,
}

impl SerialMap {
    /// The packer for a type, falling back to the generic packer.
    #[must_use]
    pub fn packer_for(&self, ty: Option<&Type>) -> &str {
        lookup(&self.packers, ty).unwrap_or(&self.generic_packer)
    }

    /// The unpacker for a type, falling back to the generic unpacker.
    #[must_use]
    pub fn unpacker_for(&self, ty: Option<&Type>) -> &str {
        lookup(&self.unpackers, ty).unwrap_or(&self.generic_unpacker)
    }
}

fn lookup<'a>(entries: &'a [(Type, Rc<str>)], ty: Option<&Type>) -> Option<&'a str> {
    let ty = ty?;
    entries
        .iter()
        .find(|(key, _)| key == ty)
        .map(|(_, name)| name.as_ref())
}

/// Scans the module set for `pack`/`unpack` signatures in one language and
/// builds its serialization map. The built-in generic names come from the
/// language grammar's runtime preamble.
#[must_use]
pub fn plan(
    modules: &[Module],
    lang: Lang,
    builtin_packer: &str,
    builtin_unpacker: &str,
) -> SerialMap {
    let mut map = SerialMap {
        lang,
        packers: Vec::new(),
        unpackers: Vec::new(),
        generic_packer: builtin_packer.into(),
        generic_unpacker: builtin_unpacker.into(),
        sources: Vec::new(),
    };

    for module in modules {
        for item in &module.body {
            let ExprKind::Sig(sig) = &item.kind else {
                continue;
            };
            if sig.lang != Some(lang) {
                continue;
            }
            let is_pack = sig.props.iter().any(|p| p.as_ref() == "pack");
            let is_unpack = sig.props.iter().any(|p| p.as_ref() == "unpack");
            if !is_pack && !is_unpack {
                continue;
            }

            let Some(domain) = sig.ty.domains().first().copied() else {
                continue;
            };
            let (name, path) = source_of(module, lang, sig);
            if let Some(path) = path {
                if !map.sources.contains(&path) {
                    map.sources.push(path);
                }
            }

            if is_pack {
                if is_generic(domain) {
                    map.generic_packer = name.clone();
                } else {
                    map.packers.push((domain.clone(), name.clone()));
                }
            }
            if is_unpack {
                if is_generic(domain) {
                    map.generic_unpacker = name;
                } else {
                    map.unpackers.push((domain.clone(), name));
                }
            }
        }
    }

    map
}

/// A (un)packer is generic when its domain is a bare type variable.
fn is_generic(ty: &Type) -> bool {
    match ty {
        Type::Var(_) | Type::Exists(..) => true,
        Type::Forall(_, body) => is_generic(body),
        _ => false,
    }
}

/// Resolves the signature's term to the remote function name and source
/// path declared for it in the same module.
fn source_of(module: &Module, lang: Lang, sig: &Signature) -> (Rc<str>, Option<Rc<str>>) {
    for item in &module.body {
        let ExprKind::Source(source) = &item.kind else {
            continue;
        };
        if source.lang != lang {
            continue;
        }
        for (remote, alias) in &source.names {
            let local = alias
                .as_ref()
                .map_or_else(|| remote.as_ref(), |a| a.as_str());
            if local == sig.name.as_str() {
                return (remote.clone(), source.path.clone());
            }
        }
    }
    (sig.name.as_str().into(), None)
}
