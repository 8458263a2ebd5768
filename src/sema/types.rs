use std::collections::{HashMap, HashSet};

use crate::frontend::ast::{TypeAst, TypeAstKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Named(String),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(Box<Type>),
    Func {
        params: Vec<Type>,
        results: Vec<Type>,
    },
    Struct(Vec<(String, Type)>),
    Interface,
    Tuple(Vec<Type>),
    Unknown,
}

#[derive(Clone, Debug)]
pub struct TypeDef {
    pub underlying: Type,
    pub is_alias: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TypeDefs {
    defs: HashMap<String, TypeDef>,
}

impl TypeDefs {
    pub fn insert(&mut self, name: String, def: TypeDef) {
        self.defs.insert(name, def);
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.defs.get(name)
    }

    /// Resolves named-type chains down to a structural shape. Names
    /// without a definition (predeclared or foreign) resolve to
    /// themselves.
    pub fn underlying<'a>(&'a self, ty: &'a Type) -> &'a Type {
        let mut cur = ty;
        let mut seen: HashSet<&str> = HashSet::new();
        while let Type::Named(name) = cur {
            if !seen.insert(name.as_str()) {
                return cur;
            }
            match self.defs.get(name.as_str()) {
                Some(def) => cur = &def.underlying,
                None => return cur,
            }
        }
        cur
    }

    pub fn is_map(&self, ty: &Type) -> bool {
        matches!(self.underlying(ty), Type::Map(_, _))
    }

    /// True only when the type is resolved and its underlying shape is
    /// definitely not the map kind. Unknowns stay unknown so callers
    /// can degrade conservatively.
    pub fn is_known_non_map(&self, ty: &Type) -> bool {
        !matches!(self.underlying(ty), Type::Map(_, _) | Type::Unknown)
    }
}

pub fn type_from_ast(ast: &TypeAst) -> Type {
    match &ast.kind {
        TypeAstKind::Named(name) => Type::Named(name.clone()),
        // Foreign types are opaque here; their shape is never assumed.
        TypeAstKind::Qualified(_, _) => Type::Unknown,
        TypeAstKind::Pointer(inner) => Type::Pointer(Box::new(type_from_ast(inner))),
        TypeAstKind::Slice(inner) => Type::Slice(Box::new(type_from_ast(inner))),
        TypeAstKind::Array(_, inner) => Type::Array(Box::new(type_from_ast(inner))),
        TypeAstKind::Map(key, value) => Type::Map(
            Box::new(type_from_ast(key)),
            Box::new(type_from_ast(value)),
        ),
        TypeAstKind::Chan { elem, dir: _ } => Type::Chan(Box::new(type_from_ast(elem))),
        TypeAstKind::Func { params, results } => Type::Func {
            params: params
                .iter()
                .flat_map(|p| {
                    let n = p.names.len().max(1);
                    std::iter::repeat(type_from_ast(&p.ty)).take(n)
                })
                .collect(),
            results: results
                .iter()
                .flat_map(|p| {
                    let n = p.names.len().max(1);
                    std::iter::repeat(type_from_ast(&p.ty)).take(n)
                })
                .collect(),
        },
        TypeAstKind::Struct(fields) => Type::Struct(
            fields
                .iter()
                .flat_map(|f| {
                    let ty = type_from_ast(&f.ty);
                    f.names
                        .iter()
                        .map(move |n| (n.clone(), ty.clone()))
                        .collect::<Vec<_>>()
                })
                .collect(),
        ),
        TypeAstKind::Interface(_) => Type::Interface,
        TypeAstKind::Ellipsis(inner) => Type::Slice(Box::new(type_from_ast(inner))),
    }
}

pub const PREDECLARED_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "complex128",
    "complex64",
    "error",
    "float32",
    "float64",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "rune",
    "string",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
    "uintptr",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underlying_resolves_named_chains() {
        let mut defs = TypeDefs::default();
        defs.insert(
            "Registry".into(),
            TypeDef {
                underlying: Type::Map(
                    Box::new(Type::Named("string".into())),
                    Box::new(Type::Named("int".into())),
                ),
                is_alias: false,
            },
        );
        defs.insert(
            "Alias".into(),
            TypeDef {
                underlying: Type::Named("Registry".into()),
                is_alias: true,
            },
        );
        assert!(defs.is_map(&Type::Named("Alias".into())));
        assert!(defs.is_known_non_map(&Type::Slice(Box::new(Type::Named("int".into())))));
        assert!(!defs.is_known_non_map(&Type::Unknown));
    }

    #[test]
    fn underlying_survives_cycles() {
        let mut defs = TypeDefs::default();
        defs.insert(
            "A".into(),
            TypeDef {
                underlying: Type::Named("B".into()),
                is_alias: true,
            },
        );
        defs.insert(
            "B".into(),
            TypeDef {
                underlying: Type::Named("A".into()),
                is_alias: true,
            },
        );
        // Must terminate; the result is a name, not a map.
        assert!(!defs.is_map(&Type::Named("A".into())));
    }
}
