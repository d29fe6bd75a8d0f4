//! Declaration-surface AST.
//!
//! Produced once per document by the parser and read-only afterwards.
//! Type expressions are a tagged tree; every comparison in the crate matches
//! on these variants and never on rendered text.

// ──────────────────────────────────────────────
// Documents and statements
// ──────────────────────────────────────────────

/// One version's full parsed declaration surface.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name used in diagnostics.
    pub name: String,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Record(RecordDecl),
    TypeAlias(AliasDecl),
    Function(FunctionDecl),
    Namespace(NamespaceDecl),
    /// `declare const x: T;` is part of the module but not of the compared surface.
    Variable(VariableDecl),
    Import(ImportDecl),
}

/// Which keyword introduced a structured-record declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Interface,
    Class,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Interface => "interface",
            RecordKind::Class => "class",
        }
    }
}

/// `interface Name<T> extends Base { ... }` or `declare class Name { ... }`.
#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub name: String,
    pub kind: RecordKind,
    pub exported: bool,
    pub type_params: Vec<TypeParam>,
    /// `extends` (and, for classes, `implements`) heritage references.
    pub heritage: Vec<TypeExpr>,
    pub body: ObjectShape,
    pub line: u32,
}

/// `type Name<T> = ...;`
#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub name: String,
    pub exported: bool,
    pub type_params: Vec<TypeParam>,
    pub ty: TypeExpr,
    pub line: u32,
}

/// `function name<T>(params): R;`
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub exported: bool,
    pub signature: Signature,
    pub line: u32,
}

/// `namespace A.B { ... }`, `declare module "m" { ... }`, `declare global { ... }`.
#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: String,
    pub exported: bool,
    pub body: Vec<Statement>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub line: u32,
}

/// Names bound by an import statement. They resolve as opaque external symbols.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub names: Vec<String>,
    pub line: u32,
}

// ──────────────────────────────────────────────
// Members and signatures
// ──────────────────────────────────────────────

/// A named member of a structured record or an inline object type.
///
/// Equality ignores `line` so the same member in two documents compares equal.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub ty: TypeExpr,
    pub optional: bool,
    pub readonly: bool,
    /// Declared with method syntax (`m(x: T): R`); `ty` is then a function shape.
    pub method: bool,
    pub line: u32,
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.ty == other.ty
            && self.optional == other.optional
            && self.readonly == other.readonly
            && self.method == other.method
    }
}

/// `[key: string]: T`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSignature {
    pub key_name: String,
    pub key_type: TypeExpr,
    pub value: TypeExpr,
    pub readonly: bool,
}

/// Body of an interface, class, or object literal type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape {
    pub members: Vec<Member>,
    pub index: Vec<IndexSignature>,
    /// Call signatures (`(x: T): R`) declared on the shape.
    pub calls: Vec<Signature>,
}

impl ObjectShape {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<TypeExpr>,
    pub default: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Declared type; an unannotated parameter is `any`.
    pub ty: TypeExpr,
    pub optional: bool,
    pub rest: bool,
}

impl Param {
    /// Callers may omit this argument.
    pub fn is_omittable(&self) -> bool {
        self.optional || self.rest
    }
}

/// A function-like signature shared by function declarations, methods,
/// function types, and call signatures.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: TypeExpr,
}

impl Signature {
    /// Number of parameters a caller must supply.
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.is_omittable()).count()
    }
}

// ──────────────────────────────────────────────
// Type expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    Object,
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
}

impl Keyword {
    pub fn from_word(w: &str) -> Option<Keyword> {
        Some(match w {
            "string" => Keyword::String,
            "number" => Keyword::Number,
            "boolean" => Keyword::Boolean,
            "bigint" => Keyword::BigInt,
            "symbol" => Keyword::Symbol,
            "object" => Keyword::Object,
            "any" => Keyword::Any,
            "unknown" => Keyword::Unknown,
            "never" => Keyword::Never,
            "void" => Keyword::Void,
            "undefined" => Keyword::Undefined,
            "null" => Keyword::Null,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::String => "string",
            Keyword::Number => "number",
            Keyword::Boolean => "boolean",
            Keyword::BigInt => "bigint",
            Keyword::Symbol => "symbol",
            Keyword::Object => "object",
            Keyword::Any => "any",
            Keyword::Unknown => "unknown",
            Keyword::Never => "never",
            Keyword::Void => "void",
            Keyword::Undefined => "undefined",
            Keyword::Null => "null",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    /// Numeric literal as written (`1`, `-2.5`, `0xff`).
    Num(String),
    Bool(bool),
    /// Raw template literal content between the backticks.
    Template(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOperator {
    KeyOf,
    Readonly,
    Unique,
}

/// `+readonly`/`readonly` adds a modifier, `-readonly` removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierOp {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub optional: bool,
    pub rest: bool,
}

/// `check extends extends_type ? true_type : false_type`
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub check: TypeExpr,
    pub extends: TypeExpr,
    pub true_type: TypeExpr,
    pub false_type: TypeExpr,
}

/// `{ readonly [K in C as N]?: V }`
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped {
    pub key: String,
    pub constraint: TypeExpr,
    pub name_type: Option<TypeExpr>,
    pub value: Option<TypeExpr>,
    pub readonly: Option<ModifierOp>,
    pub optional: Option<ModifierOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Keyword(Keyword),
    Literal(Literal),
    Array(Box<TypeExpr>),
    Tuple(Vec<TupleElement>),
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    Object(ObjectShape),
    Function(Box<Signature>),
    Constructor(Box<Signature>),
    /// Named reference, possibly qualified (`A.B`) and generic.
    Reference {
        name: String,
        args: Vec<TypeExpr>,
    },
    Conditional(Box<Conditional>),
    Mapped(Box<Mapped>),
    Operator {
        op: TypeOperator,
        operand: Box<TypeExpr>,
    },
    IndexedAccess {
        object: Box<TypeExpr>,
        index: Box<TypeExpr>,
    },
    /// `typeof x.y`
    Query(String),
    /// `infer U` inside a conditional's extends clause.
    Infer(String),
    /// `x is T` / `asserts x is T` in return position.
    Predicate {
        param: String,
        ty: Option<Box<TypeExpr>>,
        asserts: bool,
    },
}

impl TypeExpr {
    pub fn keyword(k: Keyword) -> Self {
        TypeExpr::Keyword(k)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeExpr::Reference {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, TypeExpr::Function(_))
    }

    pub fn as_function(&self) -> Option<&Signature> {
        match self {
            TypeExpr::Function(sig) => Some(sig),
            _ => None,
        }
    }

    /// Branches of a union, or the type itself as a single branch.
    pub fn union_branches(&self) -> Vec<&TypeExpr> {
        match self {
            TypeExpr::Union(branches) => branches.iter().collect(),
            other => vec![other],
        }
    }

    /// Branches of an intersection, or the type itself as a single branch.
    pub fn intersection_branches(&self) -> Vec<&TypeExpr> {
        match self {
            TypeExpr::Intersection(branches) => branches.iter().collect(),
            other => vec![other],
        }
    }

    /// Replace references to type parameters with the given arguments.
    pub fn substitute(&self, bindings: &[(String, TypeExpr)]) -> TypeExpr {
        if bindings.is_empty() {
            return self.clone();
        }
        let sub = |t: &TypeExpr| t.substitute(bindings);
        match self {
            TypeExpr::Reference { name, args } if args.is_empty() => bindings
                .iter()
                .find(|(param, _)| param == name)
                .map(|(_, arg)| arg.clone())
                .unwrap_or_else(|| self.clone()),
            TypeExpr::Reference { name, args } => TypeExpr::Reference {
                name: name.clone(),
                args: args.iter().map(sub).collect(),
            },
            TypeExpr::Array(el) => TypeExpr::Array(Box::new(sub(el))),
            TypeExpr::Tuple(elems) => TypeExpr::Tuple(
                elems
                    .iter()
                    .map(|e| TupleElement {
                        ty: sub(&e.ty),
                        ..e.clone()
                    })
                    .collect(),
            ),
            TypeExpr::Union(bs) => TypeExpr::Union(bs.iter().map(sub).collect()),
            TypeExpr::Intersection(bs) => TypeExpr::Intersection(bs.iter().map(sub).collect()),
            TypeExpr::Object(shape) => TypeExpr::Object(shape.substitute(bindings)),
            TypeExpr::Function(sig) => TypeExpr::Function(Box::new(sig.substitute(bindings))),
            TypeExpr::Constructor(sig) => {
                TypeExpr::Constructor(Box::new(sig.substitute(bindings)))
            }
            TypeExpr::Conditional(c) => TypeExpr::Conditional(Box::new(Conditional {
                check: sub(&c.check),
                extends: sub(&c.extends),
                true_type: sub(&c.true_type),
                false_type: sub(&c.false_type),
            })),
            TypeExpr::Mapped(m) => {
                // The mapped key shadows any outer binding of the same name.
                let inner: Vec<(String, TypeExpr)> = bindings
                    .iter()
                    .filter(|(param, _)| param != &m.key)
                    .cloned()
                    .collect();
                TypeExpr::Mapped(Box::new(Mapped {
                    key: m.key.clone(),
                    constraint: sub(&m.constraint),
                    name_type: m.name_type.as_ref().map(|t| t.substitute(&inner)),
                    value: m.value.as_ref().map(|t| t.substitute(&inner)),
                    readonly: m.readonly,
                    optional: m.optional,
                }))
            }
            TypeExpr::Operator { op, operand } => TypeExpr::Operator {
                op: *op,
                operand: Box::new(sub(operand)),
            },
            TypeExpr::IndexedAccess { object, index } => TypeExpr::IndexedAccess {
                object: Box::new(sub(object)),
                index: Box::new(sub(index)),
            },
            TypeExpr::Predicate { param, ty, asserts } => TypeExpr::Predicate {
                param: param.clone(),
                ty: ty.as_ref().map(|t| Box::new(sub(t))),
                asserts: *asserts,
            },
            TypeExpr::Keyword(_)
            | TypeExpr::Literal(_)
            | TypeExpr::Query(_)
            | TypeExpr::Infer(_) => self.clone(),
        }
    }
}

impl ObjectShape {
    pub fn substitute(&self, bindings: &[(String, TypeExpr)]) -> ObjectShape {
        ObjectShape {
            members: self
                .members
                .iter()
                .map(|m| Member {
                    ty: m.ty.substitute(bindings),
                    ..m.clone()
                })
                .collect(),
            index: self
                .index
                .iter()
                .map(|i| IndexSignature {
                    key_type: i.key_type.substitute(bindings),
                    value: i.value.substitute(bindings),
                    ..i.clone()
                })
                .collect(),
            calls: self.calls.iter().map(|s| s.substitute(bindings)).collect(),
        }
    }
}

impl Signature {
    pub fn substitute(&self, bindings: &[(String, TypeExpr)]) -> Signature {
        // Type parameters declared on the signature shadow outer bindings.
        let inner: Vec<(String, TypeExpr)> = bindings
            .iter()
            .filter(|(name, _)| !self.type_params.iter().any(|tp| &tp.name == name))
            .cloned()
            .collect();
        Signature {
            type_params: self
                .type_params
                .iter()
                .map(|tp| TypeParam {
                    name: tp.name.clone(),
                    constraint: tp.constraint.as_ref().map(|c| c.substitute(&inner)),
                    default: tp.default.as_ref().map(|d| d.substitute(&inner)),
                })
                .collect(),
            params: self
                .params
                .iter()
                .map(|p| Param {
                    ty: p.ty.substitute(&inner),
                    ..p.clone()
                })
                .collect(),
            ret: self.ret.substitute(&inner),
        }
    }

    /// This signature with its own type parameters renamed, by position, to
    /// the names in `names`.
    pub fn with_type_param_names(&self, names: &[TypeParam]) -> Signature {
        let bindings = renaming(&self.type_params, names);
        if bindings.is_empty() {
            return self.clone();
        }
        Signature {
            type_params: rename_params(&self.type_params, &bindings),
            params: self
                .params
                .iter()
                .map(|p| Param {
                    ty: p.ty.substitute(&bindings),
                    ..p.clone()
                })
                .collect(),
            ret: self.ret.substitute(&bindings),
        }
    }
}

impl RecordDecl {
    /// See [`Signature::with_type_param_names`].
    pub fn with_type_param_names(&self, names: &[TypeParam]) -> RecordDecl {
        let bindings = renaming(&self.type_params, names);
        if bindings.is_empty() {
            return self.clone();
        }
        RecordDecl {
            type_params: rename_params(&self.type_params, &bindings),
            heritage: self.heritage.iter().map(|h| h.substitute(&bindings)).collect(),
            body: self.body.substitute(&bindings),
            ..self.clone()
        }
    }
}

impl AliasDecl {
    /// See [`Signature::with_type_param_names`].
    pub fn with_type_param_names(&self, names: &[TypeParam]) -> AliasDecl {
        let bindings = renaming(&self.type_params, names);
        if bindings.is_empty() {
            return self.clone();
        }
        AliasDecl {
            type_params: rename_params(&self.type_params, &bindings),
            ty: self.ty.substitute(&bindings),
            ..self.clone()
        }
    }
}

/// Bindings that rename `params` to `target`, paired by position. A target
/// name still used by an unpaired parameter of `params` is left alone.
fn renaming(params: &[TypeParam], target: &[TypeParam]) -> Vec<(String, TypeExpr)> {
    let unpaired = &params[target.len().min(params.len())..];
    params
        .iter()
        .zip(target)
        .filter(|(p, t)| p.name != t.name && !unpaired.iter().any(|u| u.name == t.name))
        .map(|(p, t)| (p.name.clone(), TypeExpr::reference(t.name.clone())))
        .collect()
}

fn rename_params(params: &[TypeParam], bindings: &[(String, TypeExpr)]) -> Vec<TypeParam> {
    params
        .iter()
        .map(|tp| TypeParam {
            name: match bindings.iter().find(|(from, _)| from == &tp.name) {
                Some((_, TypeExpr::Reference { name, .. })) => name.clone(),
                _ => tp.name.clone(),
            },
            constraint: tp.constraint.as_ref().map(|c| c.substitute(bindings)),
            default: tp.default.as_ref().map(|d| d.substitute(bindings)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_equality_ignores_line() {
        let a = Member {
            name: "items".into(),
            ty: TypeExpr::keyword(Keyword::String),
            optional: false,
            readonly: false,
            method: false,
            line: 2,
        };
        let b = Member { line: 40, ..a.clone() };
        assert_eq!(a, b);
    }

    #[test]
    fn substitute_replaces_bare_parameter_references() {
        let t = TypeExpr::Array(Box::new(TypeExpr::reference("T")));
        let out = t.substitute(&[("T".into(), TypeExpr::keyword(Keyword::Number))]);
        assert_eq!(
            out,
            TypeExpr::Array(Box::new(TypeExpr::keyword(Keyword::Number)))
        );
    }

    #[test]
    fn substitute_respects_signature_shadowing() {
        let sig = Signature {
            type_params: vec![TypeParam {
                name: "T".into(),
                constraint: None,
                default: None,
            }],
            params: vec![],
            ret: TypeExpr::reference("T"),
        };
        let out = sig.substitute(&[("T".into(), TypeExpr::keyword(Keyword::String))]);
        assert_eq!(out.ret, TypeExpr::reference("T"));
    }

    #[test]
    fn type_params_rename_by_position() {
        let tp = |name: &str| TypeParam {
            name: name.into(),
            constraint: None,
            default: None,
        };
        let sig = Signature {
            type_params: vec![tp("U"), tp("V")],
            params: vec![Param {
                name: "x".into(),
                ty: TypeExpr::reference("U"),
                optional: false,
                rest: false,
            }],
            ret: TypeExpr::Array(Box::new(TypeExpr::reference("V"))),
        };
        let out = sig.with_type_param_names(&[tp("T"), tp("V")]);
        assert_eq!(out.type_params, vec![tp("T"), tp("V")]);
        assert_eq!(out.params[0].ty, TypeExpr::reference("T"));
        assert_eq!(out.ret, sig.ret);
    }

    #[test]
    fn required_count_skips_optional_and_rest() {
        let p = |name: &str, optional: bool, rest: bool| Param {
            name: name.into(),
            ty: TypeExpr::keyword(Keyword::Any),
            optional,
            rest,
        };
        let sig = Signature {
            type_params: vec![],
            params: vec![p("a", false, false), p("b", true, false), p("c", false, true)],
            ret: TypeExpr::keyword(Keyword::Void),
        };
        assert_eq!(sig.required_count(), 1);
    }
}
