//! Checker-style text rendering of type expressions.
//!
//! Change messages embed types as a type checker would print them:
//! `{ items: string[]; }`, `(error: Error | null) => void`,
//! `{ readonly [P in keyof T]: T[P]; }`.

use std::fmt;

use crate::ast::{
    Literal, Member, ModifierOp, ObjectShape, Param, Signature, TupleElement, TypeExpr,
    TypeOperator, TypeParam,
};

/// Binding strength of the position a type is printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    /// Anything goes.
    Top,
    /// Union branch or conditional operand.
    Union,
    /// Intersection branch.
    Intersection,
    /// Array element, indexed-access object, type-operator operand.
    Postfix,
}

fn needs_parens(ty: &TypeExpr, prec: Prec) -> bool {
    match ty {
        TypeExpr::Function(_) | TypeExpr::Constructor(_) | TypeExpr::Conditional(_) => {
            prec >= Prec::Union
        }
        TypeExpr::Union(bs) if bs.len() > 1 => prec >= Prec::Intersection,
        TypeExpr::Intersection(bs) if bs.len() > 1 => prec >= Prec::Postfix,
        TypeExpr::Operator { .. } | TypeExpr::Infer(_) => prec >= Prec::Postfix,
        _ => false,
    }
}

fn write_at(f: &mut fmt::Formatter<'_>, ty: &TypeExpr, prec: Prec) -> fmt::Result {
    if needs_parens(ty, prec) {
        write!(f, "(")?;
        write_type(f, ty)?;
        write!(f, ")")
    } else {
        write_type(f, ty)
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    items: &[TypeExpr],
    sep: &str,
    prec: Prec,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write_at(f, item, prec)?;
    }
    Ok(())
}

fn write_type(f: &mut fmt::Formatter<'_>, ty: &TypeExpr) -> fmt::Result {
    match ty {
        TypeExpr::Keyword(k) => write!(f, "{}", k.as_str()),
        TypeExpr::Literal(lit) => write_literal(f, lit),
        TypeExpr::Array(el) => {
            write_at(f, el, Prec::Postfix)?;
            write!(f, "[]")
        }
        TypeExpr::Tuple(elems) => {
            write!(f, "[")?;
            for (i, el) in elems.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_tuple_element(f, el)?;
            }
            write!(f, "]")
        }
        TypeExpr::Union(bs) => write_joined(f, bs, " | ", Prec::Union),
        TypeExpr::Intersection(bs) => write_joined(f, bs, " & ", Prec::Intersection),
        TypeExpr::Object(shape) => write!(f, "{}", shape),
        TypeExpr::Function(sig) => {
            write_type_params(f, &sig.type_params)?;
            write_arrow(f, sig)
        }
        TypeExpr::Constructor(sig) => {
            write!(f, "new ")?;
            write_type_params(f, &sig.type_params)?;
            write_arrow(f, sig)
        }
        TypeExpr::Reference { name, args } => {
            write!(f, "{}", name)?;
            if !args.is_empty() {
                write!(f, "<")?;
                write_joined(f, args, ", ", Prec::Top)?;
                write!(f, ">")?;
            }
            Ok(())
        }
        TypeExpr::Conditional(c) => {
            write_at(f, &c.check, Prec::Union)?;
            write!(f, " extends ")?;
            write_at(f, &c.extends, Prec::Union)?;
            write!(f, " ? ")?;
            write_type(f, &c.true_type)?;
            write!(f, " : ")?;
            write_type(f, &c.false_type)
        }
        TypeExpr::Mapped(m) => {
            write!(f, "{{ ")?;
            match m.readonly {
                Some(ModifierOp::Add) => write!(f, "readonly ")?,
                Some(ModifierOp::Remove) => write!(f, "-readonly ")?,
                None => {}
            }
            write!(f, "[{} in ", m.key)?;
            write_type(f, &m.constraint)?;
            if let Some(n) = &m.name_type {
                write!(f, " as ")?;
                write_type(f, n)?;
            }
            write!(f, "]")?;
            match m.optional {
                Some(ModifierOp::Add) => write!(f, "?")?,
                Some(ModifierOp::Remove) => write!(f, "-?")?,
                None => {}
            }
            write!(f, ": ")?;
            match &m.value {
                Some(v) => write_type(f, v)?,
                None => write!(f, "any")?,
            }
            write!(f, "; }}")
        }
        TypeExpr::Operator { op, operand } => {
            let kw = match op {
                TypeOperator::KeyOf => "keyof",
                TypeOperator::Readonly => "readonly",
                TypeOperator::Unique => "unique",
            };
            write!(f, "{} ", kw)?;
            write_at(f, operand, Prec::Postfix)
        }
        TypeExpr::IndexedAccess { object, index } => {
            write_at(f, object, Prec::Postfix)?;
            write!(f, "[")?;
            write_type(f, index)?;
            write!(f, "]")
        }
        TypeExpr::Query(name) => write!(f, "typeof {}", name),
        TypeExpr::Infer(name) => write!(f, "infer {}", name),
        TypeExpr::Predicate { param, ty, asserts } => {
            if *asserts {
                write!(f, "asserts ")?;
            }
            write!(f, "{}", param)?;
            if let Some(t) = ty {
                write!(f, " is ")?;
                write_type(f, t)?;
            }
            Ok(())
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, lit: &Literal) -> fmt::Result {
    match lit {
        Literal::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Literal::Num(n) => write!(f, "{}", n),
        Literal::Bool(b) => write!(f, "{}", b),
        Literal::Template(raw) => write!(f, "`{}`", raw),
    }
}

fn write_tuple_element(f: &mut fmt::Formatter<'_>, el: &TupleElement) -> fmt::Result {
    if el.rest {
        write!(f, "...")?;
    }
    match &el.name {
        Some(name) => {
            write!(f, "{}", name)?;
            if el.optional {
                write!(f, "?")?;
            }
            write!(f, ": ")?;
            write_type(f, &el.ty)
        }
        None => {
            if el.optional {
                write_at(f, &el.ty, Prec::Postfix)?;
                write!(f, "?")
            } else {
                write_type(f, &el.ty)
            }
        }
    }
}

fn write_type_params(f: &mut fmt::Formatter<'_>, params: &[TypeParam]) -> fmt::Result {
    if params.is_empty() {
        return Ok(());
    }
    write!(f, "<")?;
    for (i, tp) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", tp)?;
    }
    write!(f, ">")
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", p)?;
    }
    Ok(())
}

fn write_arrow(f: &mut fmt::Formatter<'_>, sig: &Signature) -> fmt::Result {
    write!(f, "(")?;
    write_params(f, &sig.params)?;
    write!(f, ") => ")?;
    write_type(f, &sig.ret)
}

fn write_member(f: &mut fmt::Formatter<'_>, m: &Member) -> fmt::Result {
    if m.readonly {
        write!(f, "readonly ")?;
    }
    write!(f, "{}", m.name)?;
    if m.optional {
        write!(f, "?")?;
    }
    match (&m.ty, m.method) {
        (TypeExpr::Function(sig), true) => {
            write_type_params(f, &sig.type_params)?;
            write!(f, "(")?;
            write_params(f, &sig.params)?;
            write!(f, "): ")?;
            write_type(f, &sig.ret)
        }
        (ty, _) => {
            write!(f, ": ")?;
            write_type(f, ty)
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self)
    }
}

impl fmt::Display for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(c) = &self.constraint {
            write!(f, " extends {}", c)?;
        }
        if let Some(d) = &self.default {
            write!(f, " = {}", d)?;
        }
        Ok(())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rest {
            write!(f, "...")?;
        }
        write!(f, "{}", self.name)?;
        if self.optional {
            write!(f, "?")?;
        }
        write!(f, ": {}", self.ty)
    }
}

impl fmt::Display for ObjectShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() && self.index.is_empty() && self.calls.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{ ")?;
        for sig in &self.calls {
            write_type_params(f, &sig.type_params)?;
            write!(f, "(")?;
            write_params(f, &sig.params)?;
            write!(f, "): {}; ", sig.ret)?;
        }
        for idx in &self.index {
            if idx.readonly {
                write!(f, "readonly ")?;
            }
            write!(f, "[{}: {}]: {}; ", idx.key_name, idx.key_type, idx.value)?;
        }
        for m in &self.members {
            write_member(f, m)?;
            write!(f, "; ")?;
        }
        write!(f, "}}")
    }
}

/// `(params) => ret` with the signature's own type parameters left out.
/// Used when a change message quotes a whole function signature.
pub struct ArrowText<'a>(pub &'a Signature);

impl fmt::Display for ArrowText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_arrow(f, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Keyword, Mapped};

    fn kw(k: Keyword) -> TypeExpr {
        TypeExpr::keyword(k)
    }

    fn arr(t: TypeExpr) -> TypeExpr {
        TypeExpr::Array(Box::new(t))
    }

    fn member(name: &str, ty: TypeExpr) -> Member {
        Member {
            name: name.into(),
            ty,
            optional: false,
            readonly: false,
            method: false,
            line: 1,
        }
    }

    #[test]
    fn object_literal_uses_checker_layout() {
        let obj = TypeExpr::Object(ObjectShape {
            members: vec![member("items", arr(kw(Keyword::String)))],
            ..Default::default()
        });
        assert_eq!(obj.to_string(), "{ items: string[]; }");
        assert_eq!(TypeExpr::Object(ObjectShape::default()).to_string(), "{}");
    }

    #[test]
    fn union_of_arrays_and_array_of_union() {
        let u = TypeExpr::Union(vec![arr(kw(Keyword::String)), arr(kw(Keyword::Number))]);
        assert_eq!(u.to_string(), "string[] | number[]");
        let a = arr(TypeExpr::Union(vec![kw(Keyword::String), kw(Keyword::Number)]));
        assert_eq!(a.to_string(), "(string | number)[]");
    }

    #[test]
    fn arrow_text_omits_type_parameters() {
        let sig = Signature {
            type_params: vec![TypeParam {
                name: "T".into(),
                constraint: None,
                default: None,
            }],
            params: vec![Param {
                name: "error".into(),
                ty: TypeExpr::Union(vec![TypeExpr::reference("Error"), kw(Keyword::Null)]),
                optional: false,
                rest: false,
            }],
            ret: kw(Keyword::Void),
        };
        assert_eq!(
            ArrowText(&sig).to_string(),
            "(error: Error | null) => void"
        );
        assert_eq!(
            TypeExpr::Function(Box::new(sig)).to_string(),
            "<T>(error: Error | null) => void"
        );
    }

    #[test]
    fn mapped_type_prints_modifiers() {
        let m = TypeExpr::Mapped(Box::new(Mapped {
            key: "P".into(),
            constraint: TypeExpr::Operator {
                op: TypeOperator::KeyOf,
                operand: Box::new(TypeExpr::reference("T")),
            },
            name_type: None,
            value: Some(TypeExpr::IndexedAccess {
                object: Box::new(TypeExpr::reference("T")),
                index: Box::new(TypeExpr::reference("P")),
            }),
            readonly: Some(ModifierOp::Add),
            optional: None,
        }));
        assert_eq!(m.to_string(), "{ readonly [P in keyof T]: T[P]; }");
    }

    #[test]
    fn string_literals_use_double_quotes() {
        let u = TypeExpr::Union(vec![
            TypeExpr::Literal(Literal::Str("click".into())),
            TypeExpr::Literal(Literal::Str("focus".into())),
        ]);
        assert_eq!(u.to_string(), "\"click\" | \"focus\"");
    }
}
