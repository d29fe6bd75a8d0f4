//! Type compatibility oracle.
//!
//! Decides whether replacing an old type expression with a new one is safe
//! for consumers, given where the type appears. A value the consumer supplies
//! may only widen; a value the consumer reads may only narrow. Shape-specific
//! rules run first and everything they leave open falls back to structural
//! assignability in the direction the position dictates.

use tracing::trace;

use crate::ast::{Conditional, Mapped, ModifierOp, TypeExpr, TypeOperator};
use crate::resolve::{ResolutionContext, Side};
use crate::signature::compare_signatures;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Parameters, record members: values the consumer builds.
    Input,
    /// Return values the consumer receives.
    Output,
}

/// Modifier a mapped type can add to every generated property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedModifier {
    Readonly,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Identical,
    Compatible,
    /// The new union keeps every old branch and adds at least one.
    UnionWidened,
    /// The new conditional chain appends branches to the old one.
    ConditionalExtended,
    /// A mapped type stopped adding a modifier it used to add.
    ModifierRemoved(MappedModifier),
    Incompatible,
}

impl Verdict {
    pub fn is_breaking(self) -> bool {
        matches!(self, Verdict::ModifierRemoved(_) | Verdict::Incompatible)
    }

    pub fn is_compatible(self) -> bool {
        !self.is_breaking()
    }

    pub fn is_additive(self) -> bool {
        matches!(self, Verdict::UnionWidened | Verdict::ConditionalExtended)
    }

    fn from_bool(ok: bool) -> Verdict {
        if ok {
            Verdict::Compatible
        } else {
            Verdict::Incompatible
        }
    }

    /// A nested verdict only says whether the enclosing type still fits.
    fn nested(self) -> Verdict {
        Verdict::from_bool(self.is_compatible())
    }
}

/// Compatibility rules over one document pair's resolution context.
pub struct Oracle<'c, 'd> {
    ctx: &'c ResolutionContext<'d>,
}

impl<'c, 'd> Oracle<'c, 'd> {
    pub fn new(ctx: &'c ResolutionContext<'d>) -> Self {
        Oracle { ctx }
    }

    pub fn is_compatible(&self, old: &TypeExpr, new: &TypeExpr, position: Position) -> bool {
        self.verdict(old, new, position).is_compatible()
    }

    pub fn verdict(&self, old: &TypeExpr, new: &TypeExpr, position: Position) -> Verdict {
        let verdict = self.decide(old, new, position);
        trace!(old = %old, new = %new, ?position, ?verdict, "compatibility verdict");
        verdict
    }

    fn decide(&self, old: &TypeExpr, new: &TypeExpr, position: Position) -> Verdict {
        if old == new {
            return Verdict::Identical;
        }

        // Widening a supplied union is surfaced as its own additive change.
        if position == Position::Input && union_widened(old, new) {
            return Verdict::UnionWidened;
        }

        match (array_element(old), array_element(new)) {
            (Some((o, old_readonly)), Some((n, new_readonly))) => {
                // Supplied arrays may gain readonly, read arrays may lose it.
                let mutability_lost = match position {
                    Position::Input => old_readonly && !new_readonly,
                    Position::Output => !old_readonly && new_readonly,
                };
                if mutability_lost {
                    return Verdict::Incompatible;
                }
                return self.verdict(o, n, position).nested();
            }
            (Some(_), None) => return Verdict::Incompatible,
            _ => {}
        }

        if matches!(old, TypeExpr::Intersection(_)) || matches!(new, TypeExpr::Intersection(_)) {
            return self.intersection(old, new, position);
        }

        if let (
            TypeExpr::Reference { name: on, args: oa },
            TypeExpr::Reference { name: nn, args: na },
        ) = (old, new)
        {
            if on == nn && !oa.is_empty() && oa.len() == na.len() {
                let ok = oa
                    .iter()
                    .zip(na)
                    .all(|(o, n)| self.verdict(o, n, position).is_compatible());
                return Verdict::from_bool(ok);
            }
        }

        if let (TypeExpr::Conditional(o), TypeExpr::Conditional(n)) = (old, new) {
            if conditional_extended(o, n) {
                return Verdict::ConditionalExtended;
            }
        }

        if let (TypeExpr::Mapped(o), TypeExpr::Mapped(n)) = (old, new) {
            if let Some(modifier) = removed_modifier(o, n) {
                return Verdict::ModifierRemoved(modifier);
            }
        }

        if let (Some(o), Some(n)) = (old.as_function(), new.as_function()) {
            let breaking = compare_signatures(self, "", o, n)
                .iter()
                .any(|r| r.is_breaking());
            return Verdict::from_bool(!breaking);
        }

        let ok = match position {
            Position::Input => self.ctx.assignable(old, Side::Previous, new, Side::Current),
            Position::Output => self.ctx.assignable(new, Side::Current, old, Side::Previous),
        };
        Verdict::from_bool(ok)
    }

    /// Every old branch must still be met by some new branch; in an input
    /// position a new branch with no old counterpart is an added requirement.
    fn intersection(&self, old: &TypeExpr, new: &TypeExpr, position: Position) -> Verdict {
        let olds = old.intersection_branches();
        let news = new.intersection_branches();
        let kept = olds
            .iter()
            .all(|o| news.iter().any(|n| self.is_compatible(o, n, position)));
        let nothing_added = position == Position::Output
            || news
                .iter()
                .all(|n| olds.iter().any(|o| self.is_compatible(o, n, position)));
        Verdict::from_bool(kept && nothing_added)
    }
}

fn union_widened(old: &TypeExpr, new: &TypeExpr) -> bool {
    let TypeExpr::Union(branches) = new else {
        return false;
    };
    let olds = old.union_branches();
    olds.len() < branches.len() && olds.iter().all(|o| branches.contains(o))
}

/// Element type of `T[]`, `Array<T>`, `readonly T[]` or `ReadonlyArray<T>`,
/// and whether the array is readonly.
fn array_element(ty: &TypeExpr) -> Option<(&TypeExpr, bool)> {
    match ty {
        TypeExpr::Array(elem) => Some((elem, false)),
        TypeExpr::Reference { name, args } if args.len() == 1 => match name.as_str() {
            "Array" => args.first().map(|a| (a, false)),
            "ReadonlyArray" => args.first().map(|a| (a, true)),
            _ => None,
        },
        TypeExpr::Operator {
            op: TypeOperator::Readonly,
            operand,
        } => match operand.as_ref() {
            TypeExpr::Array(elem) => Some((elem, true)),
            _ => None,
        },
        _ => None,
    }
}

/// The tested arms of a conditional chain, following false branches. The
/// terminal fallback type is not an arm.
fn arms(cond: &Conditional) -> Vec<(&TypeExpr, &TypeExpr, &TypeExpr)> {
    let mut out = vec![(&cond.check, &cond.extends, &cond.true_type)];
    let mut next = &cond.false_type;
    while let TypeExpr::Conditional(c) = next {
        out.push((&c.check, &c.extends, &c.true_type));
        next = &c.false_type;
    }
    out
}

fn conditional_extended(old: &Conditional, new: &Conditional) -> bool {
    let old_arms = arms(old);
    let new_arms = arms(new);
    old.check == new.check
        && new_arms.len() > old_arms.len()
        && new_arms[..old_arms.len()] == old_arms[..]
}

fn removed_modifier(old: &Mapped, new: &Mapped) -> Option<MappedModifier> {
    let adds = |op: Option<ModifierOp>| op == Some(ModifierOp::Add);
    if adds(old.readonly) && !adds(new.readonly) {
        Some(MappedModifier::Readonly)
    } else if adds(old.optional) && !adds(new.optional) {
        Some(MappedModifier::Optional)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Document, Statement};
    use crate::config::DetectorConfig;
    use crate::parser::parse;

    fn docs(prev: &str, curr: &str) -> (Document, Document) {
        (
            parse("previous.d.ts", prev).unwrap(),
            parse("current.d.ts", curr).unwrap(),
        )
    }

    fn alias(doc: &Document, name: &str) -> TypeExpr {
        doc.statements
            .iter()
            .find_map(|s| match s {
                Statement::TypeAlias(a) if a.name == name => Some(a.ty.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn verdict(prev: &str, curr: &str, position: Position) -> Verdict {
        let (p, c) = docs(prev, curr);
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let oracle = Oracle::new(&ctx);
        oracle.verdict(&alias(&p, "T"), &alias(&c, "T"), position)
    }

    #[test]
    fn identical_types() {
        let v = verdict("type T = string[];", "type T = string[];", Position::Input);
        assert_eq!(v, Verdict::Identical);
    }

    #[test]
    fn union_widening_is_additive_for_inputs() {
        let v = verdict("type T = string[];", "type T = string[] | number[];", Position::Input);
        assert_eq!(v, Verdict::UnionWidened);
        assert!(v.is_additive());
    }

    #[test]
    fn union_widening_breaks_outputs() {
        let v = verdict("type T = string;", "type T = string | number;", Position::Output);
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn union_narrowing_breaks_inputs() {
        let v = verdict("type T = 'a' | 'b';", "type T = 'a';", Position::Input);
        assert_eq!(v, Verdict::Incompatible);
        let v = verdict("type T = 'a' | 'b';", "type T = 'a';", Position::Output);
        assert!(v.is_compatible());
    }

    #[test]
    fn array_to_non_array_breaks() {
        let v = verdict("type T = string[];", "type T = number;", Position::Input);
        assert_eq!(v, Verdict::Incompatible);
        let v = verdict("type T = string[];", "type T = any;", Position::Input);
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn array_elements_follow_position() {
        let v = verdict("type T = 'a'[];", "type T = string[];", Position::Input);
        assert_eq!(v, Verdict::Compatible);
        let v = verdict("type T = string[];", "type T = Array<string>;", Position::Input);
        assert_eq!(v, Verdict::Compatible);
        let v = verdict("type T = string[];", "type T = number[];", Position::Input);
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn readonly_arrays_are_arrays() {
        let v = verdict("type T = string[];", "type T = readonly string[];", Position::Input);
        assert_eq!(v, Verdict::Compatible);
        let v = verdict("type T = string[];", "type T = ReadonlyArray<'a' | string>;", Position::Input);
        assert_eq!(v, Verdict::Compatible);
        let v = verdict("type T = readonly string[];", "type T = readonly number[];", Position::Input);
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn readonly_array_mutability_follows_position() {
        let v = verdict("type T = readonly string[];", "type T = string[];", Position::Input);
        assert_eq!(v, Verdict::Incompatible);
        let v = verdict("type T = readonly string[];", "type T = string[];", Position::Output);
        assert_eq!(v, Verdict::Compatible);
        let v = verdict("type T = string[];", "type T = readonly string[];", Position::Output);
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn intersection_requirements() {
        let prev = "interface A { a: string }\ninterface B { b: string }\ntype T = A & B;";
        let widened = "interface A { a: string }\ninterface B { b: string }\ntype T = A & B & { c?: number };";
        assert_eq!(verdict(prev, widened, Position::Input), Verdict::Compatible);
        let added = "interface A { a: string }\ninterface B { b: string }\ntype T = A & B & { c: number };";
        assert_eq!(verdict(prev, added, Position::Input), Verdict::Incompatible);
        let v = verdict(prev, "interface A { a: string }\ninterface B { b: string }\ntype T = A;", Position::Input);
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn generic_arguments_compare_pairwise() {
        let v = verdict(
            "type T = Promise<'a'>;",
            "type T = Promise<string>;",
            Position::Input,
        );
        assert_eq!(v, Verdict::Compatible);
        let v = verdict(
            "type T = Map<string, number>;",
            "type T = Map<string, boolean>;",
            Position::Input,
        );
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn conditional_branches_appended() {
        let v = verdict(
            "type T<X> = X extends string ? 'string' : 'object';",
            "type T<X> = X extends string ? 'string' : X extends number ? 'number' : 'object';",
            Position::Input,
        );
        assert_eq!(v, Verdict::ConditionalExtended);
    }

    #[test]
    fn conditional_with_new_discriminant_is_not_an_extension() {
        let v = verdict(
            "type T<X> = X extends string ? 'string' : 'object';",
            "type T<X> = X extends number ? 'number' : X extends string ? 'string' : 'object';",
            Position::Input,
        );
        assert_ne!(v, Verdict::ConditionalExtended);
    }

    #[test]
    fn mapped_modifier_removal_breaks() {
        let v = verdict(
            "type T<X> = { readonly [P in keyof X]: X[P] };",
            "type T<X> = { [P in keyof X]: X[P] };",
            Position::Input,
        );
        assert_eq!(v, Verdict::ModifierRemoved(MappedModifier::Readonly));
        let v = verdict(
            "type T<X> = { [P in keyof X]?: X[P] };",
            "type T<X> = { [P in keyof X]-?: X[P] };",
            Position::Input,
        );
        assert_eq!(v, Verdict::ModifierRemoved(MappedModifier::Optional));
    }

    #[test]
    fn function_shapes_use_signature_rules() {
        let v = verdict(
            "type T = (a: string) => void;",
            "type T = (a: string, b?: number) => void;",
            Position::Input,
        );
        assert_eq!(v, Verdict::Compatible);
        let v = verdict(
            "type T = (a: string | null) => void;",
            "type T = (a: string) => void;",
            Position::Input,
        );
        assert_eq!(v, Verdict::Incompatible);
    }

    #[test]
    fn fallback_follows_position() {
        let v = verdict("type T = 'a';", "type T = string;", Position::Input);
        assert_eq!(v, Verdict::Compatible);
        let v = verdict("type T = 'a';", "type T = string;", Position::Output);
        assert_eq!(v, Verdict::Incompatible);
        let v = verdict("type T = string;", "type T = 'a';", Position::Output);
        assert_eq!(v, Verdict::Compatible);
    }
}
