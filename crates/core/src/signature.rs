//! Function signature comparison.
//!
//! Standalone functions, methods and callback-typed members all go through
//! [`compare_signatures`]. Parameters are supplied by the caller and compared
//! in input position; the return type is read and compared in output
//! position. The walk stops at the first breaking difference.

use crate::ast::{Param, Signature, TypeParam};
use crate::oracle::{Oracle, Position};
use crate::render::ArrowText;
use crate::report::ChangeRecord;

pub fn compare_signatures(
    oracle: &Oracle<'_, '_>,
    name: &str,
    old: &Signature,
    new: &Signature,
) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();
    // Type parameters are compared under the previous names; messages keep
    // the signatures as written.
    let renamed = new.with_type_param_names(&old.type_params);
    if old == &renamed {
        return changes;
    }
    let written = new;
    let new = &renamed;

    compare_type_params(oracle, name, &old.type_params, &new.type_params, &mut changes);

    if new.params.len() < old.params.len() {
        changes.push(ChangeRecord::breaking(format!(
            "Removed parameters from function {}",
            name
        )));
        return changes;
    }

    for (op, np) in old.params.iter().zip(&new.params) {
        if !param_compatible(oracle, op, np) {
            changes.push(ChangeRecord::breaking(format!(
                "Changed function signature of {}: {} is not assignable to {}",
                name,
                ArrowText(old),
                ArrowText(written)
            )));
            return changes;
        }
    }

    if !oracle.is_compatible(&old.ret, &new.ret, Position::Output) {
        changes.push(ChangeRecord::breaking(format!(
            "Changed return type of function {}: {} is not assignable to {}",
            name, old.ret, written.ret
        )));
        return changes;
    }

    let added = &new.params[old.params.len()..];
    if added.iter().all(Param::is_omittable) {
        for param in added {
            changes.push(ChangeRecord::additive(format!(
                "Added optional parameter {} to function {}",
                param.name, name
            )));
        }
    } else {
        changes.push(ChangeRecord::breaking(format!(
            "Added required parameters to function {}",
            name
        )));
    }
    changes
}

fn param_compatible(oracle: &Oracle<'_, '_>, old: &Param, new: &Param) -> bool {
    if old.rest != new.rest || (old.is_omittable() && !new.is_omittable()) {
        return false;
    }
    oracle.is_compatible(&old.ty, &new.ty, Position::Input)
}

/// Pairwise constraint checks, then arity.
fn compare_type_params(
    oracle: &Oracle<'_, '_>,
    name: &str,
    old: &[TypeParam],
    new: &[TypeParam],
    changes: &mut Vec<ChangeRecord>,
) {
    for (op, np) in old.iter().zip(new) {
        match (&op.constraint, &np.constraint) {
            (None, Some(_)) => changes.push(ChangeRecord::breaking(format!(
                "Added type constraint to generic parameter {} in function {}",
                op.name, name
            ))),
            (Some(oc), Some(nc)) if !oracle.is_compatible(oc, nc, Position::Input) => {
                changes.push(ChangeRecord::breaking(format!(
                    "Changed type constraint on generic parameter {} in function {}",
                    op.name, name
                )))
            }
            _ => {}
        }
    }
    if old.len() > new.len() {
        changes.push(ChangeRecord::breaking(format!(
            "Removed generic type parameters from function {}",
            name
        )));
    } else if old.len() < new.len() {
        changes.push(ChangeRecord::breaking(format!(
            "Added generic type parameters to function {}",
            name
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Document, Statement};
    use crate::config::DetectorConfig;
    use crate::parser::parse;
    use crate::resolve::ResolutionContext;

    fn function(doc: &Document) -> &Signature {
        doc.statements
            .iter()
            .find_map(|s| match s {
                Statement::Function(f) => Some(&f.signature),
                _ => None,
            })
            .unwrap()
    }

    fn compare(prev: &str, curr: &str) -> Vec<String> {
        let p = parse("previous.d.ts", prev).unwrap();
        let c = parse("current.d.ts", curr).unwrap();
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let oracle = Oracle::new(&ctx);
        compare_signatures(&oracle, "f", function(&p), function(&c))
            .iter()
            .map(|r| r.to_string())
            .collect()
    }

    #[test]
    fn identical_signatures_report_nothing() {
        let src = "declare function f(a: string): void;";
        assert!(compare(src, src).is_empty());
    }

    #[test]
    fn renamed_parameter_is_not_a_change() {
        let changes = compare(
            "declare function f(a: string): void;",
            "declare function f(b: string): void;",
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn removed_parameters_stop_the_walk() {
        let changes = compare(
            "declare function f(a: string, b: number): void;",
            "declare function f(a: number): string;",
        );
        assert_eq!(changes, vec!["BREAKING: Removed parameters from function f"]);
    }

    #[test]
    fn narrowed_parameter_quotes_both_signatures() {
        let changes = compare(
            "declare function f(a: string | number): void;",
            "declare function f(a: string): void;",
        );
        assert_eq!(
            changes,
            vec![
                "BREAKING: Changed function signature of f: (a: string | number) => void is not assignable to (a: string) => void"
            ]
        );
    }

    #[test]
    fn optional_parameter_made_required_breaks() {
        let changes = compare(
            "declare function f(a?: string): void;",
            "declare function f(a: string): void;",
        );
        assert_eq!(changes.len(), 1);
        assert!(changes[0].starts_with("BREAKING: Changed function signature of f"));
    }

    #[test]
    fn widened_return_type_breaks() {
        let changes = compare(
            "declare function f(): string;",
            "declare function f(): string | undefined;",
        );
        assert_eq!(
            changes,
            vec!["BREAKING: Changed return type of function f: string is not assignable to string | undefined"]
        );
    }

    #[test]
    fn narrowed_return_type_is_safe() {
        let changes = compare(
            "declare function f(): string | undefined;",
            "declare function f(): string;",
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn added_optional_parameters_are_listed() {
        let changes = compare(
            "declare function f(a: string): void;",
            "declare function f(a: string, b?: number, ...rest: string[]): void;",
        );
        assert_eq!(
            changes,
            vec![
                "MINOR: Added optional parameter b to function f",
                "MINOR: Added optional parameter rest to function f",
            ]
        );
    }

    #[test]
    fn added_required_parameter_is_one_record() {
        let changes = compare(
            "declare function f(a: string): void;",
            "declare function f(a: string, b?: number, c: boolean): void;",
        );
        assert_eq!(changes, vec!["BREAKING: Added required parameters to function f"]);
    }

    #[test]
    fn generic_constraint_added() {
        let changes = compare(
            "declare function f<T, U>(input: T): U;",
            "declare function f<T, U extends object>(input: T): U;",
        );
        assert_eq!(
            changes,
            vec!["BREAKING: Added type constraint to generic parameter U in function f"]
        );
    }

    #[test]
    fn renamed_type_parameters_are_not_a_change() {
        let changes = compare(
            "declare function f<T>(x: T): T;",
            "declare function f<U>(x: U): U;",
        );
        assert!(changes.is_empty());
        let changes = compare(
            "declare function f<T, K extends keyof T>(obj: T, key: K): T[K];",
            "declare function f<O, P extends keyof O>(obj: O, key: P): O[P];",
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn renamed_type_parameter_still_compares_constraints() {
        let changes = compare(
            "declare function f<T extends string | number>(x: T): void;",
            "declare function f<U extends string>(x: U): void;",
        );
        assert_eq!(
            changes,
            vec!["BREAKING: Changed type constraint on generic parameter T in function f"]
        );
    }

    #[test]
    fn generic_constraint_tightened_and_arity() {
        let changes = compare(
            "declare function f<T extends string | number>(x: T): void;",
            "declare function f<T extends string>(x: T): void;",
        );
        assert_eq!(
            changes,
            vec!["BREAKING: Changed type constraint on generic parameter T in function f"]
        );
        let changes = compare(
            "declare function f<T>(x: T): void;",
            "declare function f<T, U>(x: T): void;",
        );
        assert_eq!(changes, vec!["BREAKING: Added generic type parameters to function f"]);
    }
}
