//! Change classification.
//!
//! Drives one document-pair comparison in three phases: structured records,
//! then type aliases, then functions. Each phase finishes before the next
//! starts and, within a phase, records follow declaration order. The
//! emitted records are aggregated into a [`ChangeReport`].

use tracing::{debug, info_span};

use crate::ast::{AliasDecl, Document, FunctionDecl, Member, ObjectShape, RecordDecl, TypeExpr, TypeParam};
use crate::collect::{
    collect_functions, collect_shape_members, collect_structured_records, collect_type_aliases,
    OrderedMap,
};
use crate::config::DetectorConfig;
use crate::error::DetectError;
use crate::oracle::{Oracle, Position, Verdict};
use crate::report::{ChangeRecord, ChangeReport};
use crate::resolve::ResolutionContext;
use crate::signature::compare_signatures;

/// Compare two parsed documents.
///
/// Unresolvable named references fail the whole run before any record is
/// produced; every ordinary difference becomes a change record.
pub fn detect_changes(
    previous: &Document,
    current: &Document,
    config: &DetectorConfig,
) -> Result<ChangeReport, DetectError> {
    let _span = info_span!("detect_changes", previous = %previous.name, current = %current.name)
        .entered();
    let ignore = config.ignore_set()?;
    let ctx = ResolutionContext::new(previous, current, config);
    ctx.check_references()?;

    let mut classifier = Classifier {
        oracle: Oracle::new(&ctx),
        records: Vec::new(),
    };

    classifier.structured_records(
        &collect_structured_records(previous, &ignore),
        &collect_structured_records(current, &ignore),
    );
    debug!(records = classifier.records.len(), "structured records compared");

    classifier.type_aliases(
        &collect_type_aliases(previous, &ignore),
        &collect_type_aliases(current, &ignore),
    );
    debug!(records = classifier.records.len(), "type aliases compared");

    classifier.functions(
        &collect_functions(previous, &ignore),
        &collect_functions(current, &ignore),
    );
    debug!(records = classifier.records.len(), "functions compared");

    let report = ChangeReport::from_records(&classifier.records);
    debug!(change_type = %report.change_type, "classification complete");
    Ok(report)
}

struct Classifier<'c, 'd> {
    oracle: Oracle<'c, 'd>,
    records: Vec<ChangeRecord>,
}

impl Classifier<'_, '_> {
    fn breaking(&mut self, text: String) {
        self.records.push(ChangeRecord::breaking(text));
    }

    fn additive(&mut self, text: String) {
        self.records.push(ChangeRecord::additive(text));
    }

    // -- Structured records ---------------------------------------

    fn structured_records(&mut self, prev: &OrderedMap<RecordDecl>, curr: &OrderedMap<RecordDecl>) {
        for (name, decl) in prev.iter() {
            if !curr.contains_key(name) {
                self.breaking(format!("Removed {} {}", decl.kind.label(), name));
            }
        }
        for (name, decl) in curr.iter() {
            match prev.get(name) {
                None => self.additive(format!("Added new {} {}", decl.kind.label(), name)),
                Some(old) => {
                    let owner = format!("{} {}", decl.kind.label(), name);
                    let decl = decl.with_type_param_names(&old.type_params);
                    self.type_params(&owner, &old.type_params, &decl.type_params);
                    self.members(&owner, &old.body, &decl.body);
                }
            }
        }
    }

    /// `owner` is the rendered container, e.g. `interface Config` or
    /// `interface Config.settings` for an inline object member.
    fn members(&mut self, owner: &str, old: &ObjectShape, new: &ObjectShape) {
        let old_members = collect_shape_members(old);
        let new_members = collect_shape_members(new);

        for (name, o) in old_members.iter() {
            let Some(n) = new_members.get(name) else {
                self.breaking(format!("Removed member {} from {}", name, owner));
                continue;
            };
            if o.optional && !n.optional {
                self.breaking(format!(
                    "Changed member {} in {} from optional to required",
                    name, owner
                ));
            }
            if o.readonly && !n.readonly {
                self.breaking(format!(
                    "Removed readonly modifier from property {} in {}",
                    name, owner
                ));
            } else if !o.readonly && n.readonly {
                self.breaking(format!(
                    "Added readonly modifier to property {} in {}",
                    name, owner
                ));
            }
            self.member_type(owner, o, n);
        }

        for (name, n) in new_members.iter() {
            if old_members.contains_key(name) {
                continue;
            }
            if n.ty.is_function() {
                self.additive(format!("Added new function {} to {}", name, owner));
            } else if n.optional {
                self.additive(format!("Added optional member {} to {}", name, owner));
            } else {
                self.breaking(format!("Added required member {} to {}", name, owner));
            }
        }
    }

    fn member_type(&mut self, owner: &str, old: &Member, new: &Member) {
        if old.ty == new.ty {
            return;
        }
        let name = &old.name;
        if let (TypeExpr::Object(os), TypeExpr::Object(ns)) = (&old.ty, &new.ty) {
            self.members(&format!("{}.{}", owner, name), os, ns);
            return;
        }
        if let (Some(os), Some(ns)) = (old.ty.as_function(), new.ty.as_function()) {
            let changes = compare_signatures(&self.oracle, name, os, ns);
            self.records.extend(changes);
            return;
        }
        match self.oracle.verdict(&old.ty, &new.ty, Position::Input) {
            Verdict::Identical | Verdict::Compatible => {}
            Verdict::UnionWidened => self.additive(format!(
                "Added a union type of member {} in {}: {} to {}",
                name, owner, old.ty, new.ty
            )),
            Verdict::ConditionalExtended => self.additive(format!(
                "Added conditional branches to member {} in {}",
                name, owner
            )),
            Verdict::ModifierRemoved(_) => self.breaking(format!(
                "Changed mapped type of member {} in {}: {} to {}",
                name, owner, old.ty, new.ty
            )),
            Verdict::Incompatible => self.breaking(format!(
                "Changed type of member {} in {}: {} is not assignable to {}",
                name, owner, old.ty, new.ty
            )),
        }
    }

    /// Generic parameters of interfaces, classes and aliases.
    fn type_params(&mut self, owner: &str, old: &[TypeParam], new: &[TypeParam]) {
        for (op, np) in old.iter().zip(new) {
            match (&op.constraint, &np.constraint) {
                (None, Some(c)) => self.breaking(format!(
                    "Added constraint {} to generic parameter {} in {}",
                    c, op.name, owner
                )),
                (Some(oc), Some(nc)) if !self.oracle.is_compatible(oc, nc, Position::Input) => {
                    self.breaking(format!(
                        "Changed constraint of generic parameter {} in {}: {} to {}",
                        op.name, owner, oc, nc
                    ))
                }
                _ => {}
            }
        }
        if old.len() > new.len() {
            self.breaking(format!("Removed generic type parameters from {}", owner));
        } else if old.len() < new.len() {
            self.breaking(format!("Added generic type parameters to {}", owner));
        }
    }

    // -- Type aliases ---------------------------------------------

    fn type_aliases(&mut self, prev: &OrderedMap<AliasDecl>, curr: &OrderedMap<AliasDecl>) {
        for name in prev.keys() {
            if !curr.contains_key(name) {
                self.breaking(format!("Removed type {}", name));
            }
        }
        for (name, decl) in curr.iter() {
            let Some(old) = prev.get(name) else {
                self.additive(format!("Added new type {}", name));
                continue;
            };
            let decl = decl.with_type_param_names(&old.type_params);
            self.type_params(&format!("type {}", name), &old.type_params, &decl.type_params);
            match self.oracle.verdict(&old.ty, &decl.ty, Position::Input) {
                Verdict::Identical | Verdict::Compatible => {}
                Verdict::UnionWidened => {
                    self.additive(format!("Added union type option to type {}", name))
                }
                Verdict::ConditionalExtended => {
                    self.additive(format!("Added conditional branches to type {}", name))
                }
                Verdict::ModifierRemoved(_) => {
                    self.breaking(format!("Changed mapped type definition in type {}", name))
                }
                Verdict::Incompatible => self.breaking(format!(
                    "Changed type definition of {}: {} is not assignable to {}",
                    name, old.ty, decl.ty
                )),
            }
            if !old.exported && decl.exported {
                self.additive(format!("Made type {} exported", name));
            } else if old.exported && !decl.exported {
                self.breaking(format!("Made type {} no longer exported", name));
            }
        }
    }

    // -- Functions ------------------------------------------------

    fn functions(&mut self, prev: &OrderedMap<FunctionDecl>, curr: &OrderedMap<FunctionDecl>) {
        for name in prev.keys() {
            if !curr.contains_key(name) {
                self.breaking(format!("Removed function {}", name));
            }
        }
        for (name, decl) in curr.iter() {
            match prev.get(name) {
                None => self.additive(format!("Added new function {}", name)),
                Some(old) => {
                    let changes =
                        compare_signatures(&self.oracle, name, &old.signature, &decl.signature);
                    self.records.extend(changes);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::report::ChangeType;

    fn detect(prev: &str, curr: &str) -> ChangeReport {
        let p = parse("previous.d.ts", prev).unwrap();
        let c = parse("current.d.ts", curr).unwrap();
        detect_changes(&p, &c, &DetectorConfig::default()).unwrap()
    }

    #[test]
    fn added_interface_is_minor() {
        let report = detect(
            "interface Config { items: string[] }",
            "interface Config { items: string[] }\ninterface Baz { qux: number }",
        );
        assert_eq!(report.change_type, ChangeType::Minor);
        assert_eq!(report.changes, vec!["MINOR: Added new interface Baz"]);
    }

    #[test]
    fn optionality_then_union_widening() {
        let report = detect(
            "interface Config { items?: string[] }",
            "interface Config { items: string[] | number[] }",
        );
        assert_eq!(report.change_type, ChangeType::Major);
        assert_eq!(
            report.changes,
            vec![
                "BREAKING: Changed member items in interface Config from optional to required",
                "MINOR: Added a union type of member items in interface Config: string[] to string[] | number[]",
            ]
        );
    }

    #[test]
    fn removed_and_added_members() {
        let report = detect(
            "interface A { a: string; b: number }",
            "interface A { a: string; c?: number; d: boolean; e(): void }",
        );
        assert_eq!(
            report.changes,
            vec![
                "BREAKING: Removed member b from interface A",
                "MINOR: Added optional member c to interface A",
                "BREAKING: Added required member d to interface A",
                "MINOR: Added new function e to interface A",
            ]
        );
    }

    #[test]
    fn readonly_transitions_break_both_ways() {
        let report = detect(
            "interface D { readonly id: string; title: string }",
            "interface D { id: string; readonly title: string }",
        );
        assert_eq!(
            report.changes,
            vec![
                "BREAKING: Removed readonly modifier from property id in interface D",
                "BREAKING: Added readonly modifier to property title in interface D",
            ]
        );
    }

    #[test]
    fn nested_objects_recurse_with_qualified_owner() {
        let report = detect(
            "interface Config { settings: { theme: string } }",
            "interface Config { settings: { theme: string; darkMode?: boolean } }",
        );
        assert_eq!(
            report.changes,
            vec!["MINOR: Added optional member darkMode to interface Config.settings"]
        );
    }

    #[test]
    fn method_changes_use_member_name() {
        let report = detect(
            "interface Api { fetch(id: string): void }",
            "interface Api { fetch(id: string, retries?: number): void }",
        );
        assert_eq!(
            report.changes,
            vec!["MINOR: Added optional parameter retries to function fetch"]
        );
    }

    #[test]
    fn interface_generic_constraints() {
        let report = detect(
            "interface Box<T> { value: T }",
            "interface Box<T extends object> { value: T }",
        );
        assert_eq!(
            report.changes,
            vec!["BREAKING: Added constraint object to generic parameter T in interface Box"]
        );
    }

    #[test]
    fn renamed_type_parameters_are_patch() {
        let report = detect("interface Box<T> { v: T }", "interface Box<U> { v: U }");
        assert_eq!(report.change_type, ChangeType::Patch);
        assert!(report.changes.is_empty());

        let report = detect(
            "type Pair<A, B> = { first: A; second: B[] };",
            "type Pair<L, R> = { first: L; second: R[] };",
        );
        assert_eq!(report.change_type, ChangeType::Patch);

        let report = detect(
            "declare function f<T>(x: T): T;",
            "declare function f<U>(x: U): U;",
        );
        assert_eq!(report.change_type, ChangeType::Patch);
    }

    #[test]
    fn renamed_type_parameter_with_changed_member_breaks() {
        let report = detect("interface Box<T> { v: T }", "interface Box<U> { v: U[] }");
        assert_eq!(
            report.changes,
            vec!["BREAKING: Changed type of member v in interface Box: T is not assignable to T[]"]
        );
    }

    #[test]
    fn appended_overloads_are_patch() {
        let report = detect(
            "declare function f(a: string): void;",
            "declare function f(a: string): void;\ndeclare function f(a: number): void;",
        );
        assert_eq!(report.change_type, ChangeType::Patch);

        let report = detect(
            "interface Api { get(id: string): void }",
            "interface Api { get(id: string): void; get(id: number): void }",
        );
        assert_eq!(report.change_type, ChangeType::Patch);
    }

    #[test]
    fn readonly_array_member_accepts_mutable_arrays() {
        let report = detect("interface A { x: string[] }", "interface A { x: readonly string[] }");
        assert_eq!(report.change_type, ChangeType::Patch);
        let report = detect("interface A { x: readonly string[] }", "interface A { x: string[] }");
        assert_eq!(report.change_type, ChangeType::Major);
    }

    #[test]
    fn alias_export_is_reported_after_type_changes() {
        let report = detect(
            "type Internal = { value: string };",
            "export type Internal = { value: string };",
        );
        assert_eq!(report.changes, vec!["MINOR: Made type Internal exported"]);
        let report = detect("export type Id = string;", "type Id = string;");
        assert_eq!(report.changes, vec!["BREAKING: Made type Id no longer exported"]);
    }

    #[test]
    fn phases_run_in_order() {
        let report = detect(
            "declare function f(): void;\ntype A = string;\ninterface I { x: string }",
            "declare function g(): void;\ntype B = string;\ninterface J { x: string }",
        );
        assert_eq!(
            report.changes,
            vec![
                "BREAKING: Removed interface I",
                "MINOR: Added new interface J",
                "BREAKING: Removed type A",
                "MINOR: Added new type B",
                "BREAKING: Removed function f",
                "MINOR: Added new function g",
            ]
        );
    }

    #[test]
    fn unresolved_reference_aborts() {
        let p = parse("previous.d.ts", "interface A { x: string }").unwrap();
        let c = parse("current.d.ts", "interface A { x: Missing }").unwrap();
        let err = detect_changes(&p, &c, &DetectorConfig::default()).unwrap_err();
        assert!(matches!(err, DetectError::Resolution { .. }));
    }
}
