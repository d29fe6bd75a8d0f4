//! Declaration collection.
//!
//! Walks a document (namespaces included) and extracts its named
//! declarations in order of first occurrence. A name seen again keeps its
//! original position: repeated interfaces merge their members, overloaded
//! functions and methods keep their first signature, and a repeated alias is
//! replaced by the later declaration.

use std::collections::HashMap;

use crate::ast::{
    AliasDecl, Document, FunctionDecl, Member, ObjectShape, RecordDecl, RecordKind, Statement,
};
use crate::config::IgnoreSet;

// ──────────────────────────────────────────────
// Insertion-ordered map
// ──────────────────────────────────────────────

/// Name-keyed map that iterates in insertion order.
#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        OrderedMap {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced entry keeps its position.
    pub fn insert(&mut self, key: String, value: V) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ──────────────────────────────────────────────
// Collectors
// ──────────────────────────────────────────────

/// Visit every declaration statement, descending into namespaces.
fn walk<'d>(statements: &'d [Statement], visit: &mut impl FnMut(&'d Statement)) {
    for stmt in statements {
        match stmt {
            Statement::Namespace(ns) => walk(&ns.body, visit),
            other => visit(other),
        }
    }
}

/// Interfaces and classes by name.
pub fn collect_structured_records(doc: &Document, ignore: &IgnoreSet) -> OrderedMap<RecordDecl> {
    let mut out: OrderedMap<RecordDecl> = OrderedMap::new();
    walk(&doc.statements, &mut |stmt| {
        let Statement::Record(decl) = stmt else {
            return;
        };
        if decl.name.is_empty() || ignore.is_ignored(&decl.name) {
            return;
        }
        let mergeable = matches!(
            out.get(&decl.name),
            Some(existing) if existing.kind == RecordKind::Interface
                && decl.kind == RecordKind::Interface
        );
        if !mergeable {
            out.insert(decl.name.clone(), decl.clone());
        } else if let Some(existing) = out.get_mut(&decl.name) {
            merge_interface(existing, decl);
        }
    });
    out
}

/// Declaration merging: later members override same-named earlier ones in
/// place, new ones are appended.
fn merge_interface(existing: &mut RecordDecl, later: &RecordDecl) {
    existing.exported |= later.exported;
    if existing.type_params.is_empty() {
        existing.type_params = later.type_params.clone();
    }
    existing.heritage.extend(later.heritage.iter().cloned());
    for member in &later.body.members {
        match existing
            .body
            .members
            .iter_mut()
            .find(|m| m.name == member.name)
        {
            Some(slot) => *slot = member.clone(),
            None => existing.body.members.push(member.clone()),
        }
    }
    existing.body.index.extend(later.body.index.iter().cloned());
    existing.body.calls.extend(later.body.calls.iter().cloned());
}

/// Type aliases by name, with their export flags.
pub fn collect_type_aliases(doc: &Document, ignore: &IgnoreSet) -> OrderedMap<AliasDecl> {
    let mut out = OrderedMap::new();
    walk(&doc.statements, &mut |stmt| {
        if let Statement::TypeAlias(decl) = stmt {
            if !decl.name.is_empty() && !ignore.is_ignored(&decl.name) {
                out.insert(decl.name.clone(), decl.clone());
            }
        }
    });
    out
}

/// Function declarations by name. Of several overloads the first one is the
/// compared signature.
pub fn collect_functions(doc: &Document, ignore: &IgnoreSet) -> OrderedMap<FunctionDecl> {
    let mut out = OrderedMap::new();
    walk(&doc.statements, &mut |stmt| {
        if let Statement::Function(decl) = stmt {
            if decl.name.is_empty() || out.contains_key(&decl.name) {
                return;
            }
            if !ignore.is_ignored(&decl.name) {
                out.insert(decl.name.clone(), decl.clone());
            }
        }
    });
    out
}

/// Named members of a structured record.
pub fn collect_members(decl: &RecordDecl) -> OrderedMap<Member> {
    collect_shape_members(&decl.body)
}

/// Named members of any object shape, inline object types included. An
/// overloaded method is represented by its first signature.
pub fn collect_shape_members(shape: &ObjectShape) -> OrderedMap<Member> {
    let mut out = OrderedMap::new();
    for member in &shape.members {
        if !member.name.is_empty() && !out.contains_key(&member.name) {
            out.insert(member.name.clone(), member.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::parser::parse;

    fn doc(src: &str) -> Document {
        parse("test.d.ts", src).expect("document should parse")
    }

    #[test]
    fn ordered_map_keeps_first_position_on_replace() {
        let mut m = OrderedMap::new();
        m.insert("b".to_string(), 1);
        m.insert("a".to_string(), 2);
        m.insert("b".to_string(), 3);
        let items: Vec<(&str, &i32)> = m.iter().collect();
        assert_eq!(items, vec![("b", &3), ("a", &2)]);
    }

    #[test]
    fn records_are_collected_through_namespaces_in_order() {
        let d = doc(
            "interface B { x: string }\n\
             export namespace NS { export interface A { y: number } }\n\
             declare class C { z: boolean }",
        );
        let records = collect_structured_records(&d, &IgnoreSet::default());
        let names: Vec<&str> = records.keys().collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn repeated_interfaces_merge_members() {
        let d = doc(
            "interface Config { a: string; b: number }\n\
             interface Other { }\n\
             interface Config { b: string; c?: boolean }",
        );
        let records = collect_structured_records(&d, &IgnoreSet::default());
        assert_eq!(records.keys().collect::<Vec<_>>(), vec!["Config", "Other"]);
        let members = collect_members(records.get("Config").unwrap());
        let names: Vec<&str> = members.keys().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(members.get("b").unwrap().ty.to_string(), "string");
    }

    #[test]
    fn ignore_patterns_filter_all_kinds() {
        let d = doc(
            "interface InternalState { x: string }\n\
             type InternalAlias = string;\n\
             declare function internalHelper(): void;\n\
             type Public = number;",
        );
        let config = DetectorConfig {
            ignore_patterns: vec!["^[Ii]nternal".into()],
            globals: vec![],
        };
        let ignore = config.ignore_set().unwrap();
        assert!(collect_structured_records(&d, &ignore).is_empty());
        assert!(collect_functions(&d, &ignore).is_empty());
        let aliases = collect_type_aliases(&d, &ignore);
        assert_eq!(aliases.keys().collect::<Vec<_>>(), vec!["Public"]);
    }

    #[test]
    fn first_function_overload_is_kept() {
        let d = doc(
            "declare function f(a: string): void;\ndeclare function f(a: number): void;",
        );
        let fns = collect_functions(&d, &IgnoreSet::default());
        assert_eq!(fns.len(), 1);
        assert_eq!(
            fns.get("f").unwrap().signature.params[0].ty.to_string(),
            "string"
        );
    }

    #[test]
    fn first_method_overload_is_kept() {
        let d = doc("interface Api { get(id: string): void; get(id: number): void; }");
        let records = collect_structured_records(&d, &IgnoreSet::default());
        let members = collect_members(records.get("Api").unwrap());
        assert_eq!(members.len(), 1);
        assert_eq!(members.get("get").unwrap().ty.to_string(), "(id: string) => void");
    }
}
