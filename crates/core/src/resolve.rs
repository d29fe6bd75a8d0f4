//! Per-run resolution context.
//!
//! Indexes both documents of one comparison, rejects unresolvable type
//! references before any diffing, and answers the structural assignability
//! question the compatibility oracle builds on. A context is built fresh for
//! every document pair and never reused.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::ast::{
    AliasDecl, Document, Keyword, Literal, ObjectShape, Param, RecordDecl, Signature, Statement,
    TupleElement, TypeExpr, TypeOperator, TypeParam,
};
use crate::config::DetectorConfig;
use crate::error::DetectError;
use crate::frontend::FrontEnd;

/// Expansion depth past which a comparison is assumed to hold.
const MAX_DEPTH: usize = 64;

/// Which document of the pair a type expression came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Previous,
    Current,
}

// ──────────────────────────────────────────────
// Symbol tables
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
struct SymbolTable<'d> {
    /// Record declarations by simple and namespace-qualified name. Repeated
    /// interface blocks stay separate entries and merge on expansion.
    records: HashMap<String, Vec<&'d RecordDecl>>,
    aliases: HashMap<String, &'d AliasDecl>,
    imports: HashSet<String>,
    namespaces: HashSet<String>,
}

impl<'d> SymbolTable<'d> {
    fn build(doc: &'d Document) -> Self {
        let mut table = SymbolTable::default();
        table.index(&doc.statements, "");
        table
    }

    fn index(&mut self, statements: &'d [Statement], prefix: &str) {
        for stmt in statements {
            match stmt {
                Statement::Record(r) => {
                    for key in qualified(prefix, &r.name) {
                        self.records.entry(key).or_default().push(r);
                    }
                }
                Statement::TypeAlias(a) => {
                    for key in qualified(prefix, &a.name) {
                        self.aliases.insert(key, a);
                    }
                }
                Statement::Namespace(ns) => {
                    // `namespace A.B` makes both `A` and `A.B` resolvable heads.
                    if let Some(head) = ns.name.split('.').next() {
                        self.namespaces.insert(head.to_owned());
                    }
                    self.namespaces.insert(ns.name.clone());
                    let inner = if prefix.is_empty() {
                        ns.name.clone()
                    } else {
                        format!("{}.{}", prefix, ns.name)
                    };
                    self.index(&ns.body, &inner);
                }
                Statement::Import(i) => self.imports.extend(i.names.iter().cloned()),
                Statement::Function(_) | Statement::Variable(_) => {}
            }
        }
    }

    fn declares(&self, name: &str) -> bool {
        self.records.contains_key(name) || self.aliases.contains_key(name)
    }
}

fn qualified(prefix: &str, name: &str) -> Vec<String> {
    if prefix.is_empty() {
        vec![name.to_owned()]
    } else {
        vec![name.to_owned(), format!("{}.{}", prefix, name)]
    }
}

fn head(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

// ──────────────────────────────────────────────
// Context
// ──────────────────────────────────────────────

pub struct ResolutionContext<'d> {
    previous_doc: &'d Document,
    current_doc: &'d Document,
    previous: SymbolTable<'d>,
    current: SymbolTable<'d>,
    extra_globals: HashSet<String>,
    /// Comparisons currently being proven; revisiting one holds coinductively.
    assumptions: RefCell<HashSet<String>>,
    depth: Cell<usize>,
}

impl<'d> ResolutionContext<'d> {
    pub fn new(previous: &'d Document, current: &'d Document, config: &DetectorConfig) -> Self {
        ResolutionContext {
            previous_doc: previous,
            current_doc: current,
            previous: SymbolTable::build(previous),
            current: SymbolTable::build(current),
            extra_globals: config.globals.iter().cloned().collect(),
            assumptions: RefCell::new(HashSet::new()),
            depth: Cell::new(0),
        }
    }

    fn table(&self, side: Side) -> &SymbolTable<'d> {
        match side {
            Side::Previous => &self.previous,
            Side::Current => &self.current,
        }
    }

    // -- Reference checking -------------------------------------

    /// Fail on the first named reference in either document that resolves to
    /// nothing: not a declaration, type parameter, import, namespace, builtin
    /// or configured global.
    pub fn check_references(&self) -> Result<(), DetectError> {
        for (doc, side) in [
            (self.previous_doc, Side::Previous),
            (self.current_doc, Side::Current),
        ] {
            let checker = RefChecker {
                ctx: self,
                side,
                file: &doc.name,
            };
            checker.statements(&doc.statements)?;
        }
        Ok(())
    }

    fn is_known(&self, side: Side, name: &str, scope: &[String]) -> bool {
        if name.starts_with("import(") || name == "this" {
            return true;
        }
        let h = head(name);
        let table = self.table(side);
        scope.iter().any(|s| s == h)
            || table.declares(name)
            || table.declares(h)
            || table.imports.contains(h)
            || table.namespaces.contains(h)
            || FrontEnd::get().is_global(name)
            || self.extra_globals.contains(h)
    }

    // -- Expansion ----------------------------------------------

    /// One step of reference expansion: aliases to their (instantiated)
    /// bodies, records to object shapes, `Array<T>` to `T[]`.
    pub fn expand(&self, ty: &TypeExpr, side: Side) -> Option<TypeExpr> {
        let TypeExpr::Reference { name, args } = ty else {
            return None;
        };
        match (name.as_str(), args.as_slice()) {
            ("Array", [el]) => return Some(TypeExpr::Array(Box::new(el.clone()))),
            ("ReadonlyArray", [el]) => {
                return Some(TypeExpr::Operator {
                    op: TypeOperator::Readonly,
                    operand: Box::new(TypeExpr::Array(Box::new(el.clone()))),
                })
            }
            _ => {}
        }
        let table = self.table(side);
        if let Some(alias) = table.aliases.get(name.as_str()) {
            let bindings = bind(&alias.type_params, args);
            return Some(alias.ty.substitute(&bindings));
        }
        if table.records.contains_key(name.as_str()) {
            return self
                .record_shape(name, args, side, 0)
                .map(TypeExpr::Object);
        }
        None
    }

    /// Members of a record with inherited members from `extends` bases;
    /// own members override inherited ones.
    fn record_shape(
        &self,
        name: &str,
        args: &[TypeExpr],
        side: Side,
        depth: usize,
    ) -> Option<ObjectShape> {
        if depth > 16 {
            return None;
        }
        let decls = self.table(side).records.get(name)?;
        let mut shape = ObjectShape::default();
        for decl in decls {
            let bindings = bind(&decl.type_params, args);
            for base in &decl.heritage {
                let base = base.substitute(&bindings);
                if let TypeExpr::Reference { name: bn, args: ba } = &base {
                    let inherited = if self.table(side).records.contains_key(bn.as_str()) {
                        self.record_shape(bn, ba, side, depth + 1)
                    } else {
                        match self.expand(&base, side) {
                            Some(TypeExpr::Object(s)) => Some(s),
                            _ => None,
                        }
                    };
                    if let Some(inherited) = inherited {
                        overlay(&mut shape, inherited);
                    }
                }
            }
            overlay(&mut shape, decl.body.substitute(&bindings));
        }
        Some(shape)
    }

    // -- Assignability ------------------------------------------

    /// Whether a value of `source` (from `source_side`) may be used where
    /// `target` (from `target_side`) is expected.
    pub fn assignable(
        &self,
        source: &TypeExpr,
        source_side: Side,
        target: &TypeExpr,
        target_side: Side,
    ) -> bool {
        self.assign(source, source_side, target, target_side)
    }

    fn assume(
        &self,
        s: &TypeExpr,
        ss: Side,
        t: &TypeExpr,
        ts: Side,
        prove: impl FnOnce() -> bool,
    ) -> bool {
        let key = format!("{:?}:{}=>{:?}:{}", ss, s, ts, t);
        if self.depth.get() >= MAX_DEPTH || self.assumptions.borrow().contains(&key) {
            return true;
        }
        self.assumptions.borrow_mut().insert(key.clone());
        self.depth.set(self.depth.get() + 1);
        let result = prove();
        self.depth.set(self.depth.get() - 1);
        self.assumptions.borrow_mut().remove(&key);
        result
    }

    fn assign(&self, s: &TypeExpr, ss: Side, t: &TypeExpr, ts: Side) -> bool {
        if s == t {
            return true;
        }
        match t {
            TypeExpr::Keyword(Keyword::Any) | TypeExpr::Keyword(Keyword::Unknown) => return true,
            _ => {}
        }
        match s {
            TypeExpr::Keyword(Keyword::Never) => return true,
            TypeExpr::Keyword(Keyword::Any) => return false,
            _ => {}
        }

        if let TypeExpr::Union(branches) = s {
            return branches.iter().all(|b| self.assign(b, ss, t, ts));
        }
        if let TypeExpr::Intersection(branches) = t {
            return branches.iter().all(|b| self.assign(s, ss, b, ts));
        }
        if let TypeExpr::Union(branches) = t {
            if branches.iter().any(|b| self.assign(s, ss, b, ts)) {
                return true;
            }
            if s == &TypeExpr::Keyword(Keyword::Boolean) {
                let has = |v: bool| branches.contains(&TypeExpr::Literal(Literal::Bool(v)));
                if has(true) && has(false) {
                    return true;
                }
            }
            if let Some(expanded) = self.expand(s, ss) {
                return self.assume(s, ss, t, ts, || self.assign(&expanded, ss, t, ts));
            }
            return false;
        }
        if let TypeExpr::Intersection(branches) = s {
            if branches.iter().any(|b| self.assign(b, ss, t, ts)) {
                return true;
            }
            return match self.merged_shape(branches, ss) {
                Some(shape) => self.assign(&TypeExpr::Object(shape), ss, t, ts),
                None => false,
            };
        }

        if let (
            TypeExpr::Reference { name: sn, args: sa },
            TypeExpr::Reference { name: tn, args: ta },
        ) = (s, t)
        {
            if sn == tn
                && sa.len() == ta.len()
                && sa.iter().zip(ta).all(|(a, b)| self.assign(a, ss, b, ts))
            {
                return true;
            }
        }
        if let Some(expanded) = self.expand(s, ss) {
            return self.assume(s, ss, t, ts, || self.assign(&expanded, ss, t, ts));
        }
        if let Some(expanded) = self.expand(t, ts) {
            return self.assume(s, ss, t, ts, || self.assign(s, ss, &expanded, ts));
        }

        self.assign_structural(s, ss, t, ts)
    }

    fn assign_structural(&self, s: &TypeExpr, ss: Side, t: &TypeExpr, ts: Side) -> bool {
        use TypeExpr as T;
        match (s, t) {
            (_, T::Keyword(k)) => self.keyword_accepts(*k, s, ss),
            (T::Keyword(Keyword::Object), T::Object(shape)) => !has_required(shape),
            (T::Keyword(_), _) => false,
            (T::Literal(a), T::Literal(b)) => a == b,
            (_, T::Literal(_)) => false,

            (
                _,
                T::Operator {
                    op: TypeOperator::Readonly,
                    operand,
                },
            ) => {
                let inner = match s {
                    T::Operator {
                        op: TypeOperator::Readonly,
                        operand: inner,
                    } => inner.as_ref(),
                    other => other,
                };
                self.assign(inner, ss, operand, ts)
            }
            (
                T::Operator {
                    op: TypeOperator::Readonly,
                    ..
                },
                T::Array(_) | T::Tuple(_),
            ) => false,

            (T::Array(se), T::Array(te)) => self.assign(se, ss, te, ts),
            (T::Tuple(elems), T::Array(te)) => elems
                .iter()
                .all(|e| self.assign(element_type(&e.ty, e.rest), ss, te, ts)),
            (_, T::Array(_)) => false,
            (T::Tuple(a), T::Tuple(b)) => self.tuple_assignable(a, ss, b, ts),
            (_, T::Tuple(_)) => false,

            (T::Function(a), T::Function(b)) | (T::Constructor(a), T::Constructor(b)) => {
                self.signature_assignable(a, ss, b, ts)
            }
            (T::Function(a), T::Object(shape)) => {
                shape.members.is_empty()
                    && shape.index.is_empty()
                    && shape
                        .calls
                        .iter()
                        .all(|c| self.signature_assignable(a, ss, c, ts))
            }
            (T::Object(shape), T::Function(b)) => shape
                .calls
                .iter()
                .any(|c| self.signature_assignable(c, ss, b, ts)),
            (T::Function(_) | T::Constructor(_), T::Reference { name, .. }) => {
                matches!(
                    name.as_str(),
                    "Function" | "CallableFunction" | "NewableFunction"
                )
            }

            (T::Object(a), T::Object(b)) => self.shape_assignable(a, ss, b, ts),
            (T::Array(_) | T::Tuple(_) | T::Mapped(_), T::Object(b)) => !has_required(b),

            (
                T::Predicate {
                    param: sp,
                    ty: sty,
                    asserts: sa,
                },
                T::Predicate {
                    param: tp,
                    ty: tty,
                    asserts: ta,
                },
            ) => {
                sp == tp
                    && sa == ta
                    && match (sty, tty) {
                        (Some(a), Some(b)) => self.assign(a, ss, b, ts),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (T::Predicate { .. }, _) => self.assign(&T::Keyword(Keyword::Boolean), ss, t, ts),
            _ => false,
        }
    }

    fn keyword_accepts(&self, k: Keyword, s: &TypeExpr, ss: Side) -> bool {
        use TypeExpr as T;
        match k {
            Keyword::Any | Keyword::Unknown => true,
            Keyword::Never => false,
            Keyword::String => matches!(
                s,
                T::Keyword(Keyword::String)
                    | T::Literal(Literal::Str(_))
                    | T::Literal(Literal::Template(_))
            ),
            Keyword::Number => match s {
                T::Keyword(Keyword::Number) => true,
                T::Literal(Literal::Num(n)) => !n.ends_with('n'),
                _ => false,
            },
            Keyword::BigInt => match s {
                T::Keyword(Keyword::BigInt) => true,
                T::Literal(Literal::Num(n)) => n.ends_with('n'),
                _ => false,
            },
            Keyword::Boolean => matches!(s, T::Keyword(Keyword::Boolean) | T::Literal(Literal::Bool(_)) | T::Predicate { .. }),
            Keyword::Symbol => matches!(
                s,
                T::Keyword(Keyword::Symbol)
                    | T::Operator {
                        op: TypeOperator::Unique,
                        ..
                    }
            ),
            Keyword::Void => matches!(s, T::Keyword(Keyword::Void) | T::Keyword(Keyword::Undefined)),
            Keyword::Undefined => matches!(s, T::Keyword(Keyword::Undefined)),
            Keyword::Null => matches!(s, T::Keyword(Keyword::Null)),
            Keyword::Object => match s {
                T::Keyword(Keyword::Object)
                | T::Object(_)
                | T::Array(_)
                | T::Tuple(_)
                | T::Function(_)
                | T::Constructor(_)
                | T::Mapped(_) => true,
                T::Operator {
                    op: TypeOperator::Readonly,
                    ..
                } => true,
                T::Reference { name, .. } => {
                    FrontEnd::get().is_global(name) || self.table(ss).imports.contains(head(name))
                }
                _ => false,
            },
        }
    }

    /// Parameters are compared contravariantly, returns covariantly; a `void`
    /// target return accepts any source return.
    fn signature_assignable(&self, src: &Signature, ss: Side, tgt: &Signature, ts: Side) -> bool {
        let tgt_has_rest = tgt.params.iter().any(|p| p.rest);
        if src.required_count() > tgt.params.len() && !tgt_has_rest {
            return false;
        }
        for (sp, tp) in src.params.iter().zip(&tgt.params) {
            let (sty, tty) = param_types(sp, tp);
            if !self.assign(tty, ts, sty, ss) {
                return false;
            }
        }
        if tgt.ret == TypeExpr::Keyword(Keyword::Void) {
            return true;
        }
        self.assign(&src.ret, ss, &tgt.ret, ts)
    }

    fn shape_assignable(&self, a: &ObjectShape, ss: Side, b: &ObjectShape, ts: Side) -> bool {
        for bm in &b.members {
            match a.member(&bm.name) {
                None if bm.optional => {}
                None => return false,
                Some(am) => {
                    if am.optional && !bm.optional {
                        return false;
                    }
                    if !self.assign(&am.ty, ss, &bm.ty, ts) {
                        return false;
                    }
                }
            }
        }
        for bi in &b.index {
            let ok = match a.index.iter().find(|ai| ai.key_type == bi.key_type) {
                Some(ai) => self.assign(&ai.value, ss, &bi.value, ts),
                None => a.members.iter().all(|m| self.assign(&m.ty, ss, &bi.value, ts)),
            };
            if !ok {
                return false;
            }
        }
        b.calls.iter().all(|bc| {
            a.calls
                .iter()
                .any(|ac| self.signature_assignable(ac, ss, bc, ts))
        })
    }

    fn tuple_assignable(
        &self,
        a: &[TupleElement],
        ss: Side,
        b: &[TupleElement],
        ts: Side,
    ) -> bool {
        for (i, be) in b.iter().enumerate() {
            if be.rest {
                let target = element_type(&be.ty, true);
                return a[i.min(a.len())..]
                    .iter()
                    .all(|ae| self.assign(element_type(&ae.ty, ae.rest), ss, target, ts));
            }
            match a.get(i) {
                Some(ae) => {
                    if ae.rest || (ae.optional && !be.optional) {
                        return false;
                    }
                    if !self.assign(&ae.ty, ss, &be.ty, ts) {
                        return false;
                    }
                }
                None if be.optional => {}
                None => return false,
            }
        }
        a.len() <= b.len()
    }

    /// Members of every object-like branch of an intersection, later
    /// branches overriding earlier ones.
    fn merged_shape(&self, branches: &[TypeExpr], side: Side) -> Option<ObjectShape> {
        let mut shape = ObjectShape::default();
        for branch in branches {
            let expanded = match branch {
                TypeExpr::Object(s) => s.clone(),
                other => match self.expand(other, side) {
                    Some(TypeExpr::Object(s)) => s,
                    Some(TypeExpr::Intersection(inner)) => self.merged_shape(&inner, side)?,
                    _ => return None,
                },
            };
            overlay(&mut shape, expanded);
        }
        Some(shape)
    }
}

/// Pair declared type parameters with arguments; missing arguments fall
/// back to the parameter default, then to `any`.
fn bind(params: &[TypeParam], args: &[TypeExpr]) -> Vec<(String, TypeExpr)> {
    params
        .iter()
        .enumerate()
        .map(|(i, tp)| {
            let arg = args
                .get(i)
                .cloned()
                .or_else(|| tp.default.clone())
                .unwrap_or(TypeExpr::Keyword(Keyword::Any));
            (tp.name.clone(), arg)
        })
        .collect()
}

fn overlay(shape: &mut ObjectShape, top: ObjectShape) {
    for member in top.members {
        match shape.members.iter_mut().find(|m| m.name == member.name) {
            Some(slot) => *slot = member,
            None => shape.members.push(member),
        }
    }
    shape.index.extend(top.index);
    shape.calls.extend(top.calls);
}

fn has_required(shape: &ObjectShape) -> bool {
    shape.members.iter().any(|m| !m.optional)
}

/// The element type of a rest position (`...xs: T[]` yields `T`).
fn element_type(ty: &TypeExpr, rest: bool) -> &TypeExpr {
    match (rest, ty) {
        (true, TypeExpr::Array(el)) => el,
        _ => ty,
    }
}

fn param_types<'p>(sp: &'p Param, tp: &'p Param) -> (&'p TypeExpr, &'p TypeExpr) {
    if sp.rest == tp.rest {
        (&sp.ty, &tp.ty)
    } else {
        (element_type(&sp.ty, sp.rest), element_type(&tp.ty, tp.rest))
    }
}

// ──────────────────────────────────────────────
// Reference checker
// ──────────────────────────────────────────────

struct RefChecker<'c, 'd> {
    ctx: &'c ResolutionContext<'d>,
    side: Side,
    file: &'c str,
}

impl RefChecker<'_, '_> {
    fn statements(&self, statements: &[Statement]) -> Result<(), DetectError> {
        for stmt in statements {
            let mut scope = Vec::new();
            match stmt {
                Statement::Record(r) => {
                    self.type_params(&r.type_params, &mut scope, r.line)?;
                    for base in &r.heritage {
                        self.ty(base, &mut scope, r.line)?;
                    }
                    self.shape(&r.body, &mut scope, r.line)?;
                }
                Statement::TypeAlias(a) => {
                    self.type_params(&a.type_params, &mut scope, a.line)?;
                    self.ty(&a.ty, &mut scope, a.line)?;
                }
                Statement::Function(f) => self.signature(&f.signature, &mut scope, f.line)?,
                Statement::Variable(v) => {
                    if let Some(ty) = &v.ty {
                        self.ty(ty, &mut scope, v.line)?;
                    }
                }
                Statement::Namespace(ns) => self.statements(&ns.body)?,
                Statement::Import(_) => {}
            }
        }
        Ok(())
    }

    /// Push the parameters into scope, then check constraints and defaults
    /// (which may refer to each other).
    fn type_params(
        &self,
        params: &[TypeParam],
        scope: &mut Vec<String>,
        line: u32,
    ) -> Result<(), DetectError> {
        scope.extend(params.iter().map(|p| p.name.clone()));
        for tp in params {
            if let Some(c) = &tp.constraint {
                self.ty(c, scope, line)?;
            }
            if let Some(d) = &tp.default {
                self.ty(d, scope, line)?;
            }
        }
        Ok(())
    }

    fn signature(
        &self,
        sig: &Signature,
        scope: &mut Vec<String>,
        line: u32,
    ) -> Result<(), DetectError> {
        let mark = scope.len();
        self.type_params(&sig.type_params, scope, line)?;
        for p in &sig.params {
            self.ty(&p.ty, scope, line)?;
        }
        self.ty(&sig.ret, scope, line)?;
        scope.truncate(mark);
        Ok(())
    }

    fn shape(
        &self,
        shape: &ObjectShape,
        scope: &mut Vec<String>,
        line: u32,
    ) -> Result<(), DetectError> {
        for m in &shape.members {
            self.ty(&m.ty, scope, m.line.max(line))?;
        }
        for i in &shape.index {
            self.ty(&i.key_type, scope, line)?;
            self.ty(&i.value, scope, line)?;
        }
        for c in &shape.calls {
            self.signature(c, scope, line)?;
        }
        Ok(())
    }

    fn ty(&self, ty: &TypeExpr, scope: &mut Vec<String>, line: u32) -> Result<(), DetectError> {
        match ty {
            TypeExpr::Reference { name, args } => {
                if !self.ctx.is_known(self.side, name, scope) {
                    return Err(DetectError::resolution(self.file, line, name.clone()));
                }
                for a in args {
                    self.ty(a, scope, line)?;
                }
                Ok(())
            }
            TypeExpr::Array(el) => self.ty(el, scope, line),
            TypeExpr::Tuple(elems) => {
                for e in elems {
                    self.ty(&e.ty, scope, line)?;
                }
                Ok(())
            }
            TypeExpr::Union(bs) | TypeExpr::Intersection(bs) => {
                for b in bs {
                    self.ty(b, scope, line)?;
                }
                Ok(())
            }
            TypeExpr::Object(shape) => self.shape(shape, scope, line),
            TypeExpr::Function(sig) | TypeExpr::Constructor(sig) => {
                self.signature(sig, scope, line)
            }
            TypeExpr::Conditional(c) => {
                let mark = scope.len();
                collect_infers(&c.extends, scope);
                let result = self
                    .ty(&c.check, scope, line)
                    .and_then(|_| self.ty(&c.extends, scope, line))
                    .and_then(|_| self.ty(&c.true_type, scope, line));
                scope.truncate(mark);
                result?;
                self.ty(&c.false_type, scope, line)
            }
            TypeExpr::Mapped(m) => {
                self.ty(&m.constraint, scope, line)?;
                scope.push(m.key.clone());
                let result = m
                    .name_type
                    .iter()
                    .chain(m.value.iter())
                    .try_for_each(|t| self.ty(t, scope, line));
                scope.pop();
                result
            }
            TypeExpr::Operator { operand, .. } => self.ty(operand, scope, line),
            TypeExpr::IndexedAccess { object, index } => {
                self.ty(object, scope, line)?;
                self.ty(index, scope, line)
            }
            TypeExpr::Predicate { ty: Some(t), .. } => self.ty(t, scope, line),
            TypeExpr::Keyword(_)
            | TypeExpr::Literal(_)
            | TypeExpr::Query(_)
            | TypeExpr::Infer(_)
            | TypeExpr::Predicate { ty: None, .. } => Ok(()),
        }
    }
}

/// Names bound by `infer X` anywhere inside a conditional's extends clause.
fn collect_infers(ty: &TypeExpr, scope: &mut Vec<String>) {
    match ty {
        TypeExpr::Infer(name) => scope.push(name.clone()),
        TypeExpr::Reference { args, .. } => args.iter().for_each(|a| collect_infers(a, scope)),
        TypeExpr::Array(el) => collect_infers(el, scope),
        TypeExpr::Tuple(elems) => elems.iter().for_each(|e| collect_infers(&e.ty, scope)),
        TypeExpr::Union(bs) | TypeExpr::Intersection(bs) => {
            bs.iter().for_each(|b| collect_infers(b, scope))
        }
        TypeExpr::Object(shape) => shape
            .members
            .iter()
            .for_each(|m| collect_infers(&m.ty, scope)),
        TypeExpr::Function(sig) | TypeExpr::Constructor(sig) => {
            sig.params.iter().for_each(|p| collect_infers(&p.ty, scope));
            collect_infers(&sig.ret, scope);
        }
        TypeExpr::Operator { operand, .. } => collect_infers(operand, scope),
        TypeExpr::IndexedAccess { object, index } => {
            collect_infers(object, scope);
            collect_infers(index, scope);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn docs(prev: &str, curr: &str) -> (Document, Document) {
        (
            parse("previous.d.ts", prev).expect("previous parses"),
            parse("current.d.ts", curr).expect("current parses"),
        )
    }

    fn alias_type(doc: &Document, name: &str) -> TypeExpr {
        doc.statements
            .iter()
            .find_map(|s| match s {
                Statement::TypeAlias(a) if a.name == name => Some(a.ty.clone()),
                _ => None,
            })
            .expect("alias present")
    }

    #[test]
    fn unresolved_reference_is_reported_with_location() {
        let (p, c) = docs(
            "export interface Config {\n  items: Invalid[];\n}",
            "export interface Config { items: string[]; }",
        );
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let err = ctx.check_references().unwrap_err();
        match err {
            DetectError::Resolution { file, line, name } => {
                assert_eq!(file, "previous.d.ts");
                assert_eq!(line, 2);
                assert_eq!(name, "Invalid");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scoped_names_resolve() {
        let (p, c) = docs(
            "import { Dep } from 'dep';\n\
             export type Unwrap<T> = T extends Promise<infer U> ? U : T;\n\
             export type Keys<T> = { [K in keyof T]: T[K] };\n\
             export declare function id<X>(x: X): Dep;\n\
             export namespace NS { interface Inner { a: string } }\n\
             export type UsesNs = NS.Inner;",
            "export type Ext = JQuery;",
        );
        let config = DetectorConfig {
            globals: vec!["JQuery".into()],
            ..Default::default()
        };
        let ctx = ResolutionContext::new(&p, &c, &config);
        ctx.check_references().expect("all references resolve");
    }

    #[test]
    fn configured_globals_are_required() {
        let (p, c) = docs("type A = string;", "export type Ext = JQuery;");
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        assert!(ctx.check_references().is_err());
    }

    #[test]
    fn primitive_and_literal_assignability() {
        let (p, c) = docs("type A = 'a';", "type B = string;");
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let a = alias_type(&p, "A");
        let b = alias_type(&c, "B");
        assert!(ctx.assignable(&a, Side::Previous, &b, Side::Current));
        assert!(!ctx.assignable(&b, Side::Current, &a, Side::Previous));
    }

    #[test]
    fn unions_decompose() {
        let (p, c) = docs("type A = string[];", "type B = string[] | number[];");
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let a = alias_type(&p, "A");
        let b = alias_type(&c, "B");
        assert!(ctx.assignable(&a, Side::Previous, &b, Side::Current));
        assert!(!ctx.assignable(&b, Side::Current, &a, Side::Previous));
    }

    #[test]
    fn object_shapes_compare_members() {
        let (p, c) = docs(
            "type A = { items: string[]; extra?: number };",
            "type B = { items: number[] };",
        );
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let a = alias_type(&p, "A");
        let b = alias_type(&c, "B");
        assert!(!ctx.assignable(&a, Side::Previous, &b, Side::Current));
    }

    #[test]
    fn interface_references_expand_with_inheritance() {
        let (p, c) = docs(
            "interface Base { id: string }\ninterface User extends Base { name: string }\ntype U = User;",
            "type Named = { id: string; name: string };",
        );
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let u = alias_type(&p, "U");
        let n = alias_type(&c, "Named");
        assert!(ctx.assignable(&u, Side::Previous, &n, Side::Current));
    }

    #[test]
    fn generic_alias_arguments_are_substituted() {
        let (p, c) = docs(
            "type Box<T> = { value: T };\ntype A = Box<string>;",
            "type B = { value: string | number };",
        );
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let a = alias_type(&p, "A");
        let b = alias_type(&c, "B");
        assert!(ctx.assignable(&a, Side::Previous, &b, Side::Current));
    }

    #[test]
    fn array_reference_normalizes() {
        let (p, c) = docs("type A = Array<string>;", "type B = string[];");
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let a = alias_type(&p, "A");
        let b = alias_type(&c, "B");
        assert!(ctx.assignable(&a, Side::Previous, &b, Side::Current));
        assert!(ctx.assignable(&b, Side::Current, &a, Side::Previous));
    }

    #[test]
    fn recursive_types_terminate() {
        let (p, c) = docs(
            "interface ListNode { next?: ListNode; value: string }\ntype A = ListNode;",
            "interface Chain { next?: Chain; value: string | number }\ntype B = Chain;",
        );
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let a = alias_type(&p, "A");
        let b = alias_type(&c, "B");
        assert!(ctx.assignable(&a, Side::Previous, &b, Side::Current));
        assert!(!ctx.assignable(&b, Side::Current, &a, Side::Previous));
    }

    #[test]
    fn function_parameters_are_contravariant() {
        let (p, c) = docs(
            "type F = (error: Error | null) => void;",
            "type G = (error: Error) => void;",
        );
        let ctx = ResolutionContext::new(&p, &c, &DetectorConfig::default());
        let f = alias_type(&p, "F");
        let g = alias_type(&c, "G");
        assert!(ctx.assignable(&f, Side::Previous, &g, Side::Current));
        assert!(!ctx.assignable(&g, Side::Current, &f, Side::Previous));
    }
}
