use super::Parser;
use crate::ast::{
    Conditional, Keyword, Literal, Mapped, ModifierOp, Signature, TupleElement, TypeExpr,
    TypeOperator,
};
use crate::error::DetectError;
use crate::lexer::Token;

impl<'a> Parser<'a> {
    // -- Type parsing -------------------------------------------

    /// Full type expression, conditional types included.
    pub(super) fn parse_type(&mut self) -> Result<TypeExpr, DetectError> {
        if self.starts_function_type() {
            return self.parse_function_type();
        }
        if self.is_word("new") || (self.is_word("abstract") && self.is_word_at(1, "new")) {
            if self.is_word("abstract") {
                self.advance();
            }
            self.advance();
            let sig = self.parse_arrow_signature()?;
            return Ok(TypeExpr::Constructor(Box::new(sig)));
        }

        let check = self.parse_union()?;
        if self.in_extends || !self.is_word("extends") {
            return Ok(check);
        }
        self.advance();
        let saved = std::mem::replace(&mut self.in_extends, true);
        let extends = self.parse_type();
        self.in_extends = saved;
        let extends = extends?;
        self.expect(Token::Question, "?")?;
        let true_type = self.parse_type()?;
        self.expect(Token::Colon, ":")?;
        let false_type = self.parse_type()?;
        Ok(TypeExpr::Conditional(Box::new(Conditional {
            check,
            extends,
            true_type,
            false_type,
        })))
    }

    /// A type inside brackets, parentheses or braces, where conditional types
    /// are allowed again.
    pub(super) fn parse_nested_type(&mut self) -> Result<TypeExpr, DetectError> {
        let saved = std::mem::replace(&mut self.in_extends, false);
        let ty = self.parse_type();
        self.in_extends = saved;
        ty
    }

    /// Return annotation: a type, or a type predicate `x is T` /
    /// `asserts x [is T]`.
    pub(super) fn parse_return_type(&mut self) -> Result<TypeExpr, DetectError> {
        if self.is_word("asserts") && matches!(self.peek_at(1), Token::Word(_)) {
            self.advance();
            let param = self.take_word()?;
            let ty = if self.is_word("is") {
                self.advance();
                Some(Box::new(self.parse_nested_type()?))
            } else {
                None
            };
            return Ok(TypeExpr::Predicate {
                param,
                ty,
                asserts: true,
            });
        }
        if matches!(self.peek(), Token::Word(_)) && self.is_word_at(1, "is") {
            let param = self.take_word()?;
            self.advance();
            let ty = self.parse_nested_type()?;
            return Ok(TypeExpr::Predicate {
                param,
                ty: Some(Box::new(ty)),
                asserts: false,
            });
        }
        self.parse_nested_type()
    }

    /// `A.B<Args>` as used in heritage clauses.
    pub(super) fn parse_type_reference(&mut self) -> Result<TypeExpr, DetectError> {
        let name = self.take_qualified_name()?;
        let args = self.parse_type_args()?;
        Ok(TypeExpr::Reference { name, args })
    }

    /// `<` or a parenthesised parameter list followed by `=>`.
    fn starts_function_type(&self) -> bool {
        match self.peek() {
            Token::Lt => true,
            Token::LParen => {
                let mut depth = 0usize;
                let mut i = 0usize;
                loop {
                    match self.peek_at(i) {
                        Token::LParen => depth += 1,
                        Token::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self.peek_at(i + 1) == &Token::Arrow;
                            }
                        }
                        Token::Eof => return false,
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => false,
        }
    }

    fn parse_function_type(&mut self) -> Result<TypeExpr, DetectError> {
        let sig = self.parse_arrow_signature()?;
        Ok(TypeExpr::Function(Box::new(sig)))
    }

    /// `<T>(params) => R`
    fn parse_arrow_signature(&mut self) -> Result<Signature, DetectError> {
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        self.expect(Token::Arrow, "=>")?;
        let ret = self.parse_return_type()?;
        Ok(Signature {
            type_params,
            params,
            ret,
        })
    }

    fn parse_union(&mut self) -> Result<TypeExpr, DetectError> {
        self.eat(&Token::Pipe);
        let mut branches = Vec::new();
        push_flat(&mut branches, self.parse_intersection()?, true);
        while self.eat(&Token::Pipe) {
            push_flat(&mut branches, self.parse_intersection()?, true);
        }
        Ok(collapse(branches, TypeExpr::Union))
    }

    fn parse_intersection(&mut self) -> Result<TypeExpr, DetectError> {
        self.eat(&Token::Amp);
        let mut branches = Vec::new();
        push_flat(&mut branches, self.parse_operator()?, false);
        while self.eat(&Token::Amp) {
            push_flat(&mut branches, self.parse_operator()?, false);
        }
        Ok(collapse(branches, TypeExpr::Intersection))
    }

    fn parse_operator(&mut self) -> Result<TypeExpr, DetectError> {
        let op = if self.is_word("keyof") {
            Some(TypeOperator::KeyOf)
        } else if self.is_word("readonly") {
            Some(TypeOperator::Readonly)
        } else if self.is_word("unique") && self.is_word_at(1, "symbol") {
            Some(TypeOperator::Unique)
        } else {
            None
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_operator()?;
            return Ok(TypeExpr::Operator {
                op,
                operand: Box::new(operand),
            });
        }
        if self.is_word("infer") && matches!(self.peek_at(1), Token::Word(_)) {
            self.advance();
            let name = self.take_word()?;
            return Ok(TypeExpr::Infer(name));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<TypeExpr, DetectError> {
        let mut ty = self.parse_primary()?;
        // `T[]` / `T[K]` only bind on the same line as their operand.
        while self.peek() == &Token::LBracket && !self.on_new_line() {
            self.advance();
            if self.eat(&Token::RBracket) {
                ty = TypeExpr::Array(Box::new(ty));
            } else {
                let index = self.parse_nested_type()?;
                self.expect(Token::RBracket, "]")?;
                ty = TypeExpr::IndexedAccess {
                    object: Box::new(ty),
                    index: Box::new(index),
                };
            }
        }
        Ok(ty)
    }

    fn parse_primary(&mut self) -> Result<TypeExpr, DetectError> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let inner = self.parse_nested_type()?;
                self.expect(Token::RParen, ")")?;
                Ok(inner)
            }
            Token::LBracket => self.parse_tuple(),
            Token::LBrace => {
                if self.starts_mapped_type() {
                    self.parse_mapped_type()
                } else {
                    Ok(TypeExpr::Object(self.parse_object_body()?))
                }
            }
            Token::Str(s) => {
                self.advance();
                Ok(TypeExpr::Literal(Literal::Str(s)))
            }
            Token::Num(n) => {
                self.advance();
                Ok(TypeExpr::Literal(Literal::Num(n)))
            }
            Token::Template(raw) => {
                self.advance();
                Ok(TypeExpr::Literal(Literal::Template(raw)))
            }
            Token::Word(w) => match w.as_str() {
                "true" | "false" => {
                    self.advance();
                    Ok(TypeExpr::Literal(Literal::Bool(w == "true")))
                }
                "typeof" => {
                    self.advance();
                    if self.is_word("import") {
                        let target = self.parse_import_type_name()?;
                        return Ok(TypeExpr::Query(target));
                    }
                    Ok(TypeExpr::Query(self.take_qualified_name()?))
                }
                "import" if self.peek_at(1) == &Token::LParen => {
                    let name = self.parse_import_type_name()?;
                    let args = self.parse_type_args()?;
                    Ok(TypeExpr::Reference { name, args })
                }
                _ => {
                    if let Some(k) = Keyword::from_word(&w) {
                        if self.peek_at(1) != &Token::Dot {
                            self.advance();
                            return Ok(TypeExpr::Keyword(k));
                        }
                    }
                    self.parse_type_reference()
                }
            },
            other => Err(self.err(format!("expected a type, got {:?}", other))),
        }
    }

    /// `import("m").A.B`, rendered back as written.
    fn parse_import_type_name(&mut self) -> Result<String, DetectError> {
        self.expect_word("import")?;
        self.expect(Token::LParen, "(")?;
        let module = self.take_str()?;
        self.expect(Token::RParen, ")")?;
        let mut name = format!("import(\"{}\")", module);
        while self.eat(&Token::Dot) {
            name.push('.');
            name.push_str(&self.take_word()?);
        }
        Ok(name)
    }

    /// Optional `<A, B>` argument list.
    fn parse_type_args(&mut self) -> Result<Vec<TypeExpr>, DetectError> {
        let mut args = Vec::new();
        if !self.eat(&Token::Lt) {
            return Ok(args);
        }
        while self.peek() != &Token::Gt {
            args.push(self.parse_nested_type()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Gt, ">")?;
        Ok(args)
    }

    /// `[A, name?: B, ...C[]]`
    fn parse_tuple(&mut self) -> Result<TypeExpr, DetectError> {
        self.expect(Token::LBracket, "[")?;
        let mut elems = Vec::new();
        while self.peek() != &Token::RBracket {
            let rest = self.eat(&Token::Ellipsis);
            let labelled = matches!(self.peek(), Token::Word(_))
                && (self.peek_at(1) == &Token::Colon
                    || (self.peek_at(1) == &Token::Question && self.peek_at(2) == &Token::Colon));
            let (name, ty, optional) = if labelled {
                let name = self.take_word()?;
                let optional = self.eat(&Token::Question);
                self.expect(Token::Colon, ":")?;
                (Some(name), self.parse_nested_type()?, optional)
            } else {
                let ty = self.parse_nested_type()?;
                (None, ty, self.eat(&Token::Question))
            };
            elems.push(TupleElement {
                name,
                ty,
                optional,
                rest,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBracket, "]")?;
        Ok(TypeExpr::Tuple(elems))
    }

    /// `{ [+|-]readonly [K in ...` lookahead.
    fn starts_mapped_type(&self) -> bool {
        let mut i = 1;
        if matches!(self.peek_at(i), Token::Plus | Token::Minus) {
            i += 1;
        }
        if self.is_word_at(i, "readonly") {
            i += 1;
        }
        self.peek_at(i) == &Token::LBracket
            && matches!(self.peek_at(i + 1), Token::Word(_))
            && self.is_word_at(i + 2, "in")
    }

    fn parse_modifier_op(&mut self, word: &str) -> Result<Option<ModifierOp>, DetectError> {
        let sign = match self.peek() {
            Token::Plus => Some(ModifierOp::Add),
            Token::Minus => Some(ModifierOp::Remove),
            _ => None,
        };
        if sign.is_some() {
            self.advance();
        }
        let present = match word {
            "?" => self.eat(&Token::Question),
            w if self.is_word(w) => {
                self.advance();
                true
            }
            _ => false,
        };
        match (sign, present) {
            (Some(op), true) => Ok(Some(op)),
            (None, true) => Ok(Some(ModifierOp::Add)),
            (None, false) => Ok(None),
            (Some(_), false) => Err(self.err(format!("expected '{}' after modifier sign", word))),
        }
    }

    /// `{ readonly [K in C as N]?: V; }`
    fn parse_mapped_type(&mut self) -> Result<TypeExpr, DetectError> {
        self.expect(Token::LBrace, "{")?;
        let readonly = self.parse_modifier_op("readonly")?;
        self.expect(Token::LBracket, "[")?;
        let key = self.take_word()?;
        self.expect_word("in")?;
        let constraint = self.parse_nested_type()?;
        let name_type = if self.is_word("as") {
            self.advance();
            Some(self.parse_nested_type()?)
        } else {
            None
        };
        self.expect(Token::RBracket, "]")?;
        let optional = self.parse_modifier_op("?")?;
        let value = if self.eat(&Token::Colon) {
            Some(self.parse_nested_type()?)
        } else {
            None
        };
        self.eat(&Token::Semi);
        self.expect(Token::RBrace, "}")?;
        Ok(TypeExpr::Mapped(Box::new(Mapped {
            key,
            constraint,
            name_type,
            value,
            readonly,
            optional,
        })))
    }
}

/// Flatten nested unions (or intersections) into one branch list, dropping
/// exact duplicates as the checker does.
fn push_flat(branches: &mut Vec<TypeExpr>, ty: TypeExpr, union: bool) {
    let nested = match ty {
        TypeExpr::Union(inner) if union => inner,
        TypeExpr::Intersection(inner) if !union => inner,
        other => vec![other],
    };
    for t in nested {
        if !branches.contains(&t) {
            branches.push(t);
        }
    }
}

fn collapse(mut branches: Vec<TypeExpr>, wrap: fn(Vec<TypeExpr>) -> TypeExpr) -> TypeExpr {
    if branches.len() == 1 {
        branches.remove(0)
    } else {
        wrap(branches)
    }
}
