use super::Parser;
use crate::ast::{
    IndexSignature, Keyword, Member, ObjectShape, Param, Signature, TypeExpr, TypeParam,
};
use crate::error::DetectError;
use crate::lexer::Token;

/// Modifiers accepted in front of class members.
const CLASS_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "readonly", "abstract", "override", "declare",
    "accessor",
];

impl<'a> Parser<'a> {
    // -- Type parameters, parameters, signatures ------------------

    /// Optional `<T extends C = D, ...>` list.
    pub(super) fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, DetectError> {
        let mut params = Vec::new();
        if !self.eat(&Token::Lt) {
            return Ok(params);
        }
        while self.peek() != &Token::Gt {
            // Variance and const modifiers: `in`, `out`, `const`.
            while (self.is_word("in") || self.is_word("out") || self.is_word("const"))
                && matches!(self.peek_at(1), Token::Word(_))
            {
                self.advance();
            }
            let name = self.take_word()?;
            let constraint = if self.is_word("extends") {
                self.advance();
                Some(self.parse_nested_type()?)
            } else {
                None
            };
            let default = if self.eat(&Token::Eq) {
                Some(self.parse_nested_type()?)
            } else {
                None
            };
            params.push(TypeParam {
                name,
                constraint,
                default,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Gt, ">")?;
        Ok(params)
    }

    /// `(a: T, b?: U, ...rest: V[])`
    pub(super) fn parse_params(&mut self) -> Result<Vec<Param>, DetectError> {
        self.expect(Token::LParen, "(")?;
        let mut params = Vec::new();
        let mut index = 0usize;
        while self.peek() != &Token::RParen {
            let line = self.cur_line();
            // Constructor parameter properties.
            while CLASS_MODIFIERS.contains(&self.word_text().as_str())
                && matches!(self.peek_at(1), Token::Word(_) | Token::LBrace | Token::LBracket)
            {
                self.advance();
            }
            let rest = self.eat(&Token::Ellipsis);
            let name = match self.peek() {
                Token::LBrace | Token::LBracket => {
                    self.skip_group()?;
                    format!("__{}", index)
                }
                _ => self.take_word()?,
            };
            let optional = self.eat(&Token::Question);
            let ty = if self.eat(&Token::Colon) {
                self.parse_nested_type()?
            } else {
                TypeExpr::keyword(Keyword::Any)
            };
            if self.peek() == &Token::Eq {
                return Err(self.reject(
                    line,
                    format!("parameter '{}' has a default value", name),
                ));
            }
            // A `this` parameter types the receiver; callers never pass it.
            if name != "this" {
                params.push(Param {
                    name,
                    ty,
                    optional,
                    rest,
                });
                index += 1;
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, ")")?;
        Ok(params)
    }

    /// Type parameters, parameters, and the `: R` return annotation that
    /// follow a function or method name. A missing return annotation is `any`.
    pub(super) fn parse_signature_after_name(&mut self) -> Result<Signature, DetectError> {
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let ret = if self.eat(&Token::Colon) {
            self.parse_return_type()?
        } else {
            TypeExpr::keyword(Keyword::Any)
        };
        Ok(Signature {
            type_params,
            params,
            ret,
        })
    }

    /// Members on separate lines need no separator.
    pub(super) fn on_new_line(&self) -> bool {
        self.pos > 0 && self.cur_line() > self.tokens[self.pos - 1].line
    }

    fn word_text(&self) -> String {
        match self.peek() {
            Token::Word(w) => w.clone(),
            _ => String::new(),
        }
    }

    /// True when the token after a would-be modifier can start a member name,
    /// so `readonly: boolean` stays a property called `readonly`.
    fn modifier_applies(&self) -> bool {
        matches!(
            self.peek_at(1),
            Token::Word(_) | Token::Str(_) | Token::Num(_) | Token::LBracket
        )
    }

    /// Property name: identifier, string or numeric literal, or a computed
    /// `[expr]` key.
    fn parse_member_name(&mut self) -> Result<String, DetectError> {
        match self.peek().clone() {
            Token::Word(w) => {
                self.advance();
                Ok(w)
            }
            Token::Str(s) => {
                self.advance();
                Ok(s)
            }
            Token::Num(n) => {
                self.advance();
                Ok(n)
            }
            Token::LBracket => {
                self.advance();
                let key = self.take_qualified_name()?;
                self.expect(Token::RBracket, "]")?;
                Ok(format!("[{}]", key))
            }
            other => Err(self.err(format!("expected member name, got {:?}", other))),
        }
    }

    /// `[key: K]: V` with the cursor on `[`.
    fn is_index_signature(&self) -> bool {
        self.peek() == &Token::LBracket
            && matches!(self.peek_at(1), Token::Word(_))
            && self.peek_at(2) == &Token::Colon
    }

    fn parse_index_signature(&mut self, readonly: bool) -> Result<IndexSignature, DetectError> {
        self.expect(Token::LBracket, "[")?;
        let key_name = self.take_word()?;
        self.expect(Token::Colon, ":")?;
        let key_type = self.parse_nested_type()?;
        self.expect(Token::RBracket, "]")?;
        self.expect(Token::Colon, ":")?;
        let value = self.parse_nested_type()?;
        Ok(IndexSignature {
            key_name,
            key_type,
            value,
            readonly,
        })
    }

    fn end_member(&mut self) -> Result<(), DetectError> {
        match self.peek() {
            Token::Semi | Token::Comma => {
                self.advance();
                Ok(())
            }
            Token::RBrace => Ok(()),
            _ if self.on_new_line() => Ok(()),
            other => Err(self.err(format!("expected ';' after member, got {:?}", other))),
        }
    }

    // -- Interface and object-literal bodies ----------------------

    /// `{ members }` of an interface or object literal type.
    pub(super) fn parse_object_body(&mut self) -> Result<ObjectShape, DetectError> {
        self.expect(Token::LBrace, "{")?;
        let saved = std::mem::replace(&mut self.in_extends, false);
        let mut shape = ObjectShape::default();
        while self.peek() != &Token::RBrace {
            self.parse_type_member(&mut shape)?;
            self.end_member()?;
        }
        self.in_extends = saved;
        self.expect(Token::RBrace, "}")?;
        Ok(shape)
    }

    fn parse_type_member(&mut self, shape: &mut ObjectShape) -> Result<(), DetectError> {
        let line = self.cur_line();

        // Call signature.
        if matches!(self.peek(), Token::LParen | Token::Lt) {
            let sig = self.parse_signature_after_name()?;
            shape.calls.push(sig);
            return Ok(());
        }
        // Construct signature: parsed, not part of the named surface.
        if self.is_word("new") && matches!(self.peek_at(1), Token::LParen | Token::Lt) {
            self.advance();
            self.parse_signature_after_name()?;
            return Ok(());
        }

        let mut readonly = false;
        if self.is_word("readonly") && self.modifier_applies() {
            self.advance();
            readonly = true;
        }

        if self.is_index_signature() {
            let index = self.parse_index_signature(readonly)?;
            shape.index.push(index);
            return Ok(());
        }

        // Accessors surface as properties.
        if (self.is_word("get") || self.is_word("set")) && self.modifier_applies() {
            let setter = self.is_word("set");
            self.advance();
            let name = self.parse_member_name()?;
            let sig = self.parse_signature_after_name()?;
            let ty = if setter {
                sig.params
                    .first()
                    .map(|p| p.ty.clone())
                    .unwrap_or(TypeExpr::keyword(Keyword::Any))
            } else {
                sig.ret
            };
            upsert_accessor(shape, name, ty, setter, line);
            return Ok(());
        }

        let name = self.parse_member_name()?;
        let optional = self.eat(&Token::Question);
        if matches!(self.peek(), Token::LParen | Token::Lt) {
            let sig = self.parse_signature_after_name()?;
            shape.members.push(Member {
                name,
                ty: TypeExpr::Function(Box::new(sig)),
                optional,
                readonly,
                method: true,
                line,
            });
            return Ok(());
        }
        let ty = if self.eat(&Token::Colon) {
            self.parse_nested_type()?
        } else {
            TypeExpr::keyword(Keyword::Any)
        };
        shape.members.push(Member {
            name,
            ty,
            optional,
            readonly,
            method: false,
            line,
        });
        Ok(())
    }

    // -- Class bodies ---------------------------------------------

    /// `{ members }` of a class declaration. Private, protected and static
    /// members and constructors are parsed but left off the shape.
    pub(super) fn parse_class_body(&mut self) -> Result<ObjectShape, DetectError> {
        self.expect(Token::LBrace, "{")?;
        let mut shape = ObjectShape::default();
        while self.peek() != &Token::RBrace {
            if self.eat(&Token::Semi) {
                continue;
            }
            self.parse_class_member(&mut shape)?;
        }
        self.expect(Token::RBrace, "}")?;
        Ok(shape)
    }

    fn parse_class_member(&mut self, shape: &mut ObjectShape) -> Result<(), DetectError> {
        let line = self.cur_line();
        let mut hidden = false;
        let mut readonly = false;
        while CLASS_MODIFIERS.contains(&self.word_text().as_str()) && self.modifier_applies() {
            match self.word_text().as_str() {
                "private" | "protected" | "static" => hidden = true,
                "readonly" => readonly = true,
                _ => {}
            }
            self.advance();
        }
        if matches!(self.peek(), Token::Word(w) if w.starts_with('#')) {
            hidden = true;
        }

        if self.is_word("constructor") && matches!(self.peek_at(1), Token::LParen | Token::Lt) {
            self.advance();
            self.parse_signature_after_name()?;
            self.reject_body(line, "constructor")?;
            return self.end_class_member();
        }

        if self.is_index_signature() {
            let index = self.parse_index_signature(readonly)?;
            if !hidden {
                shape.index.push(index);
            }
            return self.end_class_member();
        }

        if (self.is_word("get") || self.is_word("set")) && self.modifier_applies() {
            let setter = self.is_word("set");
            self.advance();
            let name = self.parse_member_name()?;
            let sig = self.parse_signature_after_name()?;
            self.reject_body(line, &format!("accessor '{}'", name))?;
            if !hidden {
                let ty = if setter {
                    sig.params
                        .first()
                        .map(|p| p.ty.clone())
                        .unwrap_or(TypeExpr::keyword(Keyword::Any))
                } else {
                    sig.ret
                };
                upsert_accessor(shape, name, ty, setter, line);
            }
            return self.end_class_member();
        }

        let name = self.parse_member_name()?;
        let optional = self.eat(&Token::Question);
        self.eat(&Token::Bang);

        if matches!(self.peek(), Token::LParen | Token::Lt) {
            let sig = self.parse_signature_after_name()?;
            self.reject_body(line, &format!("method '{}'", name))?;
            if !hidden {
                shape.members.push(Member {
                    name,
                    ty: TypeExpr::Function(Box::new(sig)),
                    optional,
                    readonly,
                    method: true,
                    line,
                });
            }
            return self.end_class_member();
        }

        let ty = if self.eat(&Token::Colon) {
            self.parse_nested_type()?
        } else {
            TypeExpr::keyword(Keyword::Any)
        };
        if self.peek() == &Token::Eq {
            return Err(self.reject(line, format!("property '{}' has an initializer", name)));
        }
        if !hidden {
            shape.members.push(Member {
                name,
                ty,
                optional,
                readonly,
                method: false,
                line,
            });
        }
        self.end_class_member()
    }

    fn reject_body(&self, line: u32, what: &str) -> Result<(), DetectError> {
        if self.peek() == &Token::LBrace {
            return Err(self.reject(line, format!("{} has an implementation body", what)));
        }
        Ok(())
    }

    fn end_class_member(&mut self) -> Result<(), DetectError> {
        match self.peek() {
            Token::Semi | Token::Comma => {
                self.advance();
                Ok(())
            }
            Token::RBrace => Ok(()),
            _ if self.on_new_line() => Ok(()),
            other => Err(self.err(format!("expected ';' after class member, got {:?}", other))),
        }
    }
}

/// Getter and setter pairs collapse into one property; a lone getter is
/// readonly.
fn upsert_accessor(shape: &mut ObjectShape, name: String, ty: TypeExpr, setter: bool, line: u32) {
    if let Some(existing) = shape.members.iter_mut().find(|m| m.name == name) {
        if setter {
            existing.readonly = false;
        } else {
            existing.ty = ty;
        }
        return;
    }
    shape.members.push(Member {
        name,
        ty,
        optional: false,
        readonly: !setter,
        method: false,
        line,
    });
}
