//! Recursive-descent parser for declaration documents.
//!
//! Builds the [`Document`] AST from the lexer's token stream. Executable
//! content is rejected here as a validation failure; no name resolution
//! happens at this stage.

use crate::ast::{
    AliasDecl, Document, FunctionDecl, ImportDecl, NamespaceDecl, RecordDecl, RecordKind,
    Statement, VariableDecl,
};
use crate::error::DetectError;
use crate::lexer::{lex, Spanned, Token};

mod members;
mod types;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    filename: String,
    /// Set while parsing the `extends` clause of a conditional type, where a
    /// nested conditional is not allowed without parentheses.
    in_extends: bool,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], filename: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.to_owned(),
            in_extends: false,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    /// Token `n` positions ahead of the cursor (Eof past the end).
    fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].token
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Token, what: &str) -> Result<(), DetectError> {
        if self.peek() == &tok {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', got {:?}", what, self.peek())))
        }
    }

    fn expect_word(&mut self, expected: &str) -> Result<u32, DetectError> {
        let line = self.cur_line();
        if self.is_word(expected) {
            self.advance();
            return Ok(line);
        }
        Err(self.err(format!("expected '{}', got {:?}", expected, self.peek())))
    }

    fn err(&self, msg: impl Into<String>) -> DetectError {
        DetectError::parse(&self.filename, self.cur_line(), msg)
    }

    fn reject(&self, line: u32, msg: impl Into<String>) -> DetectError {
        DetectError::validation(&self.filename, line, msg)
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn is_word_at(&self, n: usize, w: &str) -> bool {
        matches!(self.peek_at(n), Token::Word(x) if x == w)
    }

    fn take_word(&mut self) -> Result<String, DetectError> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Ok(w)
        } else {
            Err(self.err(format!("expected identifier, got {:?}", self.peek())))
        }
    }

    fn take_str(&mut self) -> Result<String, DetectError> {
        if let Token::Str(s) = self.peek().clone() {
            self.advance();
            Ok(s)
        } else {
            Err(self.err(format!("expected string literal, got {:?}", self.peek())))
        }
    }

    /// `A.B.C`
    fn take_qualified_name(&mut self) -> Result<String, DetectError> {
        let mut name = self.take_word()?;
        while self.peek() == &Token::Dot && matches!(self.peek_at(1), Token::Word(_)) {
            self.advance();
            name.push('.');
            name.push_str(&self.take_word()?);
        }
        Ok(name)
    }

    /// Consume an optional statement terminator.
    fn end_statement(&mut self) {
        self.eat(&Token::Semi);
    }

    /// Skip a balanced `{...}`, `(...)` or `[...]` group starting at the cursor.
    fn skip_group(&mut self) -> Result<(), DetectError> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::LBrace | Token::LParen | Token::LBracket => depth += 1,
                Token::RBrace | Token::RParen | Token::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                Token::Eof => return Err(self.err("unbalanced brackets")),
                _ => {}
            }
            self.advance();
        }
    }

    // -- Statements ---------------------------------------------

    /// Parse statements until `}` (inside a namespace) or end of input.
    ///
    /// `ambient` is true inside namespace bodies, where `const`/`let`/`var`
    /// need no `declare` keyword.
    fn parse_statements(&mut self, ambient: bool) -> Result<Vec<Statement>, DetectError> {
        let mut statements = Vec::new();
        let mut local_exports: Vec<String> = Vec::new();
        loop {
            match self.peek() {
                Token::Eof | Token::RBrace => break,
                Token::Semi => {
                    self.advance();
                }
                _ => self.parse_statement(ambient, &mut statements, &mut local_exports)?,
            }
        }
        // `export { A, B };` marks earlier local declarations as exported.
        for stmt in &mut statements {
            let (name, exported) = match stmt {
                Statement::Record(r) => (&r.name, &mut r.exported),
                Statement::TypeAlias(a) => (&a.name, &mut a.exported),
                Statement::Function(f) => (&f.name, &mut f.exported),
                Statement::Namespace(n) => (&n.name, &mut n.exported),
                _ => continue,
            };
            if local_exports.iter().any(|e| e == name) {
                *exported = true;
            }
        }
        Ok(statements)
    }

    fn parse_statement(
        &mut self,
        ambient: bool,
        out: &mut Vec<Statement>,
        local_exports: &mut Vec<String>,
    ) -> Result<(), DetectError> {
        let line = self.cur_line();
        if self.is_word("import") {
            let import = self.parse_import(line)?;
            out.push(Statement::Import(import));
            return Ok(());
        }

        let mut exported = false;
        if self.is_word("export") {
            self.advance();
            if self.is_word("default") {
                return Err(self.reject(line, "default exports are not allowed"));
            }
            if self.peek() == &Token::Eq {
                // `export = Name;`
                self.advance();
                self.take_qualified_name()?;
                self.end_statement();
                return Ok(());
            }
            if self.is_word("as") && self.is_word_at(1, "namespace") {
                self.advance();
                self.advance();
                self.take_word()?;
                self.end_statement();
                return Ok(());
            }
            if self.peek() == &Token::Star {
                self.parse_reexport_star()?;
                return Ok(());
            }
            if self.is_word("type") && self.peek_at(1) == &Token::LBrace {
                self.advance();
            }
            if self.peek() == &Token::LBrace {
                let (names, reexport) = self.parse_export_list()?;
                if !reexport {
                    local_exports.extend(names);
                }
                return Ok(());
            }
            if self.is_word("import") {
                let import = self.parse_import(line)?;
                out.push(Statement::Import(import));
                return Ok(());
            }
            exported = true;
        }

        let mut declared = false;
        if self.is_word("declare") {
            self.advance();
            declared = true;
        }

        let keyword = match self.peek().clone() {
            Token::Word(w) => w,
            other => {
                return Err(self.err(format!("expected a declaration, got {:?}", other)));
            }
        };
        match keyword.as_str() {
            "interface" => {
                let decl = self.parse_interface(line, exported)?;
                out.push(Statement::Record(decl));
            }
            "abstract" if self.is_word_at(1, "class") => {
                self.advance();
                let decl = self.parse_class(line, exported)?;
                out.push(Statement::Record(decl));
            }
            "class" => {
                let decl = self.parse_class(line, exported)?;
                out.push(Statement::Record(decl));
            }
            "type" => {
                let decl = self.parse_type_alias(line, exported)?;
                out.push(Statement::TypeAlias(decl));
            }
            "function" => {
                let decl = self.parse_function(line, exported)?;
                out.push(Statement::Function(decl));
            }
            "namespace" | "module" | "global" => {
                let decl = self.parse_namespace(line, exported)?;
                out.push(Statement::Namespace(decl));
            }
            "enum" => return Err(self.err("enum declarations are not supported")),
            "const" if self.is_word_at(1, "enum") => {
                return Err(self.err("enum declarations are not supported"));
            }
            "const" | "let" | "var" => {
                if !declared && !ambient {
                    return Err(self.reject(
                        line,
                        format!("'{}' declaration without 'declare' is executable", keyword),
                    ));
                }
                out.extend(self.parse_variables()?.into_iter().map(Statement::Variable));
            }
            other => return Err(self.err(format!("unexpected token '{}'", other))),
        }
        Ok(())
    }

    /// `import ...;` in any of its forms. Returns the locally bound names.
    fn parse_import(&mut self, line: u32) -> Result<ImportDecl, DetectError> {
        self.expect_word("import")?;
        let mut names = Vec::new();
        if let Token::Str(_) = self.peek() {
            // `import "side-effect";`
            self.advance();
            self.end_statement();
            return Ok(ImportDecl { names, line });
        }
        if self.is_word("type")
            && (matches!(self.peek_at(1), Token::Word(w) if w != "from")
                || matches!(self.peek_at(1), Token::LBrace | Token::Star))
        {
            self.advance();
        }
        loop {
            match self.peek().clone() {
                Token::Star => {
                    self.advance();
                    self.expect_word("as")?;
                    names.push(self.take_word()?);
                }
                Token::LBrace => {
                    self.advance();
                    while self.peek() != &Token::RBrace {
                        if self.is_word("type") && matches!(self.peek_at(1), Token::Word(_)) {
                            self.advance();
                        }
                        let mut local = match self.peek().clone() {
                            Token::Str(s) => {
                                self.advance();
                                s
                            }
                            _ => self.take_word()?,
                        };
                        if self.is_word("as") {
                            self.advance();
                            local = self.take_word()?;
                        }
                        names.push(local);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(Token::RBrace, "}")?;
                }
                Token::Word(w) => {
                    self.advance();
                    names.push(w);
                    if self.eat(&Token::Eq) {
                        // `import X = require("x");` or `import X = A.B;`
                        if self.is_word("require") {
                            self.advance();
                            self.expect(Token::LParen, "(")?;
                            self.take_str()?;
                            self.expect(Token::RParen, ")")?;
                        } else {
                            self.take_qualified_name()?;
                        }
                        self.end_statement();
                        return Ok(ImportDecl { names, line });
                    }
                }
                other => return Err(self.err(format!("malformed import, got {:?}", other))),
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_word("from")?;
        self.take_str()?;
        self.end_statement();
        Ok(ImportDecl { names, line })
    }

    /// `export * from "m";` / `export * as ns from "m";`
    fn parse_reexport_star(&mut self) -> Result<(), DetectError> {
        self.expect(Token::Star, "*")?;
        if self.is_word("as") {
            self.advance();
            self.take_word()?;
        }
        self.expect_word("from")?;
        self.take_str()?;
        self.end_statement();
        Ok(())
    }

    /// `export { a, b as c } [from "m"];` Returns local names and whether it
    /// re-exports from another module.
    fn parse_export_list(&mut self) -> Result<(Vec<String>, bool), DetectError> {
        self.expect(Token::LBrace, "{")?;
        let mut names = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.is_word("type") && matches!(self.peek_at(1), Token::Word(_)) {
                self.advance();
            }
            names.push(self.take_word()?);
            if self.is_word("as") {
                self.advance();
                match self.peek().clone() {
                    Token::Str(_) => {
                        self.advance();
                    }
                    _ => {
                        self.take_word()?;
                    }
                }
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "}")?;
        let reexport = if self.is_word("from") {
            self.advance();
            self.take_str()?;
            true
        } else {
            false
        };
        self.end_statement();
        Ok((names, reexport))
    }

    fn parse_interface(&mut self, line: u32, exported: bool) -> Result<RecordDecl, DetectError> {
        self.expect_word("interface")?;
        let name = self.take_word()?;
        let type_params = self.parse_type_params()?;
        let mut heritage = Vec::new();
        if self.is_word("extends") {
            self.advance();
            heritage = self.parse_heritage_list()?;
        }
        let body = self.parse_object_body()?;
        Ok(RecordDecl {
            name,
            kind: RecordKind::Interface,
            exported,
            type_params,
            heritage,
            body,
            line,
        })
    }

    fn parse_class(&mut self, line: u32, exported: bool) -> Result<RecordDecl, DetectError> {
        self.expect_word("class")?;
        let name = self.take_word()?;
        let type_params = self.parse_type_params()?;
        let mut heritage = Vec::new();
        loop {
            if self.is_word("extends") || self.is_word("implements") {
                self.advance();
                heritage.extend(self.parse_heritage_list()?);
            } else {
                break;
            }
        }
        let body = self.parse_class_body()?;
        Ok(RecordDecl {
            name,
            kind: RecordKind::Class,
            exported,
            type_params,
            heritage,
            body,
            line,
        })
    }

    fn parse_heritage_list(&mut self) -> Result<Vec<crate::ast::TypeExpr>, DetectError> {
        let mut list = vec![self.parse_type_reference()?];
        while self.eat(&Token::Comma) {
            list.push(self.parse_type_reference()?);
        }
        Ok(list)
    }

    fn parse_type_alias(&mut self, line: u32, exported: bool) -> Result<AliasDecl, DetectError> {
        self.expect_word("type")?;
        let name = self.take_word()?;
        let type_params = self.parse_type_params()?;
        self.expect(Token::Eq, "=")?;
        let ty = self.parse_type()?;
        self.end_statement();
        Ok(AliasDecl {
            name,
            exported,
            type_params,
            ty,
            line,
        })
    }

    fn parse_function(&mut self, line: u32, exported: bool) -> Result<FunctionDecl, DetectError> {
        self.expect_word("function")?;
        let name = self.take_word()?;
        let signature = self.parse_signature_after_name()?;
        if self.peek() == &Token::LBrace {
            return Err(self.reject(
                self.cur_line(),
                format!("function '{}' has an implementation body", name),
            ));
        }
        self.end_statement();
        Ok(FunctionDecl {
            name,
            exported,
            signature,
            line,
        })
    }

    fn parse_namespace(&mut self, line: u32, exported: bool) -> Result<NamespaceDecl, DetectError> {
        let name = if self.is_word("global") {
            self.advance();
            "global".to_owned()
        } else {
            self.advance(); // `namespace` / `module`
            match self.peek().clone() {
                Token::Str(s) => {
                    self.advance();
                    s
                }
                _ => self.take_qualified_name()?,
            }
        };
        if self.peek() != &Token::LBrace {
            // Shorthand ambient module: `declare module "m";`
            self.end_statement();
            return Ok(NamespaceDecl {
                name,
                exported,
                body: Vec::new(),
                line,
            });
        }
        self.advance();
        let body = self.parse_statements(true)?;
        self.expect(Token::RBrace, "}")?;
        Ok(NamespaceDecl {
            name,
            exported,
            body,
            line,
        })
    }

    /// `const a: T, b: U;` after an optional `declare`.
    fn parse_variables(&mut self) -> Result<Vec<VariableDecl>, DetectError> {
        self.advance(); // const / let / var
        let mut vars = Vec::new();
        loop {
            let line = self.cur_line();
            let name = self.take_word()?;
            let ty = if self.eat(&Token::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            if self.eat(&Token::Eq) {
                // Ambient constants may only be initialised with a literal.
                match self.peek() {
                    Token::Str(_) | Token::Num(_) | Token::Template(_) => {
                        self.advance();
                    }
                    Token::Word(w) if w == "true" || w == "false" => {
                        self.advance();
                    }
                    _ => {
                        return Err(self.reject(
                            line,
                            format!("ambient variable '{}' has a non-literal initializer", name),
                        ));
                    }
                }
            }
            vars.push(VariableDecl { name, ty, line });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.end_statement();
        Ok(vars)
    }
}

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Parse one declaration document.
///
/// Fails with `Validation` for empty documents and executable content, and
/// with `Parse` for text that does not match the declaration grammar.
pub fn parse(name: &str, text: &str) -> Result<Document, DetectError> {
    if text.trim().is_empty() {
        return Err(DetectError::validation(name, 1, "document is empty"));
    }
    let tokens = lex(text, name)?;
    let mut p = Parser::new(&tokens, name);
    let statements = p.parse_statements(false)?;
    if p.peek() != &Token::Eof {
        return Err(p.err(format!("unexpected {:?} at top level", p.peek())));
    }
    Ok(Document {
        name: name.to_owned(),
        statements,
    })
}

/// Check that a document holds only declarative content and return its
/// trimmed text.
pub fn validate(name: &str, text: &str) -> Result<String, DetectError> {
    parse(name, text)?;
    Ok(text.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeExpr;

    fn doc(src: &str) -> Document {
        parse("test.d.ts", src).expect("document should parse")
    }

    #[test]
    fn parses_top_level_declarations() {
        let d = doc(
            "export interface Config { items: string[]; }\n\
             export type Mode = 'a' | 'b';\n\
             export declare function greet(name: string): string;\n",
        );
        assert_eq!(d.statements.len(), 3);
        assert!(matches!(&d.statements[0], Statement::Record(r) if r.name == "Config" && r.exported));
        assert!(matches!(&d.statements[1], Statement::TypeAlias(a) if a.name == "Mode"));
        assert!(matches!(&d.statements[2], Statement::Function(f) if f.name == "greet"));
    }

    #[test]
    fn export_list_marks_local_declarations() {
        let d = doc("type Internal = { value: string };\nexport type { Internal };");
        match &d.statements[0] {
            Statement::TypeAlias(a) => assert!(a.exported),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn imports_bind_local_names() {
        let d = doc(
            "import * as CSS from 'csstype';\n\
             import Default, { a, b as c } from 'm';\n\
             import type { T } from 'types';\n",
        );
        let names: Vec<String> = d
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::Import(i) => Some(i.names.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(names, vec!["CSS", "Default", "a", "c", "T"]);
    }

    #[test]
    fn namespaces_nest_statements() {
        let d = doc("export namespace Config { export interface Options { debug: boolean; } }");
        match &d.statements[0] {
            Statement::Namespace(ns) => {
                assert_eq!(ns.name, "Config");
                assert!(matches!(&ns.body[0], Statement::Record(r) if r.name == "Options"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = parse("empty.d.ts", "   \n ").unwrap_err();
        assert!(matches!(err, DetectError::Validation { .. }));
    }

    #[test]
    fn function_body_is_rejected() {
        let err = parse(
            "test.d.ts",
            "import * as CSS from 'csstype';\nfunction test() {\n console.log('test');\n}",
        )
        .unwrap_err();
        assert!(matches!(err, DetectError::Validation { line: 2, .. }));
    }

    #[test]
    fn value_export_is_rejected() {
        let err = parse("test.d.ts", "export const test = 'test';").unwrap_err();
        assert!(matches!(err, DetectError::Validation { .. }));
        assert!(parse("test.d.ts", "export declare const test: string;").is_ok());
    }

    #[test]
    fn default_export_is_rejected() {
        let err = parse("test.d.ts", "export default interface A {}").unwrap_err();
        assert!(matches!(err, DetectError::Validation { .. }));
    }

    #[test]
    fn enums_are_unsupported() {
        let err = parse("test.d.ts", "export enum Color { Red }").unwrap_err();
        assert!(matches!(err, DetectError::Parse { .. }));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse("bad.d.ts", "invalid typescript!!!").is_err());
    }

    #[test]
    fn validate_returns_trimmed_text() {
        let text = "\n  type A = string;\n";
        assert_eq!(validate("a.d.ts", text).unwrap(), "type A = string;");
    }

    #[test]
    fn ambient_module_declarations() {
        let d = doc("declare module 'lib' { const version: string; }\ndeclare global { interface Window { x: number } }");
        assert!(matches!(&d.statements[0], Statement::Namespace(n) if n.name == "lib"));
        match &d.statements[1] {
            Statement::Namespace(n) => {
                assert_eq!(n.name, "global");
                assert!(matches!(&n.body[0], Statement::Record(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn class_heritage_is_recorded() {
        let d = doc("export declare class B extends A<string> implements I { x: number; }");
        match &d.statements[0] {
            Statement::Record(r) => {
                assert_eq!(r.kind, RecordKind::Class);
                assert_eq!(r.heritage.len(), 2);
                assert!(matches!(&r.heritage[0], TypeExpr::Reference { name, args } if name == "A" && args.len() == 1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
