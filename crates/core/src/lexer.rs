use crate::error::DetectError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords, distinguished in the parser
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Backtick template literal, raw content between the backticks
    Template(String),
    /// Numeric literal, kept as written
    Num(String),
    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    /// `<`, also opens type parameter and argument lists
    Lt,
    /// `>`, never merged with a following `>` so nested generics close cleanly
    Gt,
    Colon,
    Semi,
    Comma,
    Dot,
    Question,
    Pipe,
    Amp,
    Eq,
    Arrow,    // =>
    Ellipsis, // ...
    Plus,
    Minus,
    Star,
    At,
    Bang,
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

pub fn lex(src: &str, filename: &str) -> Result<Vec<Spanned>, DetectError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;

    while pos < chars.len() {
        let c = chars[pos];

        // Line comment (also covers `/// <reference ... />` directives)
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        // Block comment
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '*' {
            pos += 2;
            loop {
                if pos >= chars.len() {
                    return Err(DetectError::parse(filename, line, "unterminated block comment"));
                }
                if chars[pos] == '\n' {
                    line += 1;
                }
                if chars[pos] == '*' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            continue;
        }

        // Whitespace
        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
            }
            pos += 1;
            continue;
        }

        let tok_line = line;

        // String literal, either quote style
        if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(DetectError::parse(
                        filename,
                        tok_line,
                        "unterminated string literal",
                    ));
                }
                let sc = chars[pos];
                if sc == quote {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    if pos >= chars.len() {
                        return Err(DetectError::parse(
                            filename,
                            tok_line,
                            "unterminated escape in string",
                        ));
                    }
                    match chars[pos] {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => s.push(other),
                    }
                    pos += 1;
                    continue;
                }
                if sc == '\n' {
                    return Err(DetectError::parse(
                        filename,
                        tok_line,
                        "unterminated string literal",
                    ));
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                line: tok_line,
            });
            continue;
        }

        // Template literal kept raw; `${...}` holes are not parsed
        if c == '`' {
            pos += 1;
            let start = pos;
            let mut depth = 0u32;
            loop {
                if pos >= chars.len() {
                    return Err(DetectError::parse(
                        filename,
                        tok_line,
                        "unterminated template literal",
                    ));
                }
                match chars[pos] {
                    '\\' => pos += 1,
                    '\n' => line += 1,
                    '$' if pos + 1 < chars.len() && chars[pos + 1] == '{' => {
                        depth += 1;
                        pos += 1;
                    }
                    '}' if depth > 0 => depth -= 1,
                    '`' if depth == 0 => break,
                    _ => {}
                }
                pos += 1;
            }
            let raw: String = chars[start..pos].iter().collect();
            pos += 1; // closing backtick
            tokens.push(Spanned {
                token: Token::Template(raw),
                line: tok_line,
            });
            continue;
        }

        // Number (a leading '-' is only part of the literal when a digit follows)
        if c.is_ascii_digit()
            || (c == '-' && pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit())
        {
            let start = pos;
            if c == '-' {
                pos += 1;
            }
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            if pos < chars.len()
                && chars[pos] == '.'
                && pos + 1 < chars.len()
                && chars[pos + 1].is_ascii_digit()
            {
                pos += 1; // consume '.'
                while pos < chars.len() && chars[pos].is_ascii_alphanumeric() {
                    pos += 1;
                }
            }
            let s: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Num(s),
                line: tok_line,
            });
            continue;
        }

        // Multi-character punctuation
        if c == '=' && pos + 1 < chars.len() && chars[pos + 1] == '>' {
            tokens.push(Spanned {
                token: Token::Arrow,
                line: tok_line,
            });
            pos += 2;
            continue;
        }
        if c == '.' && pos + 2 < chars.len() && chars[pos + 1] == '.' && chars[pos + 2] == '.' {
            tokens.push(Spanned {
                token: Token::Ellipsis,
                line: tok_line,
            });
            pos += 3;
            continue;
        }

        // Single-character punctuation
        let punct = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '<' => Some(Token::Lt),
            '>' => Some(Token::Gt),
            ':' => Some(Token::Colon),
            ';' => Some(Token::Semi),
            ',' => Some(Token::Comma),
            '.' => Some(Token::Dot),
            '?' => Some(Token::Question),
            '|' => Some(Token::Pipe),
            '&' => Some(Token::Amp),
            '=' => Some(Token::Eq),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '@' => Some(Token::At),
            '!' => Some(Token::Bang),
            _ => None,
        };
        if let Some(token) = punct {
            tokens.push(Spanned {
                token,
                line: tok_line,
            });
            pos += 1;
            continue;
        }

        // Identifier / keyword (`#name` is a private class member)
        if c.is_alphabetic() || c == '_' || c == '$' || c == '#' {
            let start = pos;
            pos += 1;
            while pos < chars.len()
                && (chars[pos].is_alphanumeric() || chars[pos] == '_' || chars[pos] == '$')
            {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Word(word),
                line: tok_line,
            });
            continue;
        }

        return Err(DetectError::parse(
            filename,
            tok_line,
            format!("unexpected character '{}'", c),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
    });
    Ok(tokens)
}
