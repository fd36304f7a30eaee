//! A small PHP lexer. It knows just enough of the language to find function
//! declarations reliably: comments, strings and heredocs are recognised so
//! that a `function` inside them is never mistaken for a keyword.

use std::sync::LazyLock;

use regex::Regex;

/// Heredoc / nowdoc opener: `<<<LABEL`, `<<<"LABEL"` or `<<<'LABEL'`.
static HEREDOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^<<<[ \t]*(?:"([A-Za-z_][A-Za-z0-9_]*)"|'([A-Za-z_][A-Za-z0-9_]*)'|([A-Za-z_][A-Za-z0-9_]*))\r?\n"#,
    )
    .unwrap()
});

const KEYWORDS: &[&str] = &[
    "abstract", "and", "array", "as", "break", "callable", "case", "catch", "class", "clone",
    "const", "continue", "declare", "default", "do", "echo", "else", "elseif", "empty",
    "enddeclare", "endfor", "endforeach", "endif", "endswitch", "endwhile", "enum", "extends",
    "final", "finally", "fn", "for", "foreach", "function", "global", "goto", "if", "implements",
    "include", "include_once", "instanceof", "insteadof", "interface", "isset", "list", "match",
    "namespace", "new", "or", "print", "private", "protected", "public", "readonly", "require",
    "require_once", "return", "static", "switch", "throw", "trait", "try", "unset", "use", "var",
    "while", "xor", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    InlineHtml,
    OpenTag,
    CloseTag,
    Whitespace,
    Comment,
    DocComment,
    Keyword,
    Identifier,
    Variable,
    String,
    Number,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line the token starts on.
    pub line: u32,
}

impl Token {
    /// Whitespace and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }

    /// Keywords and identifiers. PHP accepts reserved words as method names.
    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Keyword | TokenKind::Identifier)
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// The tokens of one source file.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn tokenize(source: &str) -> Self {
        Self {
            tokens: Lexer::new(source).run(),
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// A fresh cursor positioned before the first token.
    pub fn cursor(&self) -> TokenCursor<'_> {
        TokenCursor {
            tokens: &self.tokens,
            pos: 0,
        }
    }
}

/// Forward-only position in a token stream.
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    /// Index of the next token to be examined.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Advance past the next token satisfying `pred` and return it. On a miss
    /// the cursor ends up at the end of the stream.
    pub fn find_next<P>(&mut self, mut pred: P) -> Option<&'a Token>
    where
        P: FnMut(&Token) -> bool,
    {
        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            if pred(token) {
                return Some(token);
            }
        }
        None
    }

    pub fn next_significant(&mut self) -> Option<&'a Token> {
        self.find_next(|t| !t.is_trivia())
    }

    /// Find the next `function <name>` declaration and return the name token.
    ///
    /// The cursor only moves when a declaration is found; a miss leaves it
    /// where it was.
    pub fn find_function_declaration(&mut self, name: &str) -> Option<&'a Token> {
        let mut probe = self.clone();
        while probe.find_next(|t| t.is_keyword("function")).is_some() {
            let mut after = probe.clone();
            let mut next = after.next_significant();
            // function &byReference()
            if next.is_some_and(|t| t.kind == TokenKind::Other && t.text == "&") {
                next = after.next_significant();
            }
            if let Some(token) = next.filter(|t| t.is_word() && t.text == name) {
                *self = after;
                return Some(token);
            }
        }
        None
    }
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_word_byte(b: u8) -> bool {
    is_word_start(b) || b.is_ascii_digit()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    in_php: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            in_php: false,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while self.pos < self.src.len() {
            if self.in_php {
                self.lex_php();
            } else {
                self.lex_inline_html();
            }
        }
        self.tokens
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    /// Emit the text from the current position up to `end` (byte offset).
    fn emit(&mut self, kind: TokenKind, end: usize) {
        let text = &self.src[self.pos..end];
        self.tokens.push(Token {
            kind,
            text: text.to_string(),
            line: self.line,
        });
        self.line += text.bytes().filter(|&b| b == b'\n').count() as u32;
        self.pos = end;
    }

    fn lex_inline_html(&mut self) {
        let rest = self.rest();
        match rest.find("<?") {
            Some(0) => {
                let tag_len = if rest
                    .as_bytes()
                    .get(..5)
                    .is_some_and(|b| b.eq_ignore_ascii_case(b"<?php"))
                {
                    5
                } else if rest.starts_with("<?=") {
                    3
                } else {
                    2
                };
                self.emit(TokenKind::OpenTag, self.pos + tag_len);
                self.in_php = true;
            }
            Some(idx) => self.emit(TokenKind::InlineHtml, self.pos + idx),
            None => self.emit(TokenKind::InlineHtml, self.src.len()),
        }
    }

    fn lex_php(&mut self) {
        let b = self.bytes()[self.pos];
        let rest = self.rest();

        if b.is_ascii_whitespace() {
            let len = rest
                .bytes()
                .position(|c| !c.is_ascii_whitespace())
                .unwrap_or(rest.len());
            self.emit(TokenKind::Whitespace, self.pos + len);
        } else if rest.starts_with("?>") {
            self.emit(TokenKind::CloseTag, self.pos + 2);
            self.in_php = false;
        } else if rest.starts_with("#[") {
            self.emit(TokenKind::Other, self.pos + 2);
        } else if b == b'#' || rest.starts_with("//") {
            self.lex_line_comment();
        } else if rest.starts_with("/*") {
            let kind = if rest.starts_with("/**")
                && rest.as_bytes().get(3).is_some_and(|c| c.is_ascii_whitespace())
            {
                TokenKind::DocComment
            } else {
                TokenKind::Comment
            };
            let end = rest[2..]
                .find("*/")
                .map(|i| self.pos + 2 + i + 2)
                .unwrap_or(self.src.len());
            self.emit(kind, end);
        } else if b == b'\'' {
            let end = self.quoted_end(b'\'');
            self.emit(TokenKind::String, end);
        } else if b == b'"' || b == b'`' {
            let end = self.quoted_end(b);
            self.emit(TokenKind::String, end);
        } else if rest.starts_with("<<<") {
            self.lex_heredoc();
        } else if b == b'$' && self.peek(1).is_some_and(is_word_start) {
            let end = self.word_end(self.pos + 1);
            self.emit(TokenKind::Variable, end);
        } else if b.is_ascii_digit() {
            let len = rest
                .bytes()
                .position(|c| !(c.is_ascii_alphanumeric() || c == b'_' || c == b'.'))
                .unwrap_or(rest.len());
            self.emit(TokenKind::Number, self.pos + len);
        } else if is_word_start(b) {
            self.lex_word();
        } else if rest.starts_with("?->") {
            self.emit(TokenKind::Other, self.pos + 3);
        } else if rest.starts_with("->") || rest.starts_with("::") {
            self.emit(TokenKind::Other, self.pos + 2);
        } else {
            self.emit(TokenKind::Other, self.pos + 1);
        }
    }

    /// `#` and `//` comments run to the end of the line or a closing tag.
    fn lex_line_comment(&mut self) {
        let rest = self.rest();
        let newline = rest.find('\n').unwrap_or(rest.len());
        let close = rest.find("?>").unwrap_or(rest.len());
        self.emit(TokenKind::Comment, self.pos + newline.min(close));
    }

    fn lex_word(&mut self) {
        let end = self.word_end(self.pos);
        let word = &self.src[self.pos..end];

        // After `->`, `?->` and `::` every word is a member name.
        let member_access = self
            .tokens
            .iter()
            .rev()
            .find(|t| !t.is_trivia())
            .is_some_and(|t| matches!(t.text.as_str(), "->" | "?->" | "::"));

        let kind = if !member_access && KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k)) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.emit(kind, end);
    }

    fn lex_heredoc(&mut self) {
        let Some(caps) = HEREDOC_RE.captures(self.rest()) else {
            // A `<<<` that opens nothing, e.g. shift followed by `<`.
            self.emit(TokenKind::Other, self.pos + 1);
            return;
        };
        let Some(label) = caps.get(1).or(caps.get(2)).or(caps.get(3)) else {
            self.emit(TokenKind::Other, self.pos + 1);
            return;
        };
        let label = label.as_str();
        let body_start = self.pos + caps.get(0).map_or(0, |m| m.end());

        // The closing label may be indented and must not run into a word.
        let mut line_start = body_start;
        let mut end = self.src.len();
        while line_start < self.src.len() {
            let line = &self.src[line_start..];
            let indent = line
                .bytes()
                .position(|c| c != b' ' && c != b'\t')
                .unwrap_or(line.len());
            let trimmed = &line[indent..];
            if trimmed.starts_with(label)
                && !trimmed
                    .as_bytes()
                    .get(label.len())
                    .is_some_and(|&c| is_word_byte(c))
            {
                end = line_start + indent + label.len();
                break;
            }
            match line.find('\n') {
                Some(nl) => line_start += nl + 1,
                None => break,
            }
        }
        self.emit(TokenKind::String, end);
    }

    /// End offset of a quoted string starting at the current position.
    /// Unterminated strings run to the end of the input.
    fn quoted_end(&self, quote: u8) -> usize {
        let bytes = self.bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                c if c == quote => return i + 1,
                _ => i += 1,
            }
        }
        bytes.len()
    }

    fn word_end(&self, from: usize) -> usize {
        let bytes = self.bytes();
        let mut i = from;
        while i < bytes.len() && is_word_byte(bytes[i]) {
            i += 1;
        }
        i
    }
}
