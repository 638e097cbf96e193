//! Code tokenization for highlighting.

use syntect::{
    parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use thiserror::Error;

/// Syntax highlighting errors.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// No grammar is registered for the language.
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// The grammar failed while tokenizing.
    #[error("tokenizing failed: {0}")]
    Tokenize(String),
}

/// A run of source text with an optional token class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub class: Option<String>,
    pub text: String,
}

/// Scope prefixes mapped to token classes, most specific first.
const CLASS_MAP: &[(&str, &str)] = &[
    ("comment", "comment"),
    ("string", "string"),
    ("constant.numeric", "number"),
    ("constant.character.escape", "escape"),
    ("constant", "constant"),
    ("keyword.operator", "operator"),
    ("keyword", "keyword"),
    ("storage", "keyword"),
    ("entity.name.function", "function"),
    ("support.function", "function"),
    ("variable.function", "function"),
    ("entity.name.tag", "tag"),
    ("entity.other.attribute-name", "attr-name"),
    ("entity.name", "class-name"),
    ("support.type", "class-name"),
    ("support.class", "class-name"),
    ("punctuation", "punctuation"),
    ("variable", "variable"),
];

/// Syntax tokenizer using syntect grammars.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    /// Create a tokenizer with the default grammars.
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Get available language names.
    pub fn available_languages(&self) -> Vec<&str> {
        self.syntax_set
            .syntaxes()
            .iter()
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Whether a grammar is registered for `lang`.
    pub fn supports(&self, lang: &str) -> bool {
        self.find(lang).is_some()
    }

    fn find(&self, lang: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_token(&lang.to_lowercase()))
    }

    /// Split code into classed tokens. Adjacent runs with the same class are merged.
    pub fn tokenize(&self, code: &str, lang: &str) -> Result<Vec<Token>, SyntaxError> {
        let syntax = self
            .find(lang)
            .ok_or_else(|| SyntaxError::UnknownLanguage(lang.to_string()))?;

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut tokens: Vec<Token> = Vec::new();

        for line in LinesWithEndings::from(code) {
            let ops = state
                .parse_line(line, &self.syntax_set)
                .map_err(|e| SyntaxError::Tokenize(e.to_string()))?;

            let mut cursor = 0;
            for (offset, op) in ops {
                if offset > cursor {
                    push_token(&mut tokens, classify(&stack), &line[cursor..offset]);
                    cursor = offset;
                }
                stack
                    .apply(&op)
                    .map_err(|e| SyntaxError::Tokenize(format!("{e:?}")))?;
            }
            if cursor < line.len() {
                push_token(&mut tokens, classify(&stack), &line[cursor..]);
            }
        }

        Ok(tokens)
    }
}

fn push_token(tokens: &mut Vec<Token>, class: Option<&'static str>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = tokens.last_mut()
        && last.class.as_deref() == class
    {
        last.text.push_str(text);
        return;
    }
    tokens.push(Token {
        class: class.map(str::to_string),
        text: text.to_string(),
    });
}

/// Class of the innermost scope that is not a source, text or meta scope.
fn classify(stack: &ScopeStack) -> Option<&'static str> {
    stack.as_slice().iter().rev().find_map(|scope| {
        let name = scope.build_string();
        if ["source", "text", "meta"]
            .iter()
            .any(|root| name == *root || name.starts_with(&format!("{root}.")))
        {
            return None;
        }
        CLASS_MAP
            .iter()
            .find(|(prefix, _)| name == *prefix || name.starts_with(&format!("{prefix}.")))
            .map(|(_, class)| *class)
    })
}
