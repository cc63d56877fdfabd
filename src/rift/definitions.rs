//! Pattern-definition source scanning
//!
//! Pattern sets are written one definition per line, a symbolic name
//! followed by a pattern literal, with `#` line comments:
//!
//!     # lexical categories
//!     WORD    R"[a-z]+/gbt[t]"
//!     NUMBER  R"[0-9]+/gbt[t]"
//!
//! The scanner is a logos lexer; the literal itself is handed to
//! [PatternSpec::parse] untouched, so all literal-level diagnostics come
//! from the pattern parser.

use crate::rift::error::RiftError;
use crate::rift::pattern::PatternSpec;
use logos::Logos;

/// Tokens of the definitions format
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r]+")]
pub enum DefToken {
    #[regex(r"#[^\n]*")]
    Comment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,

    #[regex(r#"R"[^"\n]*""#)]
    #[regex(r"R'[^'\n]*'")]
    Literal,

    #[token("\n")]
    Newline,
}

/// Scan a definitions source into tagged pattern specs, in definition order
pub fn parse_definitions(source: &str) -> Result<Vec<PatternSpec>, RiftError> {
    let mut lexer = DefToken::lexer(source);
    let mut specs = Vec::new();
    let mut pending: Option<String> = None;

    while let Some(result) = lexer.next() {
        let token = result.map_err(|_| RiftError::InvalidSyntax {
            literal: lexer.slice().to_string(),
            reason: "unrecognized input in pattern definitions".to_string(),
        })?;
        match token {
            DefToken::Comment => {}
            DefToken::Newline => {
                if let Some(name) = pending.take() {
                    return Err(RiftError::InvalidSyntax {
                        literal: name,
                        reason: "definition name without a pattern literal".to_string(),
                    });
                }
            }
            DefToken::Name => {
                if let Some(previous) = pending.take() {
                    return Err(RiftError::InvalidSyntax {
                        literal: previous,
                        reason: "definition name without a pattern literal".to_string(),
                    });
                }
                pending = Some(lexer.slice().to_string());
            }
            DefToken::Literal => {
                let name = pending.take().ok_or_else(|| RiftError::InvalidSyntax {
                    literal: lexer.slice().to_string(),
                    reason: "pattern literal without a preceding name".to_string(),
                })?;
                specs.push(PatternSpec::parse(lexer.slice())?.tagged(name));
            }
        }
    }

    if let Some(name) = pending {
        return Err(RiftError::InvalidSyntax {
            literal: name,
            reason: "definition name without a pattern literal".to_string(),
        });
    }
    Ok(specs)
}
