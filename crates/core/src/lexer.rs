//! Tokenizer for prop expression strings.
//!
//! The separators below are a persisted wire format: they are stored in
//! config and content, so each character keeps exactly one role.

use crate::error::GrammarError;

/// Leading marker of expressions that reach into structured data.
/// U+2139 INFORMATION SOURCE followed by U+FE0E VARIATION SELECTOR-15.
pub const STRUCTURED_DATA_PREFIX: &str = "\u{2139}\u{FE0E}";
/// Leading marker of expressions that reach into a component instance.
pub const COMPONENT_PREFIX: char = '\u{2FF2}';

pub const ENTITY_LEVEL: char = '\u{241C}';
pub const FIELD_LEVEL: char = '\u{241D}';
pub const FIELD_ITEM_LEVEL: char = '\u{241E}';
pub const PROPERTY_LEVEL: char = '\u{241F}';

pub const OBJECT_OPEN: char = '{';
pub const OBJECT_CLOSE: char = '}';
pub const OBJECT_SEPARATOR: char = ',';
/// `sourceProp↠targetProp`
pub const USE_PROP: char = '\u{21A0}';
/// `sourceProp↝<reference chain>`
pub const FOLLOW_REFERENCE: char = '\u{219D}';

// The C0 control codes the level symbols depict. Accepted on parse, never
// emitted.
const ENTITY_LEVEL_CONTROL: char = '\u{001C}';
const FIELD_LEVEL_CONTROL: char = '\u{001D}';
const FIELD_ITEM_LEVEL_CONTROL: char = '\u{001E}';

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StructuredData,
    Component,
    EntityLevel,
    FieldLevel,
    FieldItemLevel,
    PropertyLevel,
    LBrace,
    RBrace,
    Comma,
    UseProp,
    FollowReference,
    /// A run of name characters: `[A-Za-z0-9_.:-]+`
    Name(String),
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::StructuredData => "structured data marker".to_owned(),
            Token::Component => "component marker".to_owned(),
            Token::EntityLevel => format!("entity separator '{}'", ENTITY_LEVEL),
            Token::FieldLevel => format!("field separator '{}'", FIELD_LEVEL),
            Token::FieldItemLevel => format!("field item separator '{}'", FIELD_ITEM_LEVEL),
            Token::PropertyLevel => format!("property separator '{}'", PROPERTY_LEVEL),
            Token::LBrace => "'{'".to_owned(),
            Token::RBrace => "'}'".to_owned(),
            Token::Comma => "','".to_owned(),
            Token::UseProp => format!("'{}'", USE_PROP),
            Token::FollowReference => format!("'{}'", FOLLOW_REFERENCE),
            Token::Name(n) => format!("name '{}'", n),
            Token::Eof => "end of input".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// Character offset into the source string.
    pub offset: usize,
}

pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')
}

pub fn lex(src: &str) -> Result<Vec<Spanned>, GrammarError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];
        let start = pos;

        if c == '\u{2139}' {
            if chars.get(pos + 1) != Some(&'\u{FE0E}') {
                return Err(GrammarError::malformed(
                    src,
                    pos,
                    "structured data marker must be followed by U+FE0E",
                ));
            }
            tokens.push(Spanned {
                token: Token::StructuredData,
                offset: start,
            });
            pos += 2;
            continue;
        }

        let token = match c {
            COMPONENT_PREFIX => Some(Token::Component),
            ENTITY_LEVEL | ENTITY_LEVEL_CONTROL => Some(Token::EntityLevel),
            FIELD_LEVEL | FIELD_LEVEL_CONTROL => Some(Token::FieldLevel),
            FIELD_ITEM_LEVEL | FIELD_ITEM_LEVEL_CONTROL => Some(Token::FieldItemLevel),
            PROPERTY_LEVEL => Some(Token::PropertyLevel),
            OBJECT_OPEN => Some(Token::LBrace),
            OBJECT_CLOSE => Some(Token::RBrace),
            OBJECT_SEPARATOR => Some(Token::Comma),
            USE_PROP => Some(Token::UseProp),
            FOLLOW_REFERENCE => Some(Token::FollowReference),
            _ => None,
        };
        if let Some(token) = token {
            tokens.push(Spanned {
                token,
                offset: start,
            });
            pos += 1;
            continue;
        }

        if is_name_char(c) {
            while pos < chars.len() && is_name_char(chars[pos]) {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Name(name),
                offset: start,
            });
            continue;
        }

        return Err(GrammarError::malformed(
            src,
            pos,
            format!("unexpected character {:?}", c),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: chars.len(),
    });
    Ok(tokens)
}
