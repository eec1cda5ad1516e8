//! Custom-element name validation.
//!
//! The registry rejects malformed names with an opaque DOM exception, so
//! names are validated on the Rust side first: a valid name starts with a
//! lowercase ASCII letter, contains at least one hyphen, consists of
//! potential-custom-element-name characters, and is not one of the handful
//! of hyphenated names reserved by SVG/MathML.

use std::error::Error;
use std::fmt;

/// A validated custom-element name.
#[derive(Clone, PartialEq, Eq)]
pub struct ElementName {
    name: String,
}

impl ElementName {
    /// Validate `name` against the custom-element name rules.
    pub fn parse(name: &str) -> Result<Self, InvalidElementName> {
        if RESERVED_NAMES.contains(&name) {
            return Err(InvalidElementName::Reserved {
                name: name.to_string(),
            });
        }

        let mut chars = name.chars().enumerate();

        let Some((_, first)) = chars.next() else {
            return Err(InvalidElementName::Empty);
        };

        if !first.is_ascii_lowercase() {
            return Err(InvalidElementName::InvalidChar {
                name: name.to_string(),
                ch: first,
                position: 0,
            });
        }

        let mut has_hyphen = false;

        for (position, ch) in chars {
            if !valid_tail_char(ch) {
                return Err(InvalidElementName::InvalidChar {
                    name: name.to_string(),
                    ch,
                    position,
                });
            }

            if ch == '-' {
                has_hyphen = true;
            }
        }

        if !has_hyphen {
            return Err(InvalidElementName::MissingHyphen {
                name: name.to_string(),
            });
        }

        Ok(ElementName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl AsRef<str> for ElementName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name, f)
    }
}

impl fmt::Debug for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.name, f)
    }
}

/// Why a candidate name failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidElementName {
    Empty,
    Reserved { name: String },
    MissingHyphen { name: String },
    InvalidChar { name: String, ch: char, position: usize },
}

impl fmt::Display for InvalidElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidElementName::Empty => {
                write!(f, "the empty string is not a valid custom element name")
            }
            InvalidElementName::Reserved { name } => {
                write!(f, "`{name}` is a reserved element name")
            }
            InvalidElementName::MissingHyphen { name } => {
                write!(f, "`{name}` is not a valid custom element name; must contain a hyphen")
            }
            InvalidElementName::InvalidChar { name, ch, position } => {
                write!(
                    f,
                    "`{name}` is not a valid custom element name; invalid character `{ch}` at position {position}"
                )
            }
        }
    }
}

impl Error for InvalidElementName {}

// Hyphenated names claimed by SVG and MathML.
const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

// The potential-custom-element-name character set (after the first char).
fn valid_tail_char(c: char) -> bool {
    matches!(c,
        '-' | '.' | '_'
        | '0'..='9'
        | 'a'..='z'
        | '\u{B7}'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{203F}'..='\u{2040}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}
