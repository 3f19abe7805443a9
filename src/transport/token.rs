//! Wire tokens exchanged between the vision node and the edge node
//!
//! A token is the bare ASCII word, written once per event with no delimiter
//! or length prefix. The receiver treats the trimmed contents of one read as
//! the token; anything else (including two coalesced tokens) is unrecognized.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Token {
    Danger,
    Safe,
}

impl Token {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Danger => "DANGER",
            Self::Safe => "SAFE",
        }
    }

    pub const fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// Decode one received buffer. Returns `None` for anything that is not
    /// exactly one token after trimming whitespace.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match std::str::from_utf8(bytes).ok()?.trim() {
            "DANGER" => Some(Self::Danger),
            "SAFE" => Some(Self::Safe),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last verdict heard from the vision node.
///
/// `Absent` means nothing has been received on the current connection, or
/// the connection is gone. It never stands in for `Safe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemoteVerdict {
    #[default]
    Absent,
    Danger,
    Safe,
}

impl RemoteVerdict {
    pub const fn token(self) -> Option<Token> {
        match self {
            Self::Absent => None,
            Self::Danger => Some(Token::Danger),
            Self::Safe => Some(Token::Safe),
        }
    }

    pub const fn is_danger(self) -> bool {
        matches!(self, Self::Danger)
    }
}

impl From<Token> for RemoteVerdict {
    fn from(token: Token) -> Self {
        match token {
            Token::Danger => Self::Danger,
            Token::Safe => Self::Safe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_tokens() {
        assert_eq!(Token::parse(b"DANGER"), Some(Token::Danger));
        assert_eq!(Token::parse(b"SAFE"), Some(Token::Safe));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(Token::parse(b"  SAFE\r\n"), Some(Token::Safe));
    }

    #[test]
    fn test_coalesced_tokens_are_unrecognized() {
        assert_eq!(Token::parse(b"DANGERSAFE"), None);
        assert_eq!(Token::parse(b"SAFESAFE"), None);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Token::parse(b"danger"), None);
    }

    #[test]
    fn test_invalid_utf8_is_unrecognized() {
        assert_eq!(Token::parse(&[0xFF, 0xFE]), None);
    }

    #[test]
    fn test_serde_uses_wire_spelling() {
        let json = serde_json::to_string(&Token::Danger).expect("serialize");
        assert_eq!(json, "\"DANGER\"");
    }

    #[test]
    fn test_verdict_from_token() {
        assert_eq!(RemoteVerdict::from(Token::Safe).token(), Some(Token::Safe));
        assert_eq!(RemoteVerdict::default().token(), None);
        assert!(RemoteVerdict::Danger.is_danger());
    }
}
