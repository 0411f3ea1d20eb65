//! Connection tokens.

use serde::{Deserialize, Serialize};

/// Separator between the identity, name, and suffix segments of a token.
pub const TOKEN_SEPARATOR: char = '~';

/// Addressable name of one live connection.
///
/// Composed as `identity~name~suffix` so the owning identity can always be
/// recovered from the token itself. Tokens are minted once per connection and
/// never mutated; the registry is their only owner.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Compose a token from its three segments.
    pub fn compose(identity: &str, name: &str, suffix: &str) -> Self {
        Self(format!(
            "{identity}{TOKEN_SEPARATOR}{name}{TOKEN_SEPARATOR}{suffix}"
        ))
    }

    /// The identity segment, or `None` when the string lacks the separator.
    pub fn identity(&self) -> Option<&str> {
        self.0.split_once(TOKEN_SEPARATOR).map(|(identity, _)| identity)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_puts_identity_and_name_first() {
        let token = Token::compose("9-9", "raja", "1234");
        let segments: Vec<&str> = token.as_str().split(TOKEN_SEPARATOR).collect();
        assert_eq!(segments[0], "9-9");
        assert_eq!(segments[1], "raja");
        assert_eq!(segments[2], "1234");
    }

    #[test]
    fn identity_of_malformed_token_is_none() {
        assert_eq!(Token::from("x").identity(), None);
        assert_eq!(Token::compose("1-1", "gopal", "99").identity(), Some("1-1"));
    }
}
