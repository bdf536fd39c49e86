use std::{fmt::Display, str::FromStr};

/// The address of one actor: `{domain}#{id}`.
///
/// The domain names the address space the actor lives in. Events addressed
/// to a token in the local domain are queued, anything else is handed to the
/// transport. Tokens are the only identity that survives a snapshot, so
/// actors refer to each other by token and never by pointer.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

const ID_BYTES: usize = 16;

impl Token {
    /// Generate a fresh token in `domain` from 16 random bytes.
    pub fn generate<R: rand::Rng + ?Sized>(rng: &mut R, domain: &str) -> Self {
        let mut bytes = [0u8; ID_BYTES];
        rng.fill(&mut bytes[..]);
        Token(format!("{}#{}", domain, bs58::encode(bytes).into_string()))
    }

    /// Build a token from a domain and an id chosen by the caller.
    pub fn new(domain: &str, id: &str) -> Result<Self, BadToken> {
        Self::parse(&format!("{domain}#{id}"))
    }

    pub fn parse(s: &str) -> Result<Self, BadToken> {
        let Some((domain, id)) = s.split_once('#') else {
            return Err(BadToken(s.to_string()));
        };
        if !is_valid_domain(domain) || id.is_empty() || id.contains(['#', '~']) {
            return Err(BadToken(s.to_string()));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(BadToken(s.to_string()));
        }
        Ok(Token(s.to_string()))
    }

    pub fn domain(&self) -> &str {
        self.0.split_once('#').map(|(d, _)| d).unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        self.0.split_once('#').map(|(_, id)| id).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local_to(&self, domain: &str) -> bool {
        self.domain() == domain
    }
}

pub(crate) fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && !domain.starts_with('~')
        && !domain.contains('#')
        && !domain.chars().any(char::is_whitespace)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid token: {0:?}")]
pub struct BadToken(pub String);

impl TryFrom<String> for Token {
    type Error = BadToken;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Token::parse(&value)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl FromStr for Token {
    type Err = BadToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::parse(s)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({})", self.0)
    }
}
