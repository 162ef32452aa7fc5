//! Token types and generation.
//!
//! A session token is an opaque bearer credential: a fixed-length string of
//! ASCII letters and digits with no internal structure. Its only meaning is
//! as a key in the session store.
//!
//! Tokens must come from a cryptographically secure source. A guessable
//! token is as good as a leaked password, so [`TokenGenerator`] only accepts
//! RNGs that implement [`CryptoRng`].

use std::fmt;

use rand::distr::Alphanumeric;
use rand::{CryptoRng, Rng};

/// Default token length in characters.
///
/// 64 characters over a 62-symbol alphabet is ~381 bits of entropy.
pub const DEFAULT_TOKEN_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// SessionToken
// ---------------------------------------------------------------------------

/// An issued bearer token.
///
/// `Display` and `Debug` only show the first few characters so tokens don't
/// end up in logs in full. Use [`as_str`](Self::as_str) to get the secret.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a raw token string. No validation is done here; the session
    /// manager checks format before it touches the store.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the full token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the full token string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns `true` if this token has exactly `length` characters, all of
    /// them ASCII letters or digits.
    pub fn is_well_formed(&self, length: usize) -> bool {
        self.0.len() == length
            && self.0.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    /// First characters of the token, safe to log.
    fn redacted(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(6)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", self.redacted())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}…)", self.redacted())
    }
}

// ---------------------------------------------------------------------------
// TokenSource
// ---------------------------------------------------------------------------

/// Produces candidate tokens for the session manager.
///
/// The production source is [`TokenGenerator`]. Tests plug in scripted
/// sources to force collisions deterministically.
pub trait TokenSource: Send + Sync + 'static {
    /// Produces the next candidate token.
    fn next_token(&self) -> SessionToken;
}

// ---------------------------------------------------------------------------
// TokenGenerator
// ---------------------------------------------------------------------------

/// Generates random alphanumeric tokens of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct TokenGenerator {
    length: usize,
}

impl TokenGenerator {
    /// Creates a generator producing tokens of `length` characters.
    ///
    /// A zero length is accepted here but rejected by
    /// `SessionConfig::validate` before a manager is ever built.
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Generates a token from the thread-local CSPRNG.
    pub fn generate(&self) -> SessionToken {
        Self::generate_with(&mut rand::rng(), self.length)
    }

    /// Generates a token of `length` characters from the given RNG.
    ///
    /// `Alphanumeric` samples uniformly from `[A-Za-z0-9]`.
    pub fn generate_with<R>(rng: &mut R, length: usize) -> SessionToken
    where
        R: Rng + CryptoRng + ?Sized,
    {
        let token: String = rng
            .sample_iter(Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        SessionToken(token)
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}

impl TokenSource for TokenGenerator {
    fn next_token(&self) -> SessionToken {
        self.generate()
    }
}
