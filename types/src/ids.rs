use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ROOM_CODE_LEN;

/// Identifies one live client connection for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Characters a room code may contain.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomCodeError {
    #[error("room code must be exactly {expected} characters (got {got})")]
    BadLength { expected: usize, got: usize },
    #[error("room code may only contain A-Z and 0-9")]
    BadCharacter,
}

/// A room's lookup key: four uppercase alphanumeric characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode([u8; ROOM_CODE_LEN]);

impl RoomCode {
    /// Draw a fresh code uniformly from the code space. Uniqueness against
    /// the set of live rooms is the caller's concern.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut code = [0u8; ROOM_CODE_LEN];
        for slot in code.iter_mut() {
            *slot = CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())];
        }
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only ASCII from CODE_ALPHABET is ever stored.
        std::str::from_utf8(&self.0).expect("room code is ASCII")
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.len() != ROOM_CODE_LEN {
            return Err(RoomCodeError::BadLength {
                expected: ROOM_CODE_LEN,
                got: upper.len(),
            });
        }
        let mut code = [0u8; ROOM_CODE_LEN];
        for (slot, ch) in code.iter_mut().zip(upper.bytes()) {
            if !CODE_ALPHABET.contains(&ch) {
                return Err(RoomCodeError::BadCharacter);
            }
            *slot = ch;
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RoomCodeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_codes_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
            // Round-trips through its own display form.
            assert_eq!(code.as_str().parse::<RoomCode>(), Ok(code));
        }
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let code: RoomCode = " ab3z ".parse().expect("valid code");
        assert_eq!(code.as_str(), "AB3Z");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            "AB".parse::<RoomCode>(),
            Err(RoomCodeError::BadLength {
                expected: ROOM_CODE_LEN,
                got: 2
            })
        );
        assert!(matches!(
            "AB!Z".parse::<RoomCode>(),
            Err(RoomCodeError::BadCharacter)
        ));
    }
}
