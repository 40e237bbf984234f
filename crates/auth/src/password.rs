use crate::error::{AuthError, Result};

pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const MIN_BCRYPT_COST: u32 = 10;

/// Bcrypt password hashing with a configurable work factor. The cost is
/// clamped to a floor so a bad config value cannot weaken stored hashes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.max(MIN_BCRYPT_COST),
        }
    }

    pub fn from_env() -> Self {
        let cost = std::env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BCRYPT_COST);

        Self::new(cost)
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with bcrypt
    pub fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AuthError::PasswordHashError(e.to_string()))
    }

    /// Verify a password against a stored hash. Timing-safe inside bcrypt.
    pub fn verify(password: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(password, hash).map_err(|e| AuthError::PasswordHashError(e.to_string()))
    }

    /// True when the stored hash was produced at a lower cost than the
    /// current setting and should be regenerated on next successful login.
    /// Malformed hashes also report true so they get replaced.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        match parse_cost(hash) {
            Some(cost) => cost < self.cost,
            None => true,
        }
    }
}

// Bcrypt hashes look like $2b$12$<salt+digest>; the second field is the cost.
fn parse_cost(hash: &str) -> Option<u32> {
    hash.split('$').nth(2)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests run at the cost floor to stay fast
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_BCRYPT_COST)
    }

    #[test]
    fn hash_and_verify() {
        let h = hasher();
        let hash = h.hash("CorrectHorse9!").unwrap();

        assert!(PasswordHasher::verify("CorrectHorse9!", &hash).unwrap());
        assert!(!PasswordHasher::verify("WrongHorse9!", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let h = hasher();
        let a = h.hash("CorrectHorse9!").unwrap();
        let b = h.hash("CorrectHorse9!").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn cost_floor_is_enforced() {
        let h = PasswordHasher::new(4);
        assert_eq!(h.cost(), MIN_BCRYPT_COST);
    }

    #[test]
    fn rehash_detection() {
        let low = PasswordHasher::new(MIN_BCRYPT_COST);
        let hash = low.hash("CorrectHorse9!").unwrap();

        assert!(!low.needs_rehash(&hash));

        let high = PasswordHasher::new(MIN_BCRYPT_COST + 1);
        assert!(high.needs_rehash(&hash));
    }

    #[test]
    fn malformed_hash_needs_rehash() {
        let h = hasher();
        assert!(h.needs_rehash("not-a-bcrypt-hash"));
        assert!(h.needs_rehash(""));
        assert!(h.needs_rehash("$2b$garbage$rest"));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(PasswordHasher::verify("password", "not-a-hash").is_err());
    }
}
