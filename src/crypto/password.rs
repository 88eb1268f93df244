use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const SCHEME: &str = "pbkdf2-sha256";
/// Upper bound on the iteration count accepted from a stored hash.
const MAX_ITERATIONS: u32 = 10_000_000;

/// Derived password hash, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedHash {
    bytes: [u8; HASH_LENGTH],
}

impl DerivedHash {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut bytes = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        Self { bytes }
    }
}

/// Salted one-way password hashing.
///
/// Hashes are self-describing (`pbkdf2-sha256$<iterations>$<salt>$<hash>`),
/// so changing the configured iteration count never invalidates existing
/// accounts.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(PBKDF2_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.clamp(1, MAX_ITERATIONS),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        let salt = generate_salt();
        let derived = DerivedHash::derive(password, &salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(derived.bytes)
        )
    }

    /// Check a password against a stored hash in constant time.
    /// A malformed stored hash never verifies.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some(stored) = StoredHash::parse(encoded) else {
            tracing::warn!("Stored password hash is malformed");
            return false;
        };
        let derived = DerivedHash::derive(password, &stored.salt, stored.iterations);
        derived.bytes[..].ct_eq(&stored.hash[..]).into()
    }

    /// Burn the same work as a real verification. Used when the account does
    /// not exist, so response time does not reveal which usernames exist.
    pub fn verify_dummy(&self, password: &str) {
        let _ = DerivedHash::derive(password, &[0u8; SALT_LENGTH], self.iterations);
    }
}

struct StoredHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: [u8; HASH_LENGTH],
}

impl StoredHash {
    fn parse(encoded: &str) -> Option<Self> {
        let mut parts = encoded.split('$');
        if parts.next()? != SCHEME {
            return None;
        }
        let iterations: u32 = parts.next()?.parse().ok()?;
        if iterations == 0 || iterations > MAX_ITERATIONS {
            return None;
        }
        let salt = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
        let hash: [u8; HASH_LENGTH] = STANDARD_NO_PAD.decode(parts.next()?).ok()?.try_into().ok()?;
        if parts.next().is_some() || salt.is_empty() {
            return None;
        }
        Some(Self {
            iterations,
            salt,
            hash,
        })
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
