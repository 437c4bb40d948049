//! Bucket assignment strategies

use crate::balance::routing::{parse_host_id, Routable};
use crate::core::error::BalanceError;
use rand::Rng;

/// Chooses a bucket in `[0, buckets)` for a value
pub trait Balance: Send + Sync {
    /// Assign `value` to one of `buckets` buckets
    fn assign(&self, value: &dyn Routable, buckets: usize) -> Result<usize, BalanceError>;
}

/// The available balancing strategies.
///
/// `KeyId` and `KeyHash` are deterministic: the same key and bucket count
/// always produce the same bucket. Changing the bucket count may move keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Balancer {
    /// Uniformly random bucket, ignores the value
    Random,
    /// `id mod buckets` for keys shaped like `<prefix>_<id>`
    KeyId,
    /// `fnv1(key) mod buckets`
    KeyHash,
    /// Extract a named field, then delegate
    Field {
        /// Field to extract
        name: String,
        /// Balancer applied to the field
        inner: Box<Balancer>,
    },
}

impl Balancer {
    /// Balancer that routes structured values by one of their fields
    pub fn field(name: impl Into<String>, inner: Balancer) -> Self {
        Balancer::Field {
            name: name.into(),
            inner: Box::new(inner),
        }
    }

    /// Strategy name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Balancer::Random => "random",
            Balancer::KeyId => "key-id",
            Balancer::KeyHash => "key-hash",
            Balancer::Field { .. } => "field",
        }
    }

    fn key<'a>(&self, value: &'a dyn Routable) -> Result<&'a str, BalanceError> {
        value.routing_key().ok_or(BalanceError::TypeMismatch {
            balancer: self.name(),
            expected: "string",
            actual: value.kind(),
        })
    }
}

impl Balance for Balancer {
    fn assign(&self, value: &dyn Routable, buckets: usize) -> Result<usize, BalanceError> {
        if buckets == 0 {
            return Err(BalanceError::NoBuckets);
        }

        match self {
            Balancer::Random => Ok(rand::rng().random_range(0..buckets)),
            Balancer::KeyId => {
                let id = parse_host_id(self.key(value)?)?;
                Ok((id % buckets as u64) as usize)
            }
            Balancer::KeyHash => {
                let hash = fnv1_32(self.key(value)?.as_bytes());
                Ok((hash as u64 % buckets as u64) as usize)
            }
            Balancer::Field { name, inner } => {
                if value.routing_key().is_some() {
                    return Err(BalanceError::TypeMismatch {
                        balancer: self.name(),
                        expected: "structured value",
                        actual: value.kind(),
                    });
                }
                let field = value.field(name).ok_or_else(|| BalanceError::MissingField {
                    field: name.clone(),
                    actual: value.kind(),
                })?;
                inner.assign(&field, buckets)
            }
        }
    }
}

/// 32-bit FNV-1 hash.
pub fn fnv1_32(data: &[u8]) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
    const FNV_PRIME: u32 = 16_777_619;
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in data {
        hash = hash.wrapping_mul(FNV_PRIME);
        hash ^= byte as u32;
    }
    hash
}
