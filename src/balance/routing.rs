//! Values a balancer can route

use crate::core::error::BalanceError;
use crate::core::types::QuerySpec;

/// Exposes the shape of a value to the balancers.
///
/// A plain key answers [`routing_key`](Routable::routing_key); a structured
/// value answers [`field`](Routable::field) for the fields it carries.
pub trait Routable {
    /// Short name of the value's shape, used in error messages
    fn kind(&self) -> &'static str;

    /// The value itself as a routing key, when it is one
    fn routing_key(&self) -> Option<&str> {
        None
    }

    /// A named string field of a structured value
    fn field(&self, _name: &str) -> Option<&str> {
        None
    }
}

impl Routable for str {
    fn kind(&self) -> &'static str {
        "string"
    }

    fn routing_key(&self) -> Option<&str> {
        Some(self)
    }
}

impl Routable for String {
    fn kind(&self) -> &'static str {
        "string"
    }

    fn routing_key(&self) -> Option<&str> {
        Some(self)
    }
}

impl<R: Routable + ?Sized> Routable for &R {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn routing_key(&self) -> Option<&str> {
        (**self).routing_key()
    }

    fn field(&self, name: &str) -> Option<&str> {
        (**self).field(name)
    }
}

impl Routable for QuerySpec {
    fn kind(&self) -> &'static str {
        "query"
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "hostname" => Some(&self.hostname),
            "bucket_size" => Some(&self.bucket_size),
            _ => None,
        }
    }
}

/// Returns the numeric id at the end of a key such as "host_000002".
///
/// The id is whatever follows the last underscore, or the whole key when it
/// has none, and must be a non-negative decimal integer.
pub fn parse_host_id(key: &str) -> Result<u64, BalanceError> {
    let digits = key.rsplit_once('_').map_or(key, |(_, id)| id);
    digits.parse::<u64>().map_err(|e| BalanceError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
