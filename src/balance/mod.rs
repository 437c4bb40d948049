//! Work distribution: balancers and bucketing

pub mod routing;
pub mod balancer;
pub mod buckets;

pub use routing::{parse_host_id, Routable};
pub use balancer::{fnv1_32, Balance, Balancer};
pub use buckets::partition;
