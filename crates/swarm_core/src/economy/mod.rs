//! Resource Balancer: keeps harvester counts at their ideal values.

mod balancer;

pub use balancer::{HarvestPriority, RateLimiter, ResourceBalancer, REBALANCE_BATCH, REBALANCE_INTERVAL};
