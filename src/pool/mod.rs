//! Connection brokering: pool backends, leases and lifecycle observers.

pub mod backend;
pub mod broker;
pub mod events;

pub use backend::{PoolBackend, WireConnection};
pub use broker::{ConnectionBroker, Lease, LeaseId};
pub use events::{
    ConnectEvent, ConnectionObserver, ErrorEvent, Observers, QueryEvent, TransactionEvent,
    TransactionPhase,
};
