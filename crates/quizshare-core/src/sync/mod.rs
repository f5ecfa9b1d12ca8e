//! Cloud synchronization and replica reconciliation.

mod cloud;
pub mod merge;
mod poller;

pub use cloud::CloudSyncClient;
pub use merge::merge;
pub use poller::SyncPoller;
