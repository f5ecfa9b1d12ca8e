//! Usage events and coarse client location

mod events;
mod ip_info;

pub use events::{AnalyticsEvent, EventQueue};
pub use ip_info::{IpInfo, IpInfoProvider, IpInfoResolver, IP_INFO_MAX_AGE};
