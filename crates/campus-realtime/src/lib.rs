//! Real-time event distribution for the Campus platform.
//!
//! Messages flow `publish → persist → broadcast`, and arrive at
//! every attached session through at least one of three uncoordinated paths:
//! live fan-out, replay on subscribe, and the fallback poll. Each session's
//! [`Inbox`] turns that at-least-once stream into an exactly-once, ordered
//! sequence.
//!
//! The fan-out is an explicit dependency of [`Distributor`]; there is no
//! process-wide channel. Use [`LocalFanout`] for a single process and
//! [`SharedLogFanout`] when several processes share one database file.

pub mod distributor;
pub mod fanout;
pub mod inbox;

pub use distributor::{Distributor, DistributorConfig, InboxHandle, InboxSnapshot};
pub use fanout::{
    prune_fanout_log, Fanout, FanoutError, LocalFanout, SharedLogFanout, SharedLogSettings,
    DEFAULT_CHANNEL_CAPACITY,
};
pub use inbox::{Delivery, Inbox, SeenSet, DEFAULT_SEEN_CAPACITY};
