//! Overwrite-on-full queues decoupling transport callbacks from the
//! application

mod evicting;
mod inbox;

pub use evicting::{Consumer, Producer, evicting_queue};
pub use inbox::{Inbox, InboxConfig, InboxReader, InboxWriter};
