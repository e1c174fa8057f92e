//! Wall-clock source for log line prefixes.

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::protocol::BoundedString;

/// `[YYYY-MM-DD HH:MM:SS] `
const PREFIX_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[[[year]-[month]-[day] [hour]:[minute]:[second]] ");

/// Prefix used while no wall-clock time is known.
pub const NO_TIME_PREFIX: &str = "[no-time] ";

/// Formatted timestamp prefix.
pub type TimePrefix = BoundedString<31>;

/// Source of the current wall-clock time.
pub trait LogClock: Send + Sync {
    /// Current time, or `None` if the clock has not been set.
    fn now(&self) -> Option<OffsetDateTime>;
}

/// System clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl LogClock for SystemClock {
    fn now(&self) -> Option<OffsetDateTime> {
        let now = OffsetDateTime::now_utc();
        // An unset RTC reports the epoch.
        (now.unix_timestamp() > 0).then_some(now)
    }
}

/// Build the line prefix for `clock`, falling back to [`NO_TIME_PREFIX`].
#[must_use]
pub fn time_prefix(clock: &dyn LogClock) -> TimePrefix {
    clock
        .now()
        .and_then(format_prefix)
        .unwrap_or_else(|| TimePrefix::truncated(NO_TIME_PREFIX))
}

fn format_prefix(at: OffsetDateTime) -> Option<TimePrefix> {
    let mut buf = [0u8; TimePrefix::CAPACITY];
    let mut out: &mut [u8] = &mut buf;
    let written = at.format_into(&mut out, PREFIX_FORMAT).ok()?;
    std::str::from_utf8(&buf[..written])
        .ok()
        .map(TimePrefix::truncated)
}
