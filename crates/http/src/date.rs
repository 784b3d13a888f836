//! Process-wide cache of the `Date` header value.
//!
//! Formatting an RFC 1123 date on every response is wasted work when
//! hundreds of responses share the same second. [`DateCache`] keeps the last
//! formatted second behind an [`ArcSwap`] so readers never lock, and only
//! formats again once the clock has moved on to a later second.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use bytes::Bytes;
use httpdate::fmt_http_date;
use once_cell::sync::Lazy;

static DATE_CACHE: Lazy<DateCache> = Lazy::new(DateCache::new);

#[derive(Debug)]
struct CachedDate {
    secs: u64,
    text: Bytes,
}

impl CachedDate {
    fn format(secs: u64) -> Self {
        let time = UNIX_EPOCH + Duration::from_secs(secs);
        Self { secs, text: Bytes::from(fmt_http_date(time)) }
    }
}

#[derive(Debug)]
pub struct DateCache {
    current: ArcSwap<CachedDate>,
}

impl DateCache {
    fn new() -> Self {
        Self { current: ArcSwap::from_pointee(CachedDate::format(unix_secs(SystemTime::now()))) }
    }

    /// Returns the global instance shared by every connection.
    pub fn global() -> &'static DateCache {
        &DATE_CACHE
    }

    /// The formatted date for the current second.
    pub fn now(&self) -> Bytes {
        self.at(SystemTime::now())
    }

    /// The formatted date for `time`.
    ///
    /// The cached second only ever moves forward: asking for an earlier
    /// second than the cached one answers the cached text.
    pub fn at(&self, time: SystemTime) -> Bytes {
        let secs = unix_secs(time);

        let cached = self.current.load();
        if cached.secs >= secs {
            return cached.text.clone();
        }

        let fresh = Arc::new(CachedDate::format(secs));
        let previous = self.current.rcu(|current| if current.secs >= secs { Arc::clone(current) } else { Arc::clone(&fresh) });
        if previous.secs >= secs {
            // another thread got there first
            return self.current.load().text.clone();
        }
        fresh.text.clone()
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// The current `Date` header value from the global cache.
#[inline]
pub fn http_date() -> Bytes {
    DateCache::global().now()
}
