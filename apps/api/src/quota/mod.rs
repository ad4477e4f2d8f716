//! Quota & Rate-Limit Subsystem: sliding-window request throttling and the
//! weekly free-tier usage counter. Both are cache-fronted; both define their
//! own fail-open/fall-through behavior on cache failure rather than leaving
//! it to callers, per the error design.

pub mod rate_limiter;
pub mod usage_meter;
