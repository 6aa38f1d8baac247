// chart-feed - Polls chart series, re-buckets them by time resolution and
// aligns multi-series charts onto one time range before rendering.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
