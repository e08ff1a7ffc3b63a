//! Test-only logging init, so tests that exercise the `log::debug!/info!/
//! warn!` call sites in [`crate::checkpoint`] and
//! [`crate::stock::cached_stock`] can have their output surfaced with
//! `cargo test -- --nocapture`.

#![cfg(test)]

pub fn trace_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
