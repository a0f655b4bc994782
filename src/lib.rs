//! reelscroll: an infinite short-video feed that pages from interchangeable
//! content providers and keeps exactly one reel playing.
//!
//! * **`source`**: the `ContentProvider` trait and its adapters.
//! * **`feed`**: aggregator, pager, playback coordinator and store.
//! * **`config`**: TOML configuration and provider construction.

pub mod config;
pub mod feed;
pub mod source;
