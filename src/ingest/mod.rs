pub mod changes_sync;
pub mod loader;
pub mod missing;
pub mod normalize;
pub mod swap;
pub mod sweep;
pub mod upsert;
