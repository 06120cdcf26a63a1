//! Asset persistence: stable names, durable writes and PNG normalization.

mod store;
pub mod transcode;

pub use store::{AssetStore, NamingScheme};
pub(crate) use store::write_atomic;
pub use transcode::{encode_raw, RawLayout};
