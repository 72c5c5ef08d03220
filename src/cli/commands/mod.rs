//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fingerprint;
pub mod profiles;
pub mod transcode;

pub use cache::execute as cache;
pub use config::execute as config;
pub use fingerprint::execute as fingerprint;
pub use profiles::execute as profiles;
pub use transcode::execute as transcode;
