pub mod bootstrap;
pub mod http_network;

pub use bootstrap::{build_worker, open_storage};
pub use http_network::HttpNetwork;
