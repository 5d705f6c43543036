pub mod fetch;
pub mod install;

pub use fetch::FetchHandler;
pub use install::InstallHandler;
