// Bot features
pub mod notifier;
pub mod poller;
pub mod registry;
