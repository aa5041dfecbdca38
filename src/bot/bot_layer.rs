// Bot layer - Reddit-facing adapters: trigger dispatch and polling.

#[path = "triggers.rs"]
pub mod triggers;

#[path = "poller.rs"]
pub mod poller;
