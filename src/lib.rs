pub mod config;
pub mod db;
pub mod logging;
pub mod notifications;
pub mod probe;
pub mod queue;
pub mod scheduler;
pub mod web;
pub mod worker;

#[cfg(test)]
mod test_support;
