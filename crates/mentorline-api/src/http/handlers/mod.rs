//! HTTP request handlers for the REST API.

pub mod message;
pub mod payment;
pub mod presence;
pub mod session;
pub mod wallet;
pub mod ws;

#[cfg(test)]
mod tests;
