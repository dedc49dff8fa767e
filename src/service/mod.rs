#![allow(refining_impl_trait)]

mod manager;
mod once_services;
mod service;
pub mod services;

pub mod clients;
pub mod globals;
pub mod moderation;
pub mod presence;
pub mod pubsub;
pub mod ratelimit;
pub mod reaper;
pub mod rooms;
pub mod sessions;
pub mod users;

#[cfg(test)]
mod tests;

pub(crate) use once_services::OnceServices;
pub(crate) use service::{Args, Service};

pub use crate::services::Services;
