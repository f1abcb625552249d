pub mod auth;
pub mod contact;
pub mod credentials;
pub mod error;
pub mod events;
pub mod health;
pub mod identity;
pub mod interest;
pub mod middleware;
pub mod posts;
pub mod resources;
pub mod router;
pub mod seed;
pub mod sessions;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
