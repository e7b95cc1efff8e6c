pub mod admin;
pub mod auth;
pub mod media;
pub mod payments;
pub mod rentals;
pub mod root;
