pub mod admin;
pub mod auth;
pub mod health;
pub mod machines;
pub mod me;
pub mod notifications;
pub mod reservations;
pub mod sessions;
pub mod statistics;
pub mod web;
