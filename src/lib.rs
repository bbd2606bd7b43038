//! Storefront - a small catalog, blog and checkout web site
//!
//! Items are sold through a hosted payment gateway checkout; articles form a
//! simple blog; accounts use server-side sessions; an admin panel manages all
//! three.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
