//! Back office for a dishware and equipment rental business.
//!
//! The crate carries three layers: the REST backend (`routes`, `services`,
//! `entity`), a typed client for that backend (`client`), and the
//! [`composer`] that edits one order draft on top of the client.

pub mod app;
pub mod audit;
pub mod client;
pub mod composer;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
