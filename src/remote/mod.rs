//! Clients for the hosted data platform

pub mod rest;

pub use rest::*;
