// src/services/mod.rs

pub mod session;
