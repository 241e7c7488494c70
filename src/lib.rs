// src/lib.rs

pub mod access;
pub mod app_state;
pub mod config;
pub mod error;
pub mod folders;
pub mod path;
pub mod service;
pub mod signing;
pub mod storage;
