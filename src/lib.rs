//! Two-pane directory compare and sync on top of rsync over ssh.

pub mod config;
pub mod connection;
pub mod error;
pub mod local;
pub mod models;
pub mod pane;
pub mod remote;
pub mod ssh_service;
pub mod sync;
