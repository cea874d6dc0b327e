//! imgdrop: a small HTTP image host.
//!
//! `POST /images` stores a multipart-uploaded image in the upload directory
//! when its leading bytes sniff as an allowed image type. Every other path
//! serves that directory read-only.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
