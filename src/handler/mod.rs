//! Request handler module
//!
//! Request routing dispatch plus the two endpoints: image upload and static
//! serving of the upload directory.

pub mod listing;
pub mod router;
pub mod static_files;
pub mod upload;

// Re-export main entry point
pub use router::handle_request;
