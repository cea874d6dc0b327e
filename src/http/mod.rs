//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from specific business logic.

pub mod mime;
pub mod path;
pub mod response;
pub mod sniff;

// Re-export commonly used types
pub use response::{
    build_403_response, build_404_response, build_405_response, build_500_response,
    build_bad_path_response, build_redirect_response, build_text_response,
};
