//! Data models for listing uploads
//!
//! Each sub-module represents one concept of the upload widget: the files a user
//! picked, the direct-upload wire types, and the status of a preview/transfer.

mod direct_upload;
mod preview;
mod selected_file;

pub use direct_upload::*;
pub use preview::*;
pub use selected_file::*;
