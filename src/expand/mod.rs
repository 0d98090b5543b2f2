//! Parameter-space expansion -- turning compact specs into aligned value sequences.
//!
//! Split into focused submodules:
//! - [`field`] - static/dynamic mappings for params, headers, data and cookies
//! - [`template`] - `{placeholder}` URL templates
//! - [`path`] - delimiter-joined path segments
//! - [`auth`] - basic-auth credential pairs
//! - [`align`] - fill-forward zip used by all of the above

mod align;
mod auth;
mod field;
mod path;
mod template;

pub use align::{align, fill_forward_pair, fill_forward_zip};
pub(crate) use align::{aligned_len, fill_forward_get};
pub use auth::AuthSpec;
pub use field::{FieldSpec, FieldSpecBuilder};
pub use path::PathSpec;
pub use template::UrlTemplate;
