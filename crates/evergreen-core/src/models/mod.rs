//! Request and response types crossing the page/cache boundary.
//!
//! - `Request`: method, URL, headers and optional body issued by the page
//! - `Response`: status, headers, body; either a real response or the
//!   synthetic failure response

pub mod request;
pub mod response;

pub use request::Request;
pub use response::{Response, ResponseKind};
