//! Page cursor resolution for the Gamma and CLOB `/markets` endpoints
//!
//! # Components
//! - `PaginationStrategy`: how a given API accepts continuation parameters
//! - `PageCursorResolver`: decides the next page (or completion) from one response

pub mod resolver;

pub use resolver::{split_body, PageCursorResolver, PaginationStrategy, END_CURSOR};
