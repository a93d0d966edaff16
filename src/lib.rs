//! Cursor pagination over orderings of one or more fields.
//!
//! A [`Paginator`] turns an opaque cursor token into an ordering and a
//! predicate for a [`DataSource`], then turns the fetched rows into a [`Page`]
//! with tokens for the pages on either side. The same steps are available
//! piecemeal through [`CursorCodec`] and [`PagePlanner`] for callers that run
//! the query themselves.

#[macro_use]
extern crate cfg_if;
#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate serde;

mod codec;
mod cursor;
mod env;
mod error;
mod memory;
mod ordering;
mod page;
mod paginator;
mod planner;
mod predicate;
mod record;
mod value;

pub use crate::codec::*;
pub use crate::cursor::*;
pub use crate::env::*;
pub use crate::error::*;
pub use crate::memory::*;
pub use crate::ordering::*;
pub use crate::page::*;
pub use crate::paginator::*;
pub use crate::planner::*;
pub use crate::predicate::*;
pub use crate::record::*;
pub use crate::value::*;

cfg_if! { if #[cfg(feature = "diesel")] {
    mod diesel;
    pub use crate::diesel::*;
} }

pub const TRACING_TARGET_CODEC: &str = "multicursor::codec";
pub const TRACING_TARGET_PLANNER: &str = "multicursor::planner";
pub const TRACING_TARGET_PAGINATOR: &str = "multicursor::paginator";
