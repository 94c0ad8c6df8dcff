//! Queries over a finished hierarchy

mod bidir;
mod path;
mod unpack;

pub use bidir::{BidirectionalQuery, Outcome, QueryStats, Route, Seed};
pub use unpack::{endpoints, unpack_edge};
