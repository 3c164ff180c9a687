//! Translation layer (W/J/G/S/T): turns a parsed `Query` into a MongoDB
//! `Request`. Each sub-module owns one clause family; `translator` is the
//! top-level driver that decides which MongoDB operation shape (find,
//! count, distinct, aggregate) the query needs and assembles the others'
//! output into it.

pub mod group_by;
pub mod join_translator;
pub mod subquery;
pub mod translator;
pub mod where_translator;
pub mod window;
