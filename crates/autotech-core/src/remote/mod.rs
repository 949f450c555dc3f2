pub mod client;
pub mod decode;
pub mod memory;

pub use client::{delete_one, guard_filters, insert_one, text, to_row, update_one, Filter, Order, Query, RemoteDataClient, Row, Table};
pub use memory::{ForeignKey, InMemoryDataClient, OnDelete, FOREIGN_KEYS, UNIQUE_KEYS};
