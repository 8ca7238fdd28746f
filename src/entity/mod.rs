//! sea-orm entities for the rental schema.

pub mod order_items;
pub mod orders;
pub mod products;
pub mod users;
