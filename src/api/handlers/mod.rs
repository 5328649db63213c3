//! HTTP request handlers

mod aggregation;
mod health;
mod lists;
mod references;
mod status;

pub use aggregation::get_aggregation;
pub use health::health_check;
pub use lists::get_status_list;
pub use references::new_references;
pub use status::update_status;
