pub mod api;
pub mod layout;
pub mod models;
pub mod time;
pub mod visibility;
