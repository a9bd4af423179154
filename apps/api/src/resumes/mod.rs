pub mod extract;
pub mod handlers;
