pub mod admin;
pub mod credits;
pub mod generations;
pub mod pagination;
pub mod users;
pub mod webhooks;
