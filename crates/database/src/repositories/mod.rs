pub mod events;
pub mod permissions;
pub mod sessions;
pub mod users;
