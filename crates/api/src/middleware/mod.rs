pub mod gate;
pub mod rate_limit;

pub use gate::{gate, AuthUser};
pub use rate_limit::rate_limit_login;
