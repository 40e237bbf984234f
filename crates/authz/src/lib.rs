pub mod catalog;
pub mod error;
pub mod policy;
pub mod service;

pub use catalog::{all_permissions, grants_for, route_policy};
pub use error::{AuthzError, Result};
pub use policy::RoutePolicy;
pub use service::PermissionService;
