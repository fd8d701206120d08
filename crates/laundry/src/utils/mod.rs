pub mod permissions;

pub use permissions::PermissionChecker;
