mod inputs;
mod repository;
mod roles;

pub use inputs::{CreateRoleInput, NewRole, NewRoleAssignment, RolePatch, UpdateRoleInput};
pub use repository::RoleRepository;
pub use roles::{RoleAssignment, RoleDefinition};
