//! `keygate-identity` — tenants, roles, users and the authentication flow.
//!
//! Storage is reached only through the directory traits in [`directory`];
//! concrete backends live in `keygate-infra`.

pub mod directory;
pub mod model;
pub mod profile;
pub mod provision;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use directory::{
    Directories, DirectoryError, DirectoryWriter, DomainDirectory, RoleDirectory, UserDirectory,
};
pub use model::{Domain, Role, RoleClaims, User};
pub use profile::{DomainView, Profile, ProfileAssembler, RoleView};
pub use provision::{NewUser, Provisioner, ProvisionError};
pub use service::{AuthError, AuthService, LoginOutcome};
