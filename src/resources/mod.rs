//! Record types bound to REST routes
//!
//! Register a [`Resource`] per record type; the binder generates list, get,
//! create, update and delete routes wired to the [`EntityStore`](crate::core::store::EntityStore)
//! with the record's ownership semantics.

pub mod binder;
pub mod descriptor;
pub mod handlers;
pub mod static_files;
pub mod uploads;
pub mod users;

pub use binder::{ResourceContext, bind};
pub use descriptor::{Operation, Resource, ResourceDescriptor, ResourceOptions, ResourceRegistry};
pub use handlers::CrudHandler;
pub use static_files::StaticFiles;
pub use uploads::{Upload, Uploads};
pub use users::{LocalUser, RegisterUserInput, UserDirectory};
