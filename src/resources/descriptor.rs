//! Resource descriptors and the resource registry
//!
//! A descriptor is the small capability set the binder needs from a record
//! type: its names, its table, its owner field and a way to register its
//! routes. [`Resource<T>`] derives all of it from a [`Record`] implementation.

use super::binder::{ResourceContext, bind};
use crate::core::auth::AuthPolicy;
use crate::core::entity::Record;
use crate::core::error::{ApiError, ApiResult};
use crate::server::registry::RouteRegistry;
use std::marker::PhantomData;

/// The generated operations of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn is_read(&self) -> bool {
        matches!(self, Operation::List | Operation::Get)
    }
}

/// Per-resource binding options
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    /// Policy for list and get
    pub read: AuthPolicy,

    /// Policy for create, update and delete
    pub write: AuthPolicy,

    disabled: Vec<Operation>,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            read: AuthPolicy::Authenticated,
            write: AuthPolicy::Authenticated,
            disabled: Vec::new(),
        }
    }
}

impl ResourceOptions {
    /// Anonymous callers may list and read every record
    pub fn public(mut self) -> Self {
        self.read = AuthPolicy::Public;
        self
    }

    /// Only administrators may create, update or delete
    pub fn admin_writes(mut self) -> Self {
        self.write = AuthPolicy::AdminOnly;
        self
    }

    /// Do not generate `operation`
    pub fn without(mut self, operation: Operation) -> Self {
        if !self.disabled.contains(&operation) {
            self.disabled.push(operation);
        }
        self
    }

    pub fn read_only(self) -> Self {
        self.without(Operation::Create)
            .without(Operation::Update)
            .without(Operation::Delete)
    }

    pub fn is_enabled(&self, operation: Operation) -> bool {
        !self.disabled.contains(&operation)
    }

    pub fn policy(&self, operation: Operation) -> AuthPolicy {
        if operation.is_read() {
            self.read
        } else {
            self.write
        }
    }

    /// Operations to generate, in binding order
    pub fn operations(&self) -> impl Iterator<Item = Operation> + '_ {
        Operation::ALL.into_iter().filter(|op| self.is_enabled(*op))
    }
}

/// What the binder needs to know about a resource
pub trait ResourceDescriptor: Send + Sync {
    /// Singular name, e.g. `note`
    fn name(&self) -> &'static str;

    /// Plural name used in paths, e.g. `notes`
    fn plural(&self) -> String;

    fn table(&self) -> String;

    fn owner_field(&self) -> &'static str;

    fn options(&self) -> &ResourceOptions;

    /// Register the generated routes
    fn register_routes(&self, registry: &mut RouteRegistry, ctx: &ResourceContext) -> ApiResult<()>;
}

/// Descriptor for a [`Record`] type
pub struct Resource<T> {
    options: ResourceOptions,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Resource<T> {
    pub fn new(options: ResourceOptions) -> Self {
        Self {
            options,
            _record: PhantomData,
        }
    }
}

impl<T: Record> ResourceDescriptor for Resource<T> {
    fn name(&self) -> &'static str {
        T::resource_name()
    }

    fn plural(&self) -> String {
        T::resource_plural()
    }

    fn table(&self) -> String {
        T::table_name()
    }

    fn owner_field(&self) -> &'static str {
        T::owner_field()
    }

    fn options(&self) -> &ResourceOptions {
        &self.options
    }

    fn register_routes(&self, registry: &mut RouteRegistry, ctx: &ResourceContext) -> ApiResult<()> {
        bind::<T>(registry, ctx, &self.options)
    }
}

/// Descriptors in explicit registration order
#[derive(Default)]
pub struct ResourceRegistry {
    descriptors: Vec<Box<dyn ResourceDescriptor>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; resource names must be unique
    pub fn register(&mut self, descriptor: Box<dyn ResourceDescriptor>) -> ApiResult<()> {
        if self.descriptors.iter().any(|d| d.name() == descriptor.name()) {
            return Err(ApiError::configuration(format!(
                "resource '{}' is already registered",
                descriptor.name()
            )));
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Bind every resource, in registration order
    pub fn bind_all(&self, registry: &mut RouteRegistry, ctx: &ResourceContext) -> ApiResult<()> {
        for descriptor in &self.descriptors {
            descriptor.register_routes(registry, ctx)?;
            tracing::debug!(
                resource = descriptor.name(),
                table = %descriptor.table(),
                "resource bound"
            );
        }
        Ok(())
    }

    pub fn into_descriptors(self) -> Vec<Box<dyn ResourceDescriptor>> {
        self.descriptors
    }
}
