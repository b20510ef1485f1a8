// Operation catalog, invocation state machine, and result types.

mod catalog;
mod descriptor;
mod dispatcher;
mod result;

pub use catalog::{RegistryEntry, RegistryStats, ToolRegistry};
pub use descriptor::{
    Category, Dependency, HandlerFuture, OperationDescriptor, ToolContext, ToolHandler,
    validate_input,
};
pub use dispatcher::{CatalogEntry, Dispatcher};
pub use result::{InvocationError, InvocationMetadata, InvocationResult};
