//! Event schema: descriptors compiled from JSON ABI text
//!
//! Architecture:
//!     descriptor.rs : FieldType, Field, EventDescriptor (signature, topic layout)
//!     registry.rs   : SchemaRegistry: load, resolve, decode-by-name

pub mod descriptor;
pub mod registry;

pub use descriptor::{EventDescriptor, Field, FieldType, WORD};
pub use registry::SchemaRegistry;
