//! Swappable process-wide handles
//!
//! Each handle is a slot with an accessor and a mutator that returns the
//! value it replaced:
//! - Output channels ([`channel`])
//! - Input channel ([`input`])
//! - Property table ([`properties`])
//! - Environment ([`environment`])
//! - Security policy and exit ([`policy`])

pub mod channel;
pub mod environment;
pub mod input;
pub mod policy;
pub mod properties;

pub use channel::{set_sink, sink, stderr, stdout, Channel, ChannelWriter, Sink};
pub use environment::{
    environment, set_environment, var, vars, EnvSnapshot, EnvTable, EnvironmentBackend,
    InMemoryEnvironment, MemoryTable, OpaqueEntries, ProcessEnvironment,
};
pub use input::{set_source, source, stdin, InputSource, StdinReader};
pub use policy::{
    check_permission, exit, security_policy, set_security_policy, Permission, PolicyViolation,
    SecurityPolicy,
};
pub use properties::{
    clear_property, properties, property, set_properties, set_property, Properties,
};
