pub mod probe;
pub mod resolver;

pub use probe::{is_port_in_use, PortStatus};
pub use resolver::{find_available_port, PortResolver, PortSpec, ResolvedAssignment};
