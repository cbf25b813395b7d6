pub mod probe;
pub mod wifi;

pub use probe::{network_status, probe, DeploymentContext, HostAddress};
