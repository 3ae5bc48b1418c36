//! Network subsystem for UDP packet delivery

pub mod dispatcher;
pub mod udp;

pub use dispatcher::{DestinationSet, DispatchReport, Dispatcher, DispatcherStats};
pub use udp::{create_socket, Transport};
