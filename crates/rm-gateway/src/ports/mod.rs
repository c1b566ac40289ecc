//! Ports: the seams between the gateway core and the outside world.

pub mod outbound;

pub use outbound::{
    FixedTimeSource, HttpTransport, SystemTimeSource, TimeSource, TransportError,
    TransportRequest, TransportResponse,
};
