//! Cross-module flows: tool call → router → gateway → transport.

mod admission_flows;
mod catalogue_flows;
mod derived_flows;
mod http_transport;
mod pagination_flows;
