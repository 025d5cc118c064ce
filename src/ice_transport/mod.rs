pub mod ice_candidate;
pub mod ice_connection_state;
pub mod ice_credential_type;
pub mod ice_parameters;
pub mod ice_server;
pub mod ice_transport_policy;
