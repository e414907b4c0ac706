//! VPN panel adapter.
//!
//! Implements the `VpnPanel` port over the panel's REST API with a
//! bearer token. The token is held as `secrecy::SecretString`.

mod panel_adapter;
mod wire_types;

pub use panel_adapter::{PanelApiAdapter, PanelApiConfig};
