pub use crate::{
    routes::router, ssh_bridge_upgrade, GatewayConfig, GatewayError, GatewayPlugin, GatewayResult, GatewayState,
    GatewayStatus, ReverseProxyManager, Session, SessionKind, SessionManager, SessionSnapshot, Target,
};
