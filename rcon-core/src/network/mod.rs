pub mod connector;
pub mod manager;
pub mod settings;

pub use connector::{Connector, TcpConnector};
pub use manager::{AUTH_REQUEST_ID, ConnectionManager};
pub use settings::RconSettings;
