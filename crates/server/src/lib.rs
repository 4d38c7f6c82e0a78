pub mod api;
pub mod bootstrap;
pub mod health;
pub mod logging;

pub use api::router;
pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use logging::init_logging;
