pub use self::parser::{
    BridgeConfig, Config, DatabaseConfig, DbType, DiscordConfig, LogFormat, LoggingConfig,
    NotifyVia, WebConfig,
};
pub use self::validator::ConfigError;

mod parser;
mod validator;
