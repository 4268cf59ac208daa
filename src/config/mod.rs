//! Configuration Loader: layered `GatewaySettings`.

mod settings;

pub use settings::{
    GatewaySettings, ProviderSettings, RedisSettings, load_settings, load_settings_from_path,
};
