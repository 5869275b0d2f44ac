//! Engine configuration loading for the CLI.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use schedule_engine::EngineConfig;

/// Layers built-in defaults, then the TOML file at `config_path` (if any), then
/// `SCHEDULE_*` environment variables. Nested keys use a double underscore, e.g.
/// `SCHEDULE_EDGE_HOURS__LATE=21`.
#[expect(
    clippy::result_large_err,
    reason = "figment::Error is large but only returned at startup"
)]
pub fn load(config_path: Option<&Path>) -> Result<EngineConfig, figment::Error> {
    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("SCHEDULE_").split("__"));

    figment.extract()
}
