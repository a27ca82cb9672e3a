use anyhow::Result;
use godfall_rules::config::RulesetConfig;

/// Reads `$CONFIG_DIR/godfall/config.toml` when present, then `GODFALL_*`
/// environment variables such as `GODFALL_HP_PROGRESSION=flat`.
pub fn load_ruleset() -> Result<RulesetConfig> {
    let mut builder = config::Config::builder();

    if let Some(mut path) = dirs::config_dir() {
        path.push("godfall");
        path.push("config.toml");
        tracing::debug!(path = %path.display(), "looking for ruleset config");

        builder = builder.add_source(config::File::from(path).required(false));
    }

    let ruleset = builder
        .add_source(
            config::Environment::with_prefix("GODFALL")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<RulesetConfig>()?;

    tracing::debug!(?ruleset, "loaded ruleset config");

    Ok(ruleset)
}
