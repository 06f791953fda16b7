use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    pub archive: ArchiveSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub extra_point_enabled: bool,
    #[serde(default = "default_extra_point_lookup_secs")]
    pub extra_point_lookup_secs: i64,
}

fn default_max_concurrency() -> usize {
    6
}

fn default_extra_point_lookup_secs() -> i64 {
    3600
}

pub fn load_archive_config() -> anyhow::Result<ArchiveConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/archive"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
