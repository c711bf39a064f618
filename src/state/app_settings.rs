use log::LevelFilter;

pub const LOG_LEVEL_ENV: &str = "RAYNU_LOG";

#[derive(Debug, Default, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_level = lookup(LOG_LEVEL_ENV)
            .filter(|v| !v.trim().is_empty())
            .and_then(|v| v.trim().parse::<LevelFilter>().ok());
        Self { full_screen: false, log_level }
    }
}
