use serde::Deserialize;

/// Application settings, read from `Rocket.toml` and `ROCKET_*` variables.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file, or `:memory:`.
    pub database: String,
    /// Bearer token that is always granted an admin session.
    pub admin_token: Option<String>,
    /// Categories written into an empty store on startup.
    pub default_categories: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> AppConfig {
        AppConfig {
            database: "rplanner.db".to_string(),
            admin_token: None,
            default_categories: vec![
                "todo".to_string(),
                "in-progress".to_string(),
                "done".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::providers::{Format, Toml};
    use rocket::figment::Figment;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: AppConfig = Figment::from(Toml::string(r#"admin_token = "secret""#))
            .extract()
            .unwrap();

        assert_eq!(config.admin_token.as_deref(), Some("secret"));
        assert_eq!(config.database, "rplanner.db");
        assert_eq!(config.default_categories.len(), 3);
    }
}
