use std::fs;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub session_path: String,
    pub payment_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            session_path: "./data/session.json".into(),
            payment_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    session_path: Option<String>,
    payment_delay_ms: Option<u64>,
}

/// Defaults, overlaid with `easyclinic.toml` from the working directory,
/// overlaid with environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("easyclinic.toml") {
        overlay_file(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("SESSION_PATH") {
        settings.session_path = v;
    }
    if let Ok(v) = std::env::var("APP__SESSION_PATH") {
        settings.session_path = v;
    }

    if let Ok(v) = std::env::var("APP__PAYMENT_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.payment_delay_ms = parsed;
        }
    }

    settings
}

fn overlay_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.session_path {
        settings.session_path = v;
    }
    if let Some(v) = file_cfg.payment_delay_ms {
        settings.payment_delay_ms = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_settings_overlay_defaults() {
        let mut settings = Settings::default();
        overlay_file(
            &mut settings,
            "bind_addr = \"0.0.0.0:9000\"\npayment_delay_ms = 10\n",
        );

        assert_eq!(settings.server_bind, "0.0.0.0:9000");
        assert_eq!(settings.payment_delay_ms, 10);
        assert_eq!(settings.session_path, "./data/session.json");
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut settings = Settings::default();
        overlay_file(&mut settings, "bind_addr = [not toml");
        assert_eq!(settings.server_bind, "127.0.0.1:8080");
    }
}
