use crate::config::BrowserSettings;
use std::time::Duration;

const DEFAULT_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Launch parameters for one rendering session's Chrome process
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Sent both as a launch flag and by the page; should match the fetcher's
    pub user_agent: Option<String>,
    /// Per navigation / wait
    pub timeout_seconds: u64,
    pub disable_images: bool,
    /// Always passed; derived flags are appended by [`BrowserConfig::launch_args`]
    pub chrome_flags: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::from_settings(&BrowserSettings::default(), DEFAULT_UA)
    }
}

impl BrowserConfig {
    pub fn from_settings(settings: &BrowserSettings, user_agent: &str) -> Self {
        Self {
            headless: settings.headless,
            window_size: (1366, 900),
            user_agent: (!user_agent.is_empty()).then(|| user_agent.to_string()),
            timeout_seconds: settings.timeout_secs,
            disable_images: settings.disable_images,
            chrome_flags: [
                "--disable-blink-features=AutomationControlled",
                "--disable-dev-shm-usage",
                "--no-sandbox",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.chrome_flags.clone();
        if self.disable_images {
            args.push("--blink-settings=imagesEnabled=false".to_string());
        }
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={}", ua));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_follows_settings_defaults() {
        let config = BrowserConfig::default();
        let settings = BrowserSettings::default();
        assert_eq!(config.headless, settings.headless);
        assert_eq!(config.timeout(), Duration::from_secs(settings.timeout_secs));
        assert!(config.chrome_flags.iter().any(|f| f.contains("AutomationControlled")));
    }

    #[test]
    fn test_launch_args_include_derived_flags() {
        let args = BrowserConfig::default().launch_args();
        assert!(args.iter().any(|a| a == "--blink-settings=imagesEnabled=false"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla")));
    }

    #[test]
    fn test_images_enabled_and_no_user_agent() {
        let settings = BrowserSettings {
            disable_images: false,
            timeout_secs: 12,
            ..BrowserSettings::default()
        };
        let config = BrowserConfig::from_settings(&settings, "");
        assert_eq!(config.timeout(), Duration::from_secs(12));
        assert!(config.user_agent.is_none());
        let args = config.launch_args();
        assert!(!args.iter().any(|a| a.contains("imagesEnabled") || a.starts_with("--user-agent")));
    }
}
