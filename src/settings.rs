use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SettingsError;

pub const DEFAULT_API_URL: &str = "https://api.example.com/chat";
pub const DEFAULT_TITLE: &str = "Online Assistant";
pub const DEFAULT_PRIMARY_COLOR: &str = "#007bff";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One layer of widget configuration. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WidgetSettings {
    pub api_url: Option<String>,
    pub title: Option<String>,
    pub primary_color: Option<String>,
    pub timeout_secs: Option<u64>,
    pub database_url: Option<String>,
}

impl WidgetSettings {
    pub fn defaults() -> Self {
        Self {
            api_url: Some(DEFAULT_API_URL.into()),
            title: Some(DEFAULT_TITLE.into()),
            primary_color: Some(DEFAULT_PRIMARY_COLOR.into()),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            database_url: None,
        }
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let timeout_secs = match get("ASSISTANT_WIDGET_TIMEOUT_SECS") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| SettingsError::ParseInt {
                key: "ASSISTANT_WIDGET_TIMEOUT_SECS".into(),
                value: raw.clone(),
            })?),
            None => None,
        };
        Ok(Self {
            api_url: get("ASSISTANT_WIDGET_API_URL"),
            title: get("ASSISTANT_WIDGET_TITLE"),
            primary_color: get("ASSISTANT_WIDGET_PRIMARY_COLOR"),
            timeout_secs,
            database_url: get("ASSISTANT_WIDGET_DATABASE_URL"),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSettings {
    pub api_url: Url,
    pub title: String,
    pub primary_color: String,
    pub timeout_secs: u64,
    pub database_url: Option<String>,
}

impl EffectiveSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Merges layers field by field: overrides, then environment, then defaults.
pub fn resolve_effective_settings(
    defaults: &WidgetSettings,
    env: &WidgetSettings,
    overrides: &WidgetSettings,
) -> Result<EffectiveSettings, SettingsError> {
    let api_url = overrides
        .api_url
        .clone()
        .or_else(|| env.api_url.clone())
        .or_else(|| defaults.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.into());
    let api_url = parse_api_url(&api_url)?;

    let title = overrides
        .title
        .clone()
        .or_else(|| env.title.clone())
        .or_else(|| defaults.title.clone())
        .unwrap_or_else(|| DEFAULT_TITLE.into());

    let primary_color = overrides
        .primary_color
        .clone()
        .or_else(|| env.primary_color.clone())
        .or_else(|| defaults.primary_color.clone())
        .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.into());
    validate_color(&primary_color)?;

    let timeout_secs = overrides
        .timeout_secs
        .or(env.timeout_secs)
        .or(defaults.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let database_url = overrides
        .database_url
        .clone()
        .or_else(|| env.database_url.clone())
        .or_else(|| defaults.database_url.clone());

    Ok(EffectiveSettings { api_url, title, primary_color, timeout_secs, database_url })
}

fn parse_api_url(raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw).map_err(|err| SettingsError::InvalidApiUrl {
        value: raw.into(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SettingsError::InvalidApiUrl {
            value: raw.into(),
            reason: format!("unsupported scheme {}", other),
        }),
    }
}

fn validate_color(color: &str) -> Result<(), SettingsError> {
    let re = Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$")
        .map_err(|_| SettingsError::InvalidColor(color.into()))?;
    if re.is_match(color) { Ok(()) } else { Err(SettingsError::InvalidColor(color.into())) }
}
