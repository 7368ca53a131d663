use serde::Deserialize;

/// Runtime settings. Read from the TOML file named by `GAVEL_CONFIG` when
/// set; `DATABASE_URL` always wins for the database location, matching how
/// the binaries are deployed.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub agent: Option<AgentSettings>,
}

/// Connection details for the optional external agent. The engine itself
/// never dials out; these are handed to whichever `JudgingAgent`
/// implementation the host wires in.
#[derive(Deserialize, Debug, Clone)]
pub struct AgentSettings {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: default_database_url(),
            agent: None,
        }
    }
}

fn default_database_url() -> String {
    ":memory:".to_string()
}

fn default_agent_timeout_secs() -> u64 {
    60
}

#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(err) => write!(f, "failed to read config: {err}"),
            SettingsError::Parse(err) => {
                write!(f, "failed to parse config: {err}")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = match std::env::var("GAVEL_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(SettingsError::Io)?;
                toml::from_str(&raw).map_err(SettingsError::Parse)?
            }
            Err(_) => Settings::default(),
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.database_url = url;
        }
        Ok(settings)
    }

    pub fn agent_configured(&self) -> bool {
        self.agent.is_some()
    }
}
