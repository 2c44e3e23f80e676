//! # Configuration
//!
//! Layered settings: built-in defaults, then an optional `treatment.toml`, then
//! `TREATMENT__*` environment variables (`TREATMENT__LOGGING__LEVEL=warn`,
//! `TREATMENT__RULES__PHOTO_REQUIRED_REASONS=1,3`).

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::delivery::{DeliveryRules, FailureReason};
use crate::error::{TreatmentError, TreatmentResult};
use crate::logging;
use crate::turn::{InputClassifier, Lexicon, DEFAULT_NEGATIVE_PATTERN, DEFAULT_POSITIVE_PATTERN};

pub const DEFAULT_CONFIG_FILE: &str = "treatment.toml";
const ENV_PREFIX: &str = "TREATMENT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentConfig {
    pub environment: String,
    pub logging: LoggingConfig,
    pub lexicon: LexiconConfig,
    pub rules: RulesConfig,
    pub messaging: MessagingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; empty means the environment default
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconConfig {
    pub positive_pattern: String,
    pub negative_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Reason codes (1..6) that need photo proof
    pub photo_required_reasons: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Buffer size of the outbound message and trip update channels
    pub channel_capacity: usize,
}

impl Default for TreatmentConfig {
    fn default() -> Self {
        Self {
            environment: logging::detect_environment(),
            logging: LoggingConfig::default(),
            lexicon: LexiconConfig::default(),
            rules: RulesConfig::default(),
            messaging: MessagingConfig::default(),
        }
    }
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            positive_pattern: DEFAULT_POSITIVE_PATTERN.to_string(),
            negative_pattern: DEFAULT_NEGATIVE_PATTERN.to_string(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            photo_required_reasons: vec![FailureReason::RecipientAbsent.code() as u8],
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

impl TreatmentConfig {
    /// Load from `treatment.toml` in the working directory (if present) and the environment
    pub fn load() -> TreatmentResult<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        Self::load_from(path.exists().then_some(path))
    }

    /// Load with an explicit config file. The file must exist when given.
    pub fn load_from(path: Option<&Path>) -> TreatmentResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("rules.photo_required_reasons")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            environment = %config.environment,
            file = ?path,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> TreatmentResult<()> {
        self.lexicon()?;
        self.delivery_rules()?;

        if self.messaging.channel_capacity == 0 {
            return Err(TreatmentError::Configuration(
                "messaging.channel_capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn lexicon(&self) -> TreatmentResult<Lexicon> {
        Lexicon::new(
            &self.lexicon.positive_pattern,
            &self.lexicon.negative_pattern,
        )
        .map_err(|e| TreatmentError::Configuration(format!("Invalid lexicon pattern: {e}")))
    }

    pub fn classifier(&self) -> TreatmentResult<InputClassifier> {
        Ok(InputClassifier::new(self.lexicon()?))
    }

    pub fn delivery_rules(&self) -> TreatmentResult<DeliveryRules> {
        let reasons = self
            .rules
            .photo_required_reasons
            .iter()
            .map(|code| {
                FailureReason::from_code(u32::from(*code)).ok_or_else(|| {
                    TreatmentError::Configuration(format!(
                        "rules.photo_required_reasons: {code} is outside 1..6"
                    ))
                })
            })
            .collect::<TreatmentResult<Vec<_>>>()?;

        Ok(DeliveryRules::new(reasons))
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl From<config::ConfigError> for TreatmentError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
