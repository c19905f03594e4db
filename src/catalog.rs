use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read arc catalog from {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse arc catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Arc catalog is missing the '{0}' arc")]
    MissingArc(CallDuration),

    #[error("Arc catalog is missing timing guidelines for '{0}'")]
    MissingTiming(CallDuration),

    #[error("Arc catalog is missing the age adaptation for ages {0}")]
    MissingAdaptation(AgeBand),

    #[error("Arc catalog has no greeting templates for ages {0}")]
    MissingGreetings(AgeBand),

    #[error("Arc '{arc}' is invalid: {reason}")]
    InvalidArc { arc: String, reason: String },
}

/// The two call lengths the service sells. Everything keyed by duration
/// (arcs, timing, max call length) is total over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDuration {
    #[serde(rename = "5min")]
    FiveMin,
    #[serde(rename = "10min")]
    TenMin,
}

impl CallDuration {
    pub const ALL: [CallDuration; 2] = [CallDuration::FiveMin, CallDuration::TenMin];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallDuration::FiveMin => "5min",
            CallDuration::TenMin => "10min",
        }
    }

    /// Hard cap passed to the video provider.
    pub fn max_duration_seconds(&self) -> u32 {
        match self {
            CallDuration::FiveMin => 300,
            CallDuration::TenMin => 600,
        }
    }
}

impl fmt::Display for CallDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5min" => Ok(CallDuration::FiveMin),
            "10min" => Ok(CallDuration::TenMin),
            _ => Err("call_duration must be '5min' or '10min'".to_string()),
        }
    }
}

/// Coarse age grouping driving tone and complexity. Band edges 4 and 8
/// belong to the lower band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "2-4")]
    Ages2To4,
    #[serde(rename = "5-8")]
    Ages5To8,
    #[serde(rename = "9-12")]
    Ages9To12,
}

impl AgeBand {
    pub const ALL: [AgeBand; 3] = [AgeBand::Ages2To4, AgeBand::Ages5To8, AgeBand::Ages9To12];

    pub fn for_age(age: u8) -> AgeBand {
        if age <= 4 {
            AgeBand::Ages2To4
        } else if age <= 8 {
            AgeBand::Ages5To8
        } else {
            AgeBand::Ages9To12
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBand::Ages2To4 => "2-4",
            AgeBand::Ages5To8 => "5-8",
            AgeBand::Ages9To12 => "9-12",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed segment of a conversation arc. Phase order in the vec is the
/// conversation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub duration_seconds: u32,
    pub percentage: u8,
    pub goals: Vec<String>,
    pub santa_guidelines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_questions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationArc {
    pub name: String,
    pub total_duration_seconds: u32,
    pub phases: Vec<Phase>,
}

/// Free-text descriptors consumed only by prompt rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeAdaptation {
    pub language_level: String,
    pub response_length: String,
    pub sentence_complexity: String,
    pub energy: String,
    pub attention_span: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingGuideline {
    pub average_response_length_seconds: f32,
    pub max_response_length_seconds: f32,
    pub pause_between_responses_seconds: f32,
}

/// Process-wide conversation script catalog. Loaded once at startup,
/// immutable afterwards, so concurrent readers need no locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcCatalog {
    pub arcs: HashMap<CallDuration, ConversationArc>,
    pub age_adaptations: HashMap<AgeBand, AgeAdaptation>,
    pub greeting_templates: HashMap<AgeBand, Vec<String>>,
    pub timing_guidelines: HashMap<CallDuration, TimingGuideline>,
}

impl ArcCatalog {
    /// Parses and validates a YAML catalog description.
    pub fn from_yaml(raw: &str) -> Result<ArcCatalog, CatalogError> {
        let catalog: ArcCatalog = serde_yaml::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<ArcCatalog, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_yaml(&raw)?;
        info!(
            "Loaded conversation arc catalog from {} ({} arcs, {} age bands)",
            path.display(),
            catalog.arcs.len(),
            catalog.age_adaptations.len()
        );
        Ok(catalog)
    }

    /// Every duration and age band a request can name must already be here.
    /// A gap is a deployment problem, so startup fails instead of a request.
    fn validate(&self) -> Result<(), CatalogError> {
        for duration in CallDuration::ALL {
            let arc = self
                .arcs
                .get(&duration)
                .ok_or(CatalogError::MissingArc(duration))?;
            if arc.phases.is_empty() {
                return Err(CatalogError::InvalidArc {
                    arc: arc.name.clone(),
                    reason: "arc has no phases".to_string(),
                });
            }
            if arc.total_duration_seconds == 0 {
                return Err(CatalogError::InvalidArc {
                    arc: arc.name.clone(),
                    reason: "total duration must be positive".to_string(),
                });
            }
            if let Some(phase) = arc.phases.iter().find(|p| p.duration_seconds == 0) {
                return Err(CatalogError::InvalidArc {
                    arc: arc.name.clone(),
                    reason: format!("phase '{}' has zero duration", phase.name),
                });
            }
            if !self.timing_guidelines.contains_key(&duration) {
                return Err(CatalogError::MissingTiming(duration));
            }
        }

        for band in AgeBand::ALL {
            if !self.age_adaptations.contains_key(&band) {
                return Err(CatalogError::MissingAdaptation(band));
            }
            match self.greeting_templates.get(&band) {
                Some(templates) if !templates.is_empty() => {}
                _ => return Err(CatalogError::MissingGreetings(band)),
            }
        }

        Ok(())
    }
}
