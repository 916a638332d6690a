//! Tone and length calibration — maps the requested style to phrasing guidance
//! interpolated into the generation prompt.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Requested voice of the generated passage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Enthusiastic,
    Formal,
}

/// Target length of a generated objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveLength {
    #[default]
    Short,
    Medium,
    Long,
}

/// Verb sets and phrasing calibrated to a tone.
#[derive(Debug, Clone)]
pub struct ToneGuidance {
    pub register: &'static str,
    pub preferred_phrases: Vec<&'static str>,
    pub avoid_phrases: Vec<&'static str>,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Formal => "formal",
        }
    }

    pub fn guidance(&self) -> ToneGuidance {
        match self {
            Tone::Professional => ToneGuidance {
                register: "confident and concise, plain business English",
                preferred_phrases: vec!["Results-driven", "Experienced", "Seeking to apply"],
                avoid_phrases: vec!["passionate", "dream job", "rockstar"],
            },
            Tone::Enthusiastic => ToneGuidance {
                register: "energetic and warm while staying credible",
                preferred_phrases: vec!["Excited to", "Eager to contribute", "Motivated"],
                avoid_phrases: vec!["hereby", "pursuant to", "whom it may concern"],
            },
            Tone::Formal => ToneGuidance {
                register: "formal and reserved, no contractions",
                preferred_phrases: vec!["Accomplished", "Dedicated", "Seeks a position"],
                avoid_phrases: vec!["super", "awesome", "can't wait"],
            },
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "enthusiastic" => Ok(Tone::Enthusiastic),
            "formal" => Ok(Tone::Formal),
            other => Err(format!(
                "unknown tone '{other}' (expected professional, enthusiastic or formal)"
            )),
        }
    }
}

impl ObjectiveLength {
    pub fn sentences(&self) -> &'static str {
        match self {
            ObjectiveLength::Short => "2-3 sentences",
            ObjectiveLength::Medium => "3-4 sentences",
            ObjectiveLength::Long => "4-5 sentences",
        }
    }
}
