use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Language-model backends the enrichment stage can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelBackend {
    Claude,
    DeepseekChat,
    DeepseekReasoner,
}

#[derive(Debug, Error)]
#[error("unknown model backend '{0}' (expected one of: claude, deepseek-chat, deepseek-reasoner)")]
pub struct UnknownModelBackend(pub String);

impl ModelBackend {
    pub const ALL: [ModelBackend; 3] = [
        ModelBackend::Claude,
        ModelBackend::DeepseekChat,
        ModelBackend::DeepseekReasoner,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ModelBackend::Claude => "claude",
            ModelBackend::DeepseekChat => "deepseek-chat",
            ModelBackend::DeepseekReasoner => "deepseek-reasoner",
        }
    }
}

impl std::fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelBackend {
    type Err = UnknownModelBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ModelBackend::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or(UnknownModelBackend(s.to_string()))
    }
}
