use serde::{Deserialize, Serialize};
use std::fmt;

/// Display classification for an assistant reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentCategory {
    Logic,
    Math,
    Code,
    #[default]
    Chat,
}

/// Static presentation metadata for an agent category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentProfile {
    pub label: &'static str,
    pub reference_model: &'static str,
}

// Served-model markers, checked in this order.
const MATH_MARKERS: &[&str] = &["qwen"];
const LOGIC_MARKERS: &[&str] = &["deepseek"];
const CODE_MARKERS: &[&str] = &["llama-3.3", "versatile"];

impl AgentCategory {
    pub const ALL: [AgentCategory; 4] = [
        AgentCategory::Logic,
        AgentCategory::Math,
        AgentCategory::Code,
        AgentCategory::Chat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentCategory::Logic => "logic",
            AgentCategory::Math => "math",
            AgentCategory::Code => "code",
            AgentCategory::Chat => "chat",
        }
    }

    pub fn profile(self) -> AgentProfile {
        match self {
            AgentCategory::Logic => AgentProfile {
                label: "Logic Agent",
                reference_model: "DeepSeek R1",
            },
            AgentCategory::Math => AgentProfile {
                label: "Math Agent",
                reference_model: "Qwen 2.5 72B",
            },
            AgentCategory::Code => AgentProfile {
                label: "Code Agent",
                reference_model: "Llama 3.3 70B",
            },
            AgentCategory::Chat => AgentProfile {
                label: "Chat Agent",
                reference_model: "Llama 3.1 8B",
            },
        }
    }
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AgentCategory {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "logic" => Ok(AgentCategory::Logic),
            "math" => Ok(AgentCategory::Math),
            "code" => Ok(AgentCategory::Code),
            "chat" => Ok(AgentCategory::Chat),
            _ => Err(format!("invalid agent category: {value}")),
        }
    }
}

/// Map the model the backend actually served onto an agent category.
///
/// First matching rule wins; identifiers that match nothing are `Chat`.
/// Matching ignores ASCII case.
pub fn classify(served_model: &str) -> AgentCategory {
    let model = served_model.to_ascii_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|m| model.contains(m));

    if contains_any(MATH_MARKERS) {
        AgentCategory::Math
    } else if contains_any(LOGIC_MARKERS) {
        AgentCategory::Logic
    } else if contains_any(CODE_MARKERS) {
        AgentCategory::Code
    } else {
        AgentCategory::Chat
    }
}

/// Routing target sent as the request `model`: either a forced category or
/// backend-side automatic routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoutingTarget {
    #[default]
    Auto,
    Forced(AgentCategory),
}

impl RoutingTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingTarget::Auto => "auto",
            RoutingTarget::Forced(category) => category.as_str(),
        }
    }
}

impl From<Option<AgentCategory>> for RoutingTarget {
    fn from(value: Option<AgentCategory>) -> Self {
        value.map_or(RoutingTarget::Auto, RoutingTarget::Forced)
    }
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_model_families() {
        assert_eq!(classify("qwen/qwen-2.5-72b-instruct"), AgentCategory::Math);
        assert_eq!(classify("deepseek/deepseek-r1"), AgentCategory::Logic);
        assert_eq!(classify("meta-llama/llama-3.3-70b-instruct"), AgentCategory::Code);
        assert_eq!(classify("llama-3.3-70b-versatile"), AgentCategory::Code);
        assert_eq!(classify("groq/mixtral-versatile"), AgentCategory::Code);
    }

    #[test]
    fn unknown_models_fall_back_to_chat() {
        assert_eq!(classify("llama-3.1-8b-instant"), AgentCategory::Chat);
        assert_eq!(classify(""), AgentCategory::Chat);
        assert_eq!(classify("gpt-4o"), AgentCategory::Chat);
    }

    #[test]
    fn earlier_rules_win_over_later_ones() {
        // math beats logic, logic beats code
        assert_eq!(classify("deepseek-qwen-distill"), AgentCategory::Math);
        assert_eq!(classify("deepseek-r1-distill-llama-3.3"), AgentCategory::Logic);
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(classify("DeepSeek-R1"), AgentCategory::Logic);
        assert_eq!(classify("Qwen2.5-Math"), AgentCategory::Math);
    }

    #[test]
    fn every_category_has_a_profile() {
        for category in AgentCategory::ALL {
            let profile = category.profile();
            assert!(profile.label.ends_with("Agent"));
            assert!(!profile.reference_model.is_empty());
            assert_eq!(AgentCategory::try_from(category.as_str()), Ok(category));
        }
    }

    #[test]
    fn routing_target_names() {
        assert_eq!(RoutingTarget::from(None).as_str(), "auto");
        assert_eq!(
            RoutingTarget::from(Some(AgentCategory::Math)).to_string(),
            "math"
        );
    }
}
