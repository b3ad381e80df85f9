use serde::{Deserialize, Serialize};

/// Subscription tiers offered at signup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plan {
    #[serde(rename = "Trial - 7 posts")]
    Trial,
    Standard,
    Premium,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Trial, Plan::Standard, Plan::Premium];

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|plan| plan.label() == label)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Plan::Trial => "Trial - 7 posts",
            Plan::Standard => "Standard",
            Plan::Premium => "Premium",
        }
    }

    /// Posts allowed on the plan
    pub fn quota(&self) -> i32 {
        match self {
            Plan::Trial => 7,
            Plan::Standard => 60,
            Plan::Premium => 120,
        }
    }

    pub fn is_trial(&self) -> bool {
        matches!(self, Plan::Trial)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_table() {
        assert_eq!(Plan::from_label("Trial - 7 posts").map(|p| p.quota()), Some(7));
        assert_eq!(Plan::from_label("Standard").map(|p| p.quota()), Some(60));
        assert_eq!(Plan::from_label("Premium").map(|p| p.quota()), Some(120));
        assert!(Plan::from_label("standard").is_none());
        assert!(Plan::from_label("Enterprise").is_none());

        assert!(Plan::Trial.is_trial());
        assert!(!Plan::Standard.is_trial());
        assert_eq!(serde_json::to_value(Plan::Trial).unwrap(), "Trial - 7 posts");
    }
}
