use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub user_name: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_introduction: Option<String>,
    #[serde(default)]
    pub products_services: Option<String>,
}
