use serde::{Deserialize, Serialize};

/// Relations held by the credential store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    Accounts,
    PendingSignups,
    BusinessProfiles,
    Posts,
    Workflows,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::PendingSignups => "pending_signups",
            Table::BusinessProfiles => "business_profiles",
            Table::Posts => "posts",
            Table::Workflows => "workflows",
        }
    }

    /// Column used to resolve upsert conflicts
    pub fn conflict_key(&self) -> &'static str {
        match self {
            Table::Accounts | Table::BusinessProfiles => "user_name",
            Table::PendingSignups | Table::Posts | Table::Workflows => "id",
        }
    }

    /// Columns carrying a uniqueness constraint
    pub fn unique_columns(&self) -> &'static [&'static str] {
        match self {
            Table::Accounts => &["user_name", "email_address"],
            Table::BusinessProfiles => &["user_name"],
            Table::PendingSignups | Table::Posts | Table::Workflows => &["id"],
        }
    }

    /// Tables whose `id` comes from a sequence
    pub fn has_serial_id(&self) -> bool {
        !matches!(self, Table::Accounts | Table::BusinessProfiles)
    }

    /// Tables whose `created_at` defaults to the insert time
    pub fn has_created_at(&self) -> bool {
        matches!(self, Table::Accounts | Table::PendingSignups | Table::Workflows)
    }

    /// SQL cast applied to bound parameters compared against `column`
    pub fn column_cast(column: &str) -> Option<&'static str> {
        match column {
            "created_at" => Some("timestamptz"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
