use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{thread_rng, Rng};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{hash_password_async, PasswordError};
use crate::filter::FilterData;
use crate::notify::{NotifyError, Notifier};
use crate::store::models::{Account, PendingSignup, Plan};
use crate::store::repository::to_row;
use crate::store::{timestamp, CredentialStore, Mutation, Repository, StoreError, Table};

use super::validation::{validate_email_format, validate_password, validate_username_format};

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Username / email already taken")]
    DuplicateIdentity,

    #[error("User not found")]
    NotFound,

    #[error("Invalid OTP")]
    InvalidCode,

    #[error("Unknown subscription plan '{0}'")]
    UnknownTier(String),

    #[error("Failed to send verification code: {0}")]
    Notification(#[from] NotifyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Six decimal digits, uniform over 100000..=999999
pub fn generate_otp() -> String {
    thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Email OTP signup: pending record, emailed code, then promotion to an
/// account once the code is confirmed.
#[derive(Clone)]
pub struct SignupService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
}

impl SignupService {
    pub fn new(store: Arc<dyn CredentialStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    fn pending(&self) -> Repository<PendingSignup> {
        Repository::new(Table::PendingSignups, self.store.clone())
    }

    /// Records a pending signup and emails its verification code
    ///
    /// Earlier pending rows for the same username or email are replaced in
    /// the same batch as the insert, so at most one pending row survives.
    ///
    /// # Arguments
    /// * `username` - Requested username, already trimmed by the caller
    /// * `email` - Destination for the verification code
    /// * `password` - Plain-text password; only its Argon2id hash is stored
    /// * `plan` - Plan label, one of [`Plan::label`]
    ///
    /// # Returns
    /// * `Ok(String)` - The username the pending row was recorded under
    /// * `Err(SignupError)` - Invalid input, taken identity, store or mail failure
    pub async fn initiate_signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        plan: &str,
    ) -> Result<String, SignupError> {
        // Input checks come before any store access
        validate_username_format(username).map_err(SignupError::InvalidInput)?;
        validate_email_format(email).map_err(SignupError::InvalidInput)?;
        validate_password(password).map_err(SignupError::InvalidInput)?;
        if Plan::from_label(plan).is_none() {
            return Err(SignupError::InvalidInput(format!("Unknown plan '{}'", plan)));
        }

        let same_identity = json!({
            "$or": [ { "user_name": username }, { "email_address": email } ]
        });

        // Registered accounts win over pending rows
        let taken = self
            .store
            .select(
                Table::Accounts,
                FilterData::matching(same_identity.clone()).columns(&["user_name"]).limit(1),
            )
            .await?;
        if !taken.is_empty() {
            warn!(%username, "signup rejected: identity already registered");
            return Err(SignupError::DuplicateIdentity);
        }

        let code = generate_otp();
        let pending = PendingSignup {
            user_name: username.to_string(),
            email_address: email.to_string(),
            password: hash_password_async(password).await?,
            plan: plan.to_string(),
            otp_generated: code.clone(),
            created_at: None,
        };

        // Replace any earlier attempt for this identity
        self.store
            .apply(vec![
                Mutation::Delete {
                    table: Table::PendingSignups,
                    filter: same_identity,
                },
                Mutation::Insert {
                    table: Table::PendingSignups,
                    row: to_row(&pending)?,
                },
            ])
            .await?;

        self.notifier.send_verification_code(email, &code, username).await?;

        info!(%username, %plan, "pending signup recorded");
        Ok(username.to_string())
    }

    /// Promotes the newest pending signup for `username` to an account
    ///
    /// # Arguments
    /// * `username` - Username the signup was recorded under
    /// * `submitted_code` - Code as typed by the user; compared as text, so
    ///   `"007"` and `"7"` differ
    ///
    /// # Returns
    /// * `Ok(Account)` - The provisioned account
    /// * `Err(SignupError::NotFound)` - No pending signup for `username`
    /// * `Err(SignupError::InvalidCode)` - Code mismatch; the pending row is kept
    pub async fn verify_signup(&self, username: &str, submitted_code: &str) -> Result<Account, SignupError> {
        let pending = self
            .pending()
            .select_one(FilterData::matching(json!({ "user_name": username })).order_by("created_at desc, id desc"))
            .await?
            .ok_or(SignupError::NotFound)?;

        if pending.otp_generated != submitted_code {
            warn!(%username, "verification code mismatch");
            return Err(SignupError::InvalidCode);
        }

        let plan = Plan::from_label(&pending.plan).ok_or_else(|| SignupError::UnknownTier(pending.plan.clone()))?;

        let account = Account {
            user_name: pending.user_name,
            email_address: pending.email_address,
            password: pending.password,
            account_status: Account::STATUS_ACTIVE.to_string(),
            subscription_type: plan.label().to_string(),
            total_token_limit: plan.quota(),
            tokens_used: 0,
            is_trial: plan.is_trial(),
            inst_access_token: None,
            ig_user_id: None,
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            num_of_posts: None,
            frequency: None,
            dontuseuntil: None,
            posting_hours: None,
            created_at: None,
        };

        // Account insert and pending cleanup succeed or fail together
        let promoted = self
            .store
            .apply(vec![
                Mutation::Insert {
                    table: Table::Accounts,
                    row: to_row(&account)?,
                },
                Mutation::Delete {
                    table: Table::PendingSignups,
                    filter: json!({ "user_name": username }),
                },
            ])
            .await;

        match promoted {
            Ok(()) => {
                info!(%username, plan = %plan, "account provisioned");
                Ok(account)
            }
            Err(StoreError::Conflict { .. }) => {
                warn!(%username, "account already provisioned by a concurrent verification");
                Err(SignupError::DuplicateIdentity)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes pending signups created more than `older_than` ago
    pub async fn prune_pending(&self, older_than: Duration) -> Result<u64, SignupError> {
        let cutoff = timestamp(Utc::now() - older_than);
        let removed = self
            .pending()
            .delete_where(json!({ "created_at": { "$lt": cutoff } }))
            .await?;
        info!(removed, %cutoff, "pruned pending signups");
        Ok(removed)
    }
}
