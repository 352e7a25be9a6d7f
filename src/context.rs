use serde::{Deserialize, Serialize};

/// Caller-supplied identity used for targeting and telemetry.
///
/// A context is read-only from the engine's point of view: it is supplied fresh on every
/// evaluation call and never mutated.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub user: Option<UserContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub company: Option<CompanyContext>,
}

/// The user half of a [`Context`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct UserContext {
    /// User key. Required whenever a user context is present.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub email: Option<String>,
}

/// The company half of a [`Context`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CompanyContext {
    /// Company key. Required whenever a company context is present.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub name: Option<String>,
}

impl Context {
    /// Create an empty context (no user, no company).
    pub fn new() -> Context {
        Context::default()
    }

    /// Create a context for the given user key.
    pub fn for_user(key: impl Into<String>) -> Context {
        Context::new().with_user(UserContext {
            key: key.into(),
            ..UserContext::default()
        })
    }

    /// Create a context for the given company key.
    pub fn for_company(key: impl Into<String>) -> Context {
        Context::new().with_company(CompanyContext {
            key: key.into(),
            ..CompanyContext::default()
        })
    }

    /// Set the user context.
    pub fn with_user(mut self, user: UserContext) -> Context {
        self.user = Some(user);
        self
    }

    /// Set the company context.
    pub fn with_company(mut self, company: CompanyContext) -> Context {
        self.company = Some(company);
        self
    }

    /// The identity used for rollout bucketing: the user key if a user is present, else the
    /// company key, else the empty string.
    ///
    /// An identity-less context yields `""`, which is still a valid hash input. See
    /// [`crate::rollout::is_in_rollout`].
    pub(crate) fn rollout_target_id(&self) -> &str {
        if let Some(user) = &self.user {
            &user.key
        } else if let Some(company) = &self.company {
            &company.key
        } else {
            ""
        }
    }
}
