use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

/// Account role. Wire names match what the dashboard ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Doctor => "doctor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal address sub-record. Replaced wholesale, never deep-merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub country: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub city: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
}

/// One uploaded prescription document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    /// Collision-resistant stored name derived from the upload time.
    pub filename: String,
    pub original_name: String,
    /// Path relative to the server working directory, under the upload root.
    pub path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Canonical account row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Absent only for accounts that authenticate through the external
    /// identity provider.
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
    pub dob: Option<NaiveDate>,
    pub profile_picture: Option<String>,
    pub blood_donor: bool,
    pub is_active: bool,
    pub address: Option<Json<Address>>,
    pub prescriptions: Json<Vec<Prescription>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full account view returned to its owner (and to admins). Everything but
/// the password digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub blood_donor: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub prescriptions: Vec<Prescription>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            google_id: account.google_id,
            role: account.role,
            phone: account.phone,
            dob: account.dob,
            profile_picture: account.profile_picture,
            blood_donor: account.blood_donor,
            is_active: account.is_active,
            address: account.address.map(|a| a.0),
            prescriptions: account.prescriptions.0,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Compact view embedded in auth responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            profile_picture: account.profile_picture.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies, validated at the API boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is malformed"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "email is malformed"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Partial profile update. Absent fields stay untouched; the email is not
/// mutable through this path at all.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub dob: Option<NaiveDate>,
    pub blood_donor: Option<bool>,
    pub address: Option<Address>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "new password must be at least 8 characters"))]
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub token: String,
    pub user: AccountSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub user: AccountSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountListResponse {
    pub users: Vec<AccountView>,
    pub total: usize,
}

/// One day of the trailing registration trend.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationDay {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub total_users: i64,
    pub users_by_role: std::collections::BTreeMap<String, i64>,
    pub registration_trend: Vec<RegistrationDay>,
    /// Coarse "last activity" proxy: the most recently modified account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_logged_in_user: Option<AccountView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusToggleResponse {
    pub message: String,
    pub user: AccountView,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            password_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$abc$def".into()),
            google_id: None,
            role: Role::User,
            phone: Some("9876543210".into()),
            dob: None,
            profile_picture: None,
            blood_donor: false,
            is_active: true,
            address: None,
            prescriptions: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn view_never_carries_the_digest() {
        let view = AccountView::from(sample_account());
        let json = serde_json::to_value(&view).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert!(keys.iter().all(|k| !k.to_lowercase().contains("password")));
        assert!(keys.iter().all(|k| !k.to_lowercase().contains("hash")));
    }

    #[test]
    fn view_uses_client_field_names() {
        let mut account = sample_account();
        account.blood_donor = true;
        let json = serde_json::to_value(AccountView::from(account)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("bloodDonor"));
        assert!(obj.contains_key("isActive"));
        assert!(obj.contains_key("createdAt"));
        assert!(obj.contains_key("updatedAt"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Doctor).unwrap(), "doctor");
        assert_eq!(
            serde_json::from_value::<Role>(serde_json::json!("admin")).unwrap(),
            Role::Admin
        );
        assert!(serde_json::from_value::<Role>(serde_json::json!("superuser")).is_err());
    }

    #[test]
    fn register_request_validation() {
        let ok = RegisterRequest {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "longenough".into(),
            role: None,
        };
        assert!(validator::Validate::validate(&ok).is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..ok
        };
        assert!(validator::Validate::validate(&bad_email).is_err());
    }

    #[test]
    fn prescription_wire_shape() {
        let p = Prescription {
            id: Uuid::new_v4(),
            filename: "1700000000000-scan.pdf".into(),
            original_name: "scan.pdf".into(),
            path: "uploads/prescriptions/1700000000000-scan.pdf".into(),
            uploaded_at: Utc::now(),
        };
        let json = serde_json::to_value(&p).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("originalName"));
        assert!(obj.contains_key("uploadedAt"));
    }
}
