use crate::models::{Account, Address, Prescription, Role, UpdateProfileRequest};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Every column of the canonical row, in `Account` field order.
const COLUMNS: &str = "id, name, email, password_hash, google_id, role, phone, dob, \
     profile_picture, blood_donor, is_active, address, prescriptions, created_at, updated_at";

/// Fields needed to create an account, local or OAuth-born.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub role: Role,
    pub profile_picture: Option<String>,
}

/// The Account Store. Exclusively owns the canonical records; handlers only
/// ever hold request-scoped copies of what it returns.
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

pub type DbResult<T> = Result<T, sqlx::Error>;

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool and run pending migrations.
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        sqlx::migrate!().run(&pool).await?;
        info!("database connection pool created");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn is_healthy(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!("database health check failed: {}", e);
                false
            }
        }
    }

    pub async fn insert(&self, new: NewAccount) -> DbResult<Account> {
        let sql = format!(
            "INSERT INTO accounts (name, email, password_hash, google_id, role, profile_picture) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.google_id)
            .bind(new.role)
            .bind(&new.profile_picture)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Account>> {
        let sql = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Account>> {
        let sql = format!("SELECT {COLUMNS} FROM accounts WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Lookup for the OAuth callback: the external id wins over the email
    /// when both match different rows.
    pub async fn find_by_google_id_or_email(
        &self,
        google_id: &str,
        email: &str,
    ) -> DbResult<Option<Account>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM accounts \
             WHERE google_id = $1 OR LOWER(email) = LOWER($2) \
             ORDER BY (google_id = $1) DESC NULLS LAST \
             LIMIT 1"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(google_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Field-granular partial update: absent fields keep their stored value,
    /// the address sub-record is replaced as a whole when supplied.
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: &UpdateProfileRequest,
    ) -> DbResult<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET \
                name = COALESCE($2, name), \
                phone = COALESCE($3, phone), \
                dob = COALESCE($4, dob), \
                blood_donor = COALESCE($5, blood_donor), \
                profile_picture = COALESCE($6, profile_picture), \
                address = COALESCE($7, address), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.phone)
            .bind(update.dob)
            .bind(update.blood_donor)
            .bind(&update.profile_picture)
            .bind(update.address.clone().map(Json))
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn update_address(&self, id: Uuid, address: &Address) -> DbResult<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET address = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(Json(address.clone()))
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Attach an external identity to an existing local account, backfilling
    /// the avatar only when none is set.
    pub async fn link_google(
        &self,
        id: Uuid,
        google_id: &str,
        picture: Option<&str>,
    ) -> DbResult<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET \
                google_id = $2, \
                profile_picture = COALESCE(profile_picture, $3), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(google_id)
            .bind(picture)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn append_prescription(
        &self,
        id: Uuid,
        prescription: &Prescription,
    ) -> DbResult<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET \
                prescriptions = prescriptions || jsonb_build_array($2::jsonb), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(Json(prescription.clone()))
            .fetch_optional(&self.pool)
            .await
    }

    /// Remove a prescription record by id. Removing an id that is not
    /// present leaves the collection unchanged; this is not an error.
    pub async fn remove_prescription(
        &self,
        id: Uuid,
        prescription_id: Uuid,
    ) -> DbResult<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET \
                prescriptions = COALESCE( \
                    (SELECT jsonb_agg(p) FROM jsonb_array_elements(prescriptions) AS p \
                     WHERE p->>'id' <> $2), \
                    '[]'::jsonb), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(prescription_id.to_string())
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn toggle_active(&self, id: Uuid) -> DbResult<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET is_active = NOT is_active, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All accounts, most recently modified first.
    pub async fn list_all(&self) -> DbResult<Vec<Account>> {
        let sql = format!("SELECT {COLUMNS} FROM accounts ORDER BY updated_at DESC");
        sqlx::query_as::<_, Account>(&sql).fetch_all(&self.pool).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_by_role(&self) -> DbResult<Vec<(String, i64)>> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT role::text, COUNT(*) FROM accounts GROUP BY role",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Daily registration counts for the trailing seven days, oldest first.
    pub async fn registration_trend(&self) -> DbResult<Vec<(String, i64)>> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT to_char(created_at, 'YYYY-MM-DD') AS day, COUNT(*) \
             FROM accounts \
             WHERE created_at >= NOW() - INTERVAL '7 days' \
             GROUP BY day ORDER BY day",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn last_modified(&self) -> DbResult<Option<Account>> {
        let sql = format!("SELECT {COLUMNS} FROM accounts ORDER BY updated_at DESC LIMIT 1");
        sqlx::query_as::<_, Account>(&sql)
            .fetch_optional(&self.pool)
            .await
    }
}
