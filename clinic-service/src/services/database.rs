//! PostgreSQL database service for clinic-service.
//!
//! All row access goes through this wrapper; handlers never touch the pool
//! directly.

use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{
    Clinic, ClinicUser, Doctor, Exam, MedicalRecord, MembershipDetail, Patient, Profile,
    RefreshSession, User, UserApiKey, UserIdentity, UserRegistration, VerificationToken,
};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Find user by ID.
    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find user by email (case-insensitive).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new user. A concurrent duplicate email surfaces as Conflict.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, email_verified, full_name, user_state_code, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.full_name)
        .bind(&user.user_state_code)
        .bind(user.created_utc)
        .bind(user.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!(e)),
        })?;
        Ok(())
    }

    /// Update user email verified status.
    pub async fn update_user_email_verified(
        &self,
        user_id: Uuid,
        verified: bool,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET email_verified = $1, updated_utc = NOW() WHERE user_id = $2",
        )
        .bind(verified)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Update user full name.
    pub async fn update_user_full_name(
        &self,
        user_id: Uuid,
        full_name: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET full_name = $1, updated_utc = NOW() WHERE user_id = $2")
            .bind(full_name)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== User Identity Operations ====================

    /// Find user identity by user ID and provider.
    pub async fn find_user_identity(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        sqlx::query_as::<_, UserIdentity>(
            "SELECT * FROM user_identities WHERE user_id = $1 AND ident_provider_code = $2",
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new user identity.
    pub async fn insert_user_identity(&self, identity: &UserIdentity) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_identities (ident_id, user_id, ident_provider_code, ident_hash, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(identity.ident_id)
        .bind(identity.user_id)
        .bind(&identity.ident_provider_code)
        .bind(&identity.ident_hash)
        .bind(identity.created_utc)
        .bind(identity.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Update user identity hash (for password changes and resets).
    pub async fn update_user_identity_hash(
        &self,
        user_id: Uuid,
        provider: &str,
        new_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE user_identities SET ident_hash = $1, updated_utc = NOW() WHERE user_id = $2 AND ident_provider_code = $3",
        )
        .bind(new_hash)
        .bind(user_id)
        .bind(provider)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Profile Operations ====================

    /// Find profile by user ID.
    pub async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Provision a profile if one does not exist yet. Concurrent first
    /// requests race here; ON CONFLICT DO NOTHING lets exactly one insert win.
    pub async fn provision_profile(&self, profile: &Profile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, app_role, clinic_ids, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(profile.user_id)
        .bind(&profile.app_role)
        .bind(&profile.clinic_ids)
        .bind(profile.created_utc)
        .bind(profile.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Refresh Session Operations ====================

    /// Find refresh session by token hash.
    pub async fn find_refresh_session_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, AppError> {
        sqlx::query_as::<_, RefreshSession>(
            "SELECT * FROM refresh_sessions WHERE token_hash_text = $1 AND revoked_utc IS NULL",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new refresh session.
    pub async fn insert_refresh_session(&self, session: &RefreshSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (session_id, user_id, token_hash_text, expiry_utc, revoked_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(&session.token_hash_text)
        .bind(session.expiry_utc)
        .bind(session.revoked_utc)
        .bind(session.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Revoke a refresh session.
    pub async fn revoke_refresh_session(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE refresh_sessions SET revoked_utc = NOW() WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Revoke all refresh sessions for a user.
    pub async fn revoke_all_user_sessions(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE refresh_sessions SET revoked_utc = NOW() WHERE user_id = $1 AND revoked_utc IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Verification Token Operations ====================

    /// Insert a verification token.
    pub async fn insert_verification_token(
        &self,
        token: &VerificationToken,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens (token_id, user_id, token_hash, token_type_code, expiry_utc, consumed_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.token_id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(&token.token_type_code)
        .bind(token.expiry_utc)
        .bind(token.consumed_utc)
        .bind(token.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Find a verification token by hash and type.
    pub async fn find_verification_token(
        &self,
        token_hash: &str,
        token_type: &str,
    ) -> Result<Option<VerificationToken>, AppError> {
        sqlx::query_as::<_, VerificationToken>(
            "SELECT * FROM verification_tokens WHERE token_hash = $1 AND token_type_code = $2",
        )
        .bind(token_hash)
        .bind(token_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Consume a verification token. Returns false if it was already
    /// consumed by a concurrent request.
    pub async fn consume_verification_token(&self, token_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE verification_tokens SET consumed_utc = NOW() WHERE token_id = $1 AND consumed_utc IS NULL",
        )
        .bind(token_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Clinic Operations ====================

    /// Find clinic by ID.
    pub async fn find_clinic_by_id(&self, clinic_id: Uuid) -> Result<Option<Clinic>, AppError> {
        sqlx::query_as::<_, Clinic>("SELECT * FROM clinics WHERE clinic_id = $1")
            .bind(clinic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new clinic.
    pub async fn insert_clinic(&self, clinic: &Clinic) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO clinics (clinic_id, owner_user_id, clinic_name, address, phone, clinic_state_code, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(clinic.clinic_id)
        .bind(clinic.owner_user_id)
        .bind(&clinic.clinic_name)
        .bind(&clinic.address)
        .bind(&clinic.phone)
        .bind(&clinic.clinic_state_code)
        .bind(clinic.created_utc)
        .bind(clinic.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Find clinics the user owns or is an accepted member of.
    pub async fn find_clinics_for_user(&self, user_id: Uuid) -> Result<Vec<Clinic>, AppError> {
        sqlx::query_as::<_, Clinic>(
            r#"
            SELECT * FROM clinics
            WHERE owner_user_id = $1
               OR clinic_id IN (
                    SELECT clinic_id FROM clinic_users
                    WHERE user_id = $1 AND accepted_at IS NOT NULL AND is_active = true
               )
            ORDER BY created_utc
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find active clinics owned by the user, oldest first.
    pub async fn find_clinics_owned_by(&self, user_id: Uuid) -> Result<Vec<Clinic>, AppError> {
        sqlx::query_as::<_, Clinic>(
            "SELECT * FROM clinics WHERE owner_user_id = $1 AND clinic_state_code = 'active' ORDER BY created_utc",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Update clinic fields.
    pub async fn update_clinic(&self, clinic: &Clinic) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE clinics
            SET clinic_name = $1, address = $2, phone = $3, updated_utc = NOW()
            WHERE clinic_id = $4
            "#,
        )
        .bind(&clinic.clinic_name)
        .bind(&clinic.address)
        .bind(&clinic.phone)
        .bind(clinic.clinic_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Archive a clinic.
    pub async fn archive_clinic(&self, clinic_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE clinics SET clinic_state_code = 'archived', updated_utc = NOW() WHERE clinic_id = $1",
        )
        .bind(clinic_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Clinic User Operations ====================

    /// Insert a new invitation row. Violating the one-open-invitation rule
    /// per (clinic, email, role) surfaces as Conflict.
    pub async fn insert_clinic_user(&self, clinic_user: &ClinicUser) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO clinic_users (clinic_user_id, clinic_id, member_role, user_id, is_active, token_hash, invitation_expires_at, invited_email, doctor_id, invited_by, accepted_at, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(clinic_user.clinic_user_id)
        .bind(clinic_user.clinic_id)
        .bind(&clinic_user.member_role)
        .bind(clinic_user.user_id)
        .bind(clinic_user.is_active)
        .bind(&clinic_user.token_hash)
        .bind(clinic_user.invitation_expires_at)
        .bind(&clinic_user.invited_email)
        .bind(clinic_user.doctor_id)
        .bind(&clinic_user.invited_by)
        .bind(clinic_user.accepted_at)
        .bind(clinic_user.created_utc)
        .bind(clinic_user.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                anyhow::anyhow!("An active invitation already exists for this email and role"),
            ),
            _ => AppError::DatabaseError(anyhow::anyhow!(e)),
        })?;
        Ok(())
    }

    /// Find clinic user by ID.
    pub async fn find_clinic_user_by_id(
        &self,
        clinic_user_id: Uuid,
    ) -> Result<Option<ClinicUser>, AppError> {
        sqlx::query_as::<_, ClinicUser>("SELECT * FROM clinic_users WHERE clinic_user_id = $1")
            .bind(clinic_user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find clinic user by token hash. No state filter: the caller
    /// classifies accepted and expired rows itself.
    pub async fn find_clinic_user_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<ClinicUser>, AppError> {
        sqlx::query_as::<_, ClinicUser>("SELECT * FROM clinic_users WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// List invitations for a clinic, newest first.
    pub async fn find_invitations_by_clinic(
        &self,
        clinic_id: Uuid,
    ) -> Result<Vec<ClinicUser>, AppError> {
        sqlx::query_as::<_, ClinicUser>(
            "SELECT * FROM clinic_users WHERE clinic_id = $1 ORDER BY created_utc DESC",
        )
        .bind(clinic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Replace the token and reset the expiry window on an unaccepted
    /// invitation. Returns None when the row was accepted in the meantime.
    pub async fn renew_invitation(
        &self,
        clinic_user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<ClinicUser>, AppError> {
        sqlx::query_as::<_, ClinicUser>(
            r#"
            UPDATE clinic_users
            SET token_hash = $1, invitation_expires_at = $2, updated_utc = NOW()
            WHERE clinic_user_id = $3 AND accepted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(token_hash)
        .bind(expires_at)
        .bind(clinic_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Accept an invitation and grant membership in one transaction: bind
    /// the user to the row, then upsert the profile role and clinic list.
    /// Returns None when a concurrent acceptance won the guarded update.
    pub async fn accept_invitation_grant(
        &self,
        clinic_user_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ClinicUser>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let accepted = sqlx::query_as::<_, ClinicUser>(
            r#"
            UPDATE clinic_users
            SET user_id = $1, is_active = true, accepted_at = NOW(), updated_utc = NOW()
            WHERE clinic_user_id = $2 AND accepted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(clinic_user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let Some(accepted) = accepted else {
            tx.rollback()
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, app_role, clinic_ids, created_utc, updated_utc)
            VALUES ($1, $2, ARRAY[$3]::uuid[], NOW(), NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET app_role = EXCLUDED.app_role,
                clinic_ids = CASE
                    WHEN $3 = ANY(profiles.clinic_ids) THEN profiles.clinic_ids
                    ELSE array_append(profiles.clinic_ids, $3)
                END,
                updated_utc = NOW()
            "#,
        )
        .bind(user_id)
        .bind(&accepted.member_role)
        .bind(accepted.clinic_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(Some(accepted))
    }

    /// Revoke an invitation or membership: delete the row and drop the
    /// clinic from the bound user's profile, transactionally.
    pub async fn delete_clinic_user(&self, clinic_user_id: Uuid) -> Result<bool, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let removed: Option<(Option<Uuid>, Uuid)> = sqlx::query_as(
            "DELETE FROM clinic_users WHERE clinic_user_id = $1 RETURNING user_id, clinic_id",
        )
        .bind(clinic_user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let Some((user_id, clinic_id)) = removed else {
            tx.rollback()
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
            return Ok(false);
        };

        if let Some(user_id) = user_id {
            sqlx::query(
                "UPDATE profiles SET clinic_ids = array_remove(clinic_ids, $1), updated_utc = NOW() WHERE user_id = $2",
            )
            .bind(clinic_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(true)
    }

    /// Revoke every clinic_users row bound to a doctor (the doctor edit
    /// "revoke system access" path). Returns the number of rows removed.
    pub async fn delete_clinic_users_for_doctor(&self, doctor_id: Uuid) -> Result<u64, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        let removed: Vec<(Option<Uuid>, Uuid)> = sqlx::query_as(
            "DELETE FROM clinic_users WHERE doctor_id = $1 RETURNING user_id, clinic_id",
        )
        .bind(doctor_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        for (user_id, clinic_id) in &removed {
            if let Some(user_id) = user_id {
                sqlx::query(
                    "UPDATE profiles SET clinic_ids = array_remove(clinic_ids, $1), updated_utc = NOW() WHERE user_id = $2",
                )
                .bind(clinic_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(removed.len() as u64)
    }

    /// Find the caller's accepted membership in a clinic.
    pub async fn find_membership_for_user_in_clinic(
        &self,
        user_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<ClinicUser>, AppError> {
        sqlx::query_as::<_, ClinicUser>(
            r#"
            SELECT * FROM clinic_users
            WHERE user_id = $1 AND clinic_id = $2 AND accepted_at IS NOT NULL AND is_active = true
            "#,
        )
        .bind(user_id)
        .bind(clinic_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Load the caller's accepted memberships joined with clinic names,
    /// oldest acceptance first.
    pub async fn find_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MembershipDetail>, AppError> {
        sqlx::query_as::<_, MembershipDetail>(
            r#"
            SELECT cu.clinic_user_id, cu.clinic_id, c.clinic_name, cu.member_role, cu.doctor_id, cu.accepted_at
            FROM clinic_users cu
            JOIN clinics c ON c.clinic_id = cu.clinic_id
            WHERE cu.user_id = $1 AND cu.accepted_at IS NOT NULL AND cu.is_active = true
            ORDER BY cu.accepted_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Doctor Operations ====================

    /// Insert a new doctor.
    pub async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO doctors (doctor_id, clinic_id, full_name, specialty, license_number, email, phone, is_active, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(doctor.doctor_id)
        .bind(doctor.clinic_id)
        .bind(&doctor.full_name)
        .bind(&doctor.specialty)
        .bind(&doctor.license_number)
        .bind(&doctor.email)
        .bind(&doctor.phone)
        .bind(doctor.is_active)
        .bind(doctor.created_utc)
        .bind(doctor.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Find doctor by ID.
    pub async fn find_doctor_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, AppError> {
        sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE doctor_id = $1")
            .bind(doctor_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// List doctors for a clinic.
    pub async fn find_doctors_by_clinic(&self, clinic_id: Uuid) -> Result<Vec<Doctor>, AppError> {
        sqlx::query_as::<_, Doctor>(
            "SELECT * FROM doctors WHERE clinic_id = $1 ORDER BY full_name",
        )
        .bind(clinic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Update doctor fields.
    pub async fn update_doctor(&self, doctor: &Doctor) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE doctors
            SET full_name = $1, specialty = $2, license_number = $3, email = $4, phone = $5, is_active = $6, updated_utc = NOW()
            WHERE doctor_id = $7
            "#,
        )
        .bind(&doctor.full_name)
        .bind(&doctor.specialty)
        .bind(&doctor.license_number)
        .bind(&doctor.email)
        .bind(&doctor.phone)
        .bind(doctor.is_active)
        .bind(doctor.doctor_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Deactivate a doctor.
    pub async fn deactivate_doctor(&self, doctor_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE doctors SET is_active = false, updated_utc = NOW() WHERE doctor_id = $1")
            .bind(doctor_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Patient Operations ====================

    /// Insert a new patient.
    pub async fn insert_patient(&self, patient: &Patient) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO patients (patient_id, clinic_id, full_name, email, phone, birth_date, notes, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(patient.patient_id)
        .bind(patient.clinic_id)
        .bind(&patient.full_name)
        .bind(&patient.email)
        .bind(&patient.phone)
        .bind(patient.birth_date)
        .bind(&patient.notes)
        .bind(patient.created_utc)
        .bind(patient.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Find patient by ID.
    pub async fn find_patient_by_id(&self, patient_id: Uuid) -> Result<Option<Patient>, AppError> {
        sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE patient_id = $1")
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// List patients for a clinic, optionally filtered by a name search.
    pub async fn find_patients_by_clinic(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Patient>, AppError> {
        match search {
            Some(term) => sqlx::query_as::<_, Patient>(
                "SELECT * FROM patients WHERE clinic_id = $1 AND full_name ILIKE $2 ORDER BY full_name",
            )
            .bind(clinic_id)
            .bind(format!("%{}%", term))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e))),
            None => sqlx::query_as::<_, Patient>(
                "SELECT * FROM patients WHERE clinic_id = $1 ORDER BY full_name",
            )
            .bind(clinic_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e))),
        }
    }

    /// Update patient fields.
    pub async fn update_patient(&self, patient: &Patient) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE patients
            SET full_name = $1, email = $2, phone = $3, birth_date = $4, notes = $5, updated_utc = NOW()
            WHERE patient_id = $6
            "#,
        )
        .bind(&patient.full_name)
        .bind(&patient.email)
        .bind(&patient.phone)
        .bind(patient.birth_date)
        .bind(&patient.notes)
        .bind(patient.patient_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Delete a patient. Exams and medical records cascade.
    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM patients WHERE patient_id = $1")
            .bind(patient_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Exam Operations ====================

    /// Insert a new exam.
    pub async fn insert_exam(&self, exam: &Exam) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO exams (exam_id, clinic_id, patient_id, doctor_id, exam_type, exam_status_code, requested_utc, performed_utc, result_summary, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(exam.exam_id)
        .bind(exam.clinic_id)
        .bind(exam.patient_id)
        .bind(exam.doctor_id)
        .bind(&exam.exam_type)
        .bind(&exam.exam_status_code)
        .bind(exam.requested_utc)
        .bind(exam.performed_utc)
        .bind(&exam.result_summary)
        .bind(exam.created_utc)
        .bind(exam.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Find exam by ID.
    pub async fn find_exam_by_id(&self, exam_id: Uuid) -> Result<Option<Exam>, AppError> {
        sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE exam_id = $1")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// List exams for a clinic with optional patient and status filters.
    pub async fn find_exams_by_clinic(
        &self,
        clinic_id: Uuid,
        patient_id: Option<Uuid>,
        status: Option<&str>,
    ) -> Result<Vec<Exam>, AppError> {
        let mut conditions = vec!["clinic_id = $1".to_string()];
        let mut param_idx = 2;

        if patient_id.is_some() {
            conditions.push(format!("patient_id = ${}", param_idx));
            param_idx += 1;
        }
        if status.is_some() {
            conditions.push(format!("exam_status_code = ${}", param_idx));
        }

        let query = format!(
            "SELECT * FROM exams WHERE {} ORDER BY requested_utc DESC",
            conditions.join(" AND ")
        );

        let mut q = sqlx::query_as::<_, Exam>(&query).bind(clinic_id);
        if let Some(pid) = patient_id {
            q = q.bind(pid);
        }
        if let Some(st) = status {
            q = q.bind(st);
        }

        q.fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Update exam fields.
    pub async fn update_exam(&self, exam: &Exam) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE exams
            SET doctor_id = $1, exam_type = $2, exam_status_code = $3, performed_utc = $4, result_summary = $5, updated_utc = NOW()
            WHERE exam_id = $6
            "#,
        )
        .bind(exam.doctor_id)
        .bind(&exam.exam_type)
        .bind(&exam.exam_status_code)
        .bind(exam.performed_utc)
        .bind(&exam.result_summary)
        .bind(exam.exam_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Delete an exam.
    pub async fn delete_exam(&self, exam_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM exams WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Medical Record Operations ====================

    /// Insert a new medical record.
    pub async fn insert_medical_record(&self, record: &MedicalRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO medical_records (record_id, clinic_id, patient_id, doctor_id, record_date, chief_complaint, diagnosis, prescription, notes, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.record_id)
        .bind(record.clinic_id)
        .bind(record.patient_id)
        .bind(record.doctor_id)
        .bind(record.record_date)
        .bind(&record.chief_complaint)
        .bind(&record.diagnosis)
        .bind(&record.prescription)
        .bind(&record.notes)
        .bind(record.created_utc)
        .bind(record.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Find medical record by ID.
    pub async fn find_medical_record_by_id(
        &self,
        record_id: Uuid,
    ) -> Result<Option<MedicalRecord>, AppError> {
        sqlx::query_as::<_, MedicalRecord>("SELECT * FROM medical_records WHERE record_id = $1")
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// List medical records for a clinic, optionally for one patient.
    pub async fn find_medical_records_by_clinic(
        &self,
        clinic_id: Uuid,
        patient_id: Option<Uuid>,
    ) -> Result<Vec<MedicalRecord>, AppError> {
        match patient_id {
            Some(pid) => sqlx::query_as::<_, MedicalRecord>(
                "SELECT * FROM medical_records WHERE clinic_id = $1 AND patient_id = $2 ORDER BY record_date DESC, created_utc DESC",
            )
            .bind(clinic_id)
            .bind(pid)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e))),
            None => sqlx::query_as::<_, MedicalRecord>(
                "SELECT * FROM medical_records WHERE clinic_id = $1 ORDER BY record_date DESC, created_utc DESC",
            )
            .bind(clinic_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e))),
        }
    }

    /// Update medical record fields.
    pub async fn update_medical_record(&self, record: &MedicalRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE medical_records
            SET record_date = $1, chief_complaint = $2, diagnosis = $3, prescription = $4, notes = $5, updated_utc = NOW()
            WHERE record_id = $6
            "#,
        )
        .bind(record.record_date)
        .bind(&record.chief_complaint)
        .bind(&record.diagnosis)
        .bind(&record.prescription)
        .bind(&record.notes)
        .bind(record.record_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Delete a medical record.
    pub async fn delete_medical_record(&self, record_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM medical_records WHERE record_id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== API Key Operations ====================

    /// Insert a new API key.
    pub async fn insert_api_key(&self, key: &UserApiKey) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_api_keys (api_key_id, user_id, key_label, key_hash, created_utc, revoked_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(key.api_key_id)
        .bind(key.user_id)
        .bind(&key.key_label)
        .bind(&key.key_hash)
        .bind(key.created_utc)
        .bind(key.revoked_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// List API keys for a user, newest first.
    pub async fn find_api_keys_for_user(&self, user_id: Uuid) -> Result<Vec<UserApiKey>, AppError> {
        sqlx::query_as::<_, UserApiKey>(
            "SELECT * FROM user_api_keys WHERE user_id = $1 ORDER BY created_utc DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Revoke an API key owned by the user. Returns false when no such
    /// active key exists.
    pub async fn revoke_api_key(&self, api_key_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE user_api_keys SET revoked_utc = NOW() WHERE api_key_id = $1 AND user_id = $2 AND revoked_utc IS NULL",
        )
        .bind(api_key_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Registration Operations ====================

    /// Insert a landing page registration.
    pub async fn insert_registration(
        &self,
        registration: &UserRegistration,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_registrations (registration_id, full_name, email, phone, clinic_name, message, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(registration.registration_id)
        .bind(&registration.full_name)
        .bind(&registration.email)
        .bind(&registration.phone)
        .bind(&registration.clinic_name)
        .bind(&registration.message)
        .bind(registration.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// List all registrations, newest first.
    pub async fn find_all_registrations(&self) -> Result<Vec<UserRegistration>, AppError> {
        sqlx::query_as::<_, UserRegistration>(
            "SELECT * FROM user_registrations ORDER BY created_utc DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}
