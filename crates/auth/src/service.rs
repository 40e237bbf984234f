use crate::account_lockout::AccountLockoutService;
use crate::audit::AuditService;
use crate::credentials::{
    generate_secure_password, sanitize_input, validate_email, validate_password_strength,
    validate_username, GENERATED_PASSWORD_LEN,
};
use crate::error::{AuthError, Result};
use crate::jwt::{generate_session_id, hash_token, AccessClaims, JwtService};
use crate::password::{PasswordHasher, DEFAULT_BCRYPT_COST};
use chrono::Utc;
use gymdesk_cache::Cache;
use gymdesk_database::{Database, DatabaseError, SessionRepository, UserRepository};
use gymdesk_models::{
    events, ChangePassword, NewSecurityEvent, NewSession, NewUser, SecurityEvent,
    SecurityEventQuery, Session, UpdateUser, User, UserProfile, UserRole,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const USER_CACHE_TTL_SECS: usize = 900;

/// Tunable security knobs, sourced from the environment at startup.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub max_login_attempts: i32,
    pub lockout_duration_minutes: i64,
    pub bcrypt_cost: u32,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            lockout_duration_minutes: 15,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl SecurityPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_login_attempts: std::env::var("MAX_LOGIN_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_login_attempts),
            lockout_duration_minutes: std::env::var("LOCKOUT_DURATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lockout_duration_minutes),
            bcrypt_cost: std::env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bcrypt_cost),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Where the request came from. Carried separately from the request body so
/// clients cannot spoof the values recorded on sessions and audit events.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub session_id: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SetupRequest {
    #[validate(length(min = 3, max = 30))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

pub struct AuthService {
    pub db: Database,
    pub cache: Cache,
    pub jwt: JwtService,
    policy: SecurityPolicy,
    hasher: PasswordHasher,
    user_repo: UserRepository,
    session_repo: SessionRepository,
    lockout: AccountLockoutService,
    audit: AuditService,
}

// Missing rows on the refresh path read as an invalid session, not as an
// infrastructure error
fn invalid_if_missing(err: DatabaseError) -> AuthError {
    match err {
        DatabaseError::NotFound(_) => AuthError::SessionInvalid,
        other => other.into(),
    }
}

impl AuthService {
    pub fn new(db: Database, cache: Cache, jwt: JwtService, policy: SecurityPolicy) -> Self {
        let pool = db.pool().clone();

        Self {
            lockout: AccountLockoutService::new(db.clone()),
            audit: AuditService::new(pool.clone()),
            hasher: PasswordHasher::new(policy.bcrypt_cost),
            user_repo: UserRepository::new(pool.clone()),
            session_repo: SessionRepository::new(pool),
            db,
            cache,
            jwt,
            policy,
        }
    }

    /// Login with username and password
    pub async fn login(&self, request: LoginRequest, ctx: &RequestContext) -> Result<AuthResponse> {
        let username = request.username.trim().to_lowercase();

        if username.is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = match self.user_repo.find_by_username(&username).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => {
                // Same response as a wrong password, so usernames cannot be
                // enumerated
                self.audit
                    .login_failed(
                        None,
                        &username,
                        "unknown username",
                        ctx.ip_address.clone(),
                        ctx.user_agent.clone(),
                    )
                    .await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        // An active lock wins over everything, including a correct password
        if user.is_locked(Utc::now()) {
            let locked_until = user.locked_until.unwrap_or_else(Utc::now);
            self.audit
                .login_failed(
                    Some(user.id),
                    &username,
                    "account locked",
                    ctx.ip_address.clone(),
                    ctx.user_agent.clone(),
                )
                .await;
            return Err(AuthError::AccountLocked { locked_until });
        }

        if !user.is_active {
            self.audit
                .login_failed(
                    Some(user.id),
                    &username,
                    "account inactive",
                    ctx.ip_address.clone(),
                    ctx.user_agent.clone(),
                )
                .await;
            return Err(AuthError::UserInactive);
        }

        let password_ok = PasswordHasher::verify(&request.password, &user.password_hash)?;

        if !password_ok {
            self.audit
                .login_failed(
                    Some(user.id),
                    &username,
                    "wrong password",
                    ctx.ip_address.clone(),
                    ctx.user_agent.clone(),
                )
                .await;

            return match self
                .lockout
                .handle_failed_login(
                    &user,
                    self.policy.max_login_attempts,
                    self.policy.lockout_duration_minutes,
                )
                .await
            {
                Ok(()) => Err(AuthError::InvalidCredentials),
                Err(AuthError::AccountLocked { locked_until }) => {
                    self.audit.account_locked(user.id, locked_until).await;
                    Err(AuthError::AccountLocked { locked_until })
                }
                Err(e) => Err(e),
            };
        }

        self.lockout.reset(user.id).await?;

        // Hashes made at a lower cost are upgraded while we still hold the
        // cleartext. Failure here never blocks the login.
        if self.hasher.needs_rehash(&user.password_hash) {
            match self.hasher.hash(&request.password) {
                Ok(new_hash) => {
                    if let Err(e) = self.user_repo.update_password(user.id, &new_hash).await {
                        tracing::warn!("Password rehash store failed for {}: {}", user.id, e);
                    }
                }
                Err(e) => tracing::warn!("Password rehash failed for {}: {}", user.id, e),
            }
        }

        self.user_repo.update_last_login(user.id).await?;

        let response = self.issue_session(&user, ctx).await?;

        self.audit
            .login_succeeded(
                user.id,
                &user.username,
                ctx.ip_address.clone(),
                ctx.user_agent.clone(),
            )
            .await;

        Ok(response)
    }

    /// Redeem a refresh token for a fresh session and token pair. The old
    /// session is invalidated, so a replayed refresh token dies here.
    pub async fn refresh_session(
        &self,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<AuthResponse> {
        let claims = self.jwt.verify_refresh_token(refresh_token)?;

        let token_hash = hash_token(refresh_token);
        let session = self
            .session_repo
            .find_by_refresh_hash(&token_hash)
            .await
            .map_err(invalid_if_missing)?;

        if session.id != claims.session_id || !session.is_valid(Utc::now()) {
            return Err(AuthError::SessionInvalid);
        }

        let user = self.session_user(&session, &claims.sub).await?;

        self.session_repo.invalidate(&session.id).await?;

        let response = self.issue_session(&user, ctx).await?;

        self.audit
            .token_refreshed(user.id, ctx.ip_address.clone(), ctx.user_agent.clone())
            .await;

        Ok(response)
    }

    /// Silent refresh for the request gate: keeps the session row, mints
    /// only a new access token. Returns the user for the gate's context.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<(User, Session, String)> {
        let claims = self.jwt.verify_refresh_token(refresh_token)?;

        let session = self
            .session_repo
            .find_by_id(&claims.session_id)
            .await
            .map_err(invalid_if_missing)?;

        // The presented token must still be the one bound to the session
        if session.refresh_token_hash != hash_token(refresh_token)
            || !session.is_valid(Utc::now())
        {
            return Err(AuthError::SessionInvalid);
        }

        let user = self.session_user(&session, &claims.sub).await?;

        let access_token = self.jwt.generate_access_token(&user, &session.id)?;

        Ok((user, session, access_token))
    }

    /// Invalidate a session. Unknown and already-dead session ids succeed.
    pub async fn logout(&self, session_id: &str, ctx: &RequestContext) -> Result<()> {
        let session = match self.session_repo.find_by_id(session_id).await {
            Ok(session) => session,
            Err(DatabaseError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let was_live = session.invalidated_at.is_none();

        self.session_repo.invalidate(session_id).await?;

        if was_live {
            self.audit
                .logout(
                    session.user_id,
                    ctx.ip_address.clone(),
                    ctx.user_agent.clone(),
                )
                .await;
        }

        Ok(())
    }

    /// Verify an access token and confirm its session is still live. Used by
    /// the session-validate endpoint; the request gate trusts the signed
    /// token alone.
    pub async fn validate_access(&self, access_token: &str) -> Result<(AccessClaims, UserProfile)> {
        let claims = self.jwt.verify_access_token(access_token)?;

        let session = self
            .session_repo
            .find_by_id(&claims.session_id)
            .await
            .map_err(invalid_if_missing)?;

        if !session.is_valid(Utc::now()) {
            return Err(AuthError::SessionInvalid);
        }

        let user = self.session_user(&session, &claims.sub).await?;

        Ok((claims, user.into()))
    }

    /// Change the caller's own password. All of the user's sessions are
    /// revoked on success; the client must log in again.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePassword,
        ctx: &RequestContext,
    ) -> Result<u64> {
        request.validate()?;

        let user = self.user_repo.find_by_id(user_id).await?;

        let current_ok = PasswordHasher::verify(&request.current_password, &user.password_hash)?;
        if !current_ok {
            return Err(AuthError::CurrentPasswordIncorrect);
        }

        if request.new_password == request.current_password {
            return Err(AuthError::WeakPassword(
                "New password must differ from the current password".to_string(),
            ));
        }

        let check = validate_password_strength(&request.new_password);
        if !check.is_valid {
            return Err(AuthError::WeakPassword(check.errors.join(". ")));
        }

        let new_hash = self.hasher.hash(&request.new_password)?;
        self.user_repo.update_password(user.id, &new_hash).await?;

        let revoked = self.session_repo.invalidate_all_for_user(user.id).await?;

        self.audit
            .record(
                NewSecurityEvent::new(events::PASSWORD_CHANGED)
                    .user(user.id)
                    .ip(ctx.ip_address.clone())
                    .user_agent(ctx.user_agent.clone()),
            )
            .await;

        Ok(revoked)
    }

    /// Create a user. The caller has already passed the permission check;
    /// `actor` is recorded on the audit event.
    pub async fn create_user(
        &self,
        request: NewUser,
        actor: Option<Uuid>,
        ctx: &RequestContext,
    ) -> Result<UserProfile> {
        request.validate()?;

        let username = self.check_new_credentials(
            &request.username,
            &request.email,
            &request.password,
        )?;

        let password_hash = self.hasher.hash(&request.password)?;

        let user = match self
            .user_repo
            .create(&username, request.email.trim(), &password_hash, request.role)
            .await
        {
            Ok(user) => user,
            Err(DatabaseError::DuplicateEntry(msg)) => return Err(AuthError::AlreadyExists(msg)),
            Err(e) => return Err(e.into()),
        };

        let mut event = NewSecurityEvent::new(events::USER_CREATED)
            .ip(ctx.ip_address.clone())
            .description(format!("User {} created with role {}", user.username, user.role))
            .metadata(serde_json::json!({ "target": user.id }));
        if let Some(actor_id) = actor {
            event = event.user(actor_id);
        }
        self.audit.record(event).await;

        Ok(user.into())
    }

    /// Update email, role or active flag. Actors cannot change their own
    /// role or deactivate themselves.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        update: UpdateUser,
        actor: Uuid,
        ctx: &RequestContext,
    ) -> Result<UserProfile> {
        update.validate()?;

        if user_id == actor && (update.role.is_some() || update.is_active.is_some()) {
            return Err(AuthError::Forbidden(
                "You cannot change your own role or active status".to_string(),
            ));
        }

        if let Some(ref email) = update.email {
            let email_check = validate_email(email, false);
            if !email_check.is_valid {
                return Err(AuthError::ValidationError(
                    email_check.error.unwrap_or_default(),
                ));
            }
        }

        let user = match self.user_repo.update(user_id, &update).await {
            Ok(user) => user,
            Err(DatabaseError::DuplicateEntry(msg)) => return Err(AuthError::AlreadyExists(msg)),
            Err(e) => return Err(e.into()),
        };

        // Deactivation kills the user's live sessions immediately
        if update.is_active == Some(false) {
            let revoked = self.session_repo.invalidate_all_for_user(user_id).await?;
            if revoked > 0 {
                tracing::info!("Revoked {} sessions for deactivated user {}", revoked, user_id);
            }
        }

        self.invalidate_user_cache(user_id).await;

        self.audit
            .record(
                NewSecurityEvent::new(events::USER_UPDATED)
                    .user(actor)
                    .ip(ctx.ip_address.clone())
                    .metadata(serde_json::json!({ "target": user_id })),
            )
            .await;

        Ok(user.into())
    }

    /// Remove a user from service. Accounts are never hard-deleted; this
    /// deactivates the account and revokes its sessions.
    pub async fn delete_user(&self, user_id: Uuid, actor: Uuid, ctx: &RequestContext) -> Result<()> {
        if user_id == actor {
            return Err(AuthError::Forbidden(
                "You cannot delete your own account".to_string(),
            ));
        }

        self.user_repo.deactivate(user_id).await?;
        self.session_repo.invalidate_all_for_user(user_id).await?;
        self.invalidate_user_cache(user_id).await;

        self.audit
            .record(
                NewSecurityEvent::new(events::USER_DELETED)
                    .user(actor)
                    .ip(ctx.ip_address.clone())
                    .metadata(serde_json::json!({ "target": user_id })),
            )
            .await;

        Ok(())
    }

    /// Set a user's password on their behalf. With no password given a
    /// temporary one is generated; either way the effective password is
    /// returned for the admin to hand over, and the user's sessions are
    /// revoked.
    pub async fn reset_password(
        &self,
        user_id: Uuid,
        new_password: Option<&str>,
        actor: Uuid,
        ctx: &RequestContext,
    ) -> Result<String> {
        let user = self.user_repo.find_by_id(user_id).await?;

        let password = match new_password {
            Some(p) => p.to_string(),
            None => generate_secure_password(GENERATED_PASSWORD_LEN),
        };

        let check = validate_password_strength(&password);
        if !check.is_valid {
            return Err(AuthError::WeakPassword(check.errors.join(". ")));
        }

        let hash = self.hasher.hash(&password)?;
        self.user_repo.update_password(user.id, &hash).await?;
        self.session_repo.invalidate_all_for_user(user.id).await?;

        self.audit
            .record(
                NewSecurityEvent::new(events::PASSWORD_RESET)
                    .user(actor)
                    .ip(ctx.ip_address.clone())
                    .metadata(serde_json::json!({ "target": user.id })),
            )
            .await;

        Ok(password)
    }

    /// Clear a lockout before it expires (admin action)
    pub async fn unlock_account(&self, user_id: Uuid, actor: Uuid) -> Result<()> {
        let user = self.user_repo.find_by_id(user_id).await?;

        self.lockout.unlock(user.id).await?;

        self.audit
            .record(
                NewSecurityEvent::new(events::ACCOUNT_UNLOCKED)
                    .user(user.id)
                    .metadata(serde_json::json!({ "unlocked_by": actor })),
            )
            .await;

        Ok(())
    }

    /// Fetch a user's profile, cached briefly to keep the users page off
    /// the database. Cache trouble falls back to a direct read.
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserProfile> {
        let cache_key = gymdesk_cache::user_cache_key(&user_id.to_string());

        match self.cache.get::<UserProfile>(&cache_key).await {
            Ok(Some(profile)) => return Ok(profile),
            Ok(None) => {}
            Err(e) => tracing::warn!("User cache read failed: {}", e),
        }

        let user = self.user_repo.find_by_id(user_id).await?;
        let profile: UserProfile = user.into();

        if let Err(e) = self
            .cache
            .set(&cache_key, &profile, Some(USER_CACHE_TTL_SECS))
            .await
        {
            tracing::warn!("User cache write failed: {}", e);
        }

        Ok(profile)
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<UserProfile>, i64)> {
        let users = self.user_repo.list(limit, offset).await?;
        let total = self.user_repo.count().await?;
        Ok((users, total))
    }

    pub async fn security_events(&self, query: SecurityEventQuery) -> Result<Vec<SecurityEvent>> {
        self.audit.query(query).await
    }

    /// Record a denied access for the request gate
    pub async fn record_unauthorized(
        &self,
        user_id: Uuid,
        username: &str,
        path: &str,
        ctx: &RequestContext,
    ) {
        self.audit
            .unauthorized_access(
                user_id,
                username,
                path,
                ctx.ip_address.clone(),
                ctx.user_agent.clone(),
            )
            .await;
    }

    /// True while no admin account exists
    pub async fn is_first_time_setup(&self) -> Result<bool> {
        let admins = self.user_repo.count_by_role(UserRole::Admin).await?;
        Ok(admins == 0)
    }

    /// One-time creation of the first admin account, open only while no
    /// admin exists. The new admin is logged in immediately.
    pub async fn bootstrap_admin(
        &self,
        request: SetupRequest,
        ctx: &RequestContext,
    ) -> Result<AuthResponse> {
        if !self.is_first_time_setup().await? {
            return Err(AuthError::Forbidden(
                "Setup has already been completed".to_string(),
            ));
        }

        request.validate()?;

        let username = self.check_new_credentials(
            &request.username,
            &request.email,
            &request.password,
        )?;

        let password_hash = self.hasher.hash(&request.password)?;

        let user = match self
            .user_repo
            .create(&username, request.email.trim(), &password_hash, UserRole::Admin)
            .await
        {
            Ok(user) => user,
            Err(DatabaseError::DuplicateEntry(msg)) => return Err(AuthError::AlreadyExists(msg)),
            Err(e) => return Err(e.into()),
        };

        self.audit
            .record(
                NewSecurityEvent::new(events::SETUP_COMPLETED)
                    .user(user.id)
                    .ip(ctx.ip_address.clone())
                    .user_agent(ctx.user_agent.clone())
                    .description(format!("Initial admin account {} created", user.username)),
            )
            .await;

        self.user_repo.update_last_login(user.id).await?;

        self.issue_session(&user, ctx).await
    }

    // Private helpers

    /// Deep checks shared by user creation flows. Returns the normalized
    /// username.
    fn check_new_credentials(&self, username: &str, email: &str, password: &str) -> Result<String> {
        let username_check = validate_username(username);
        if !username_check.is_valid {
            return Err(AuthError::ValidationError(
                username_check.error.unwrap_or_default(),
            ));
        }

        let email_check = validate_email(email, false);
        if !email_check.is_valid {
            return Err(AuthError::ValidationError(
                email_check.error.unwrap_or_default(),
            ));
        }

        let password_check = validate_password_strength(password);
        if !password_check.is_valid {
            return Err(AuthError::WeakPassword(password_check.errors.join(". ")));
        }

        Ok(username_check.username)
    }

    /// Resolve the user behind a session, cross-checking the token subject
    async fn session_user(&self, session: &Session, sub: &str) -> Result<User> {
        let user_id = Uuid::parse_str(sub)
            .map_err(|_| AuthError::InvalidToken("Invalid user id in token".to_string()))?;

        if session.user_id != user_id {
            return Err(AuthError::SessionInvalid);
        }

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(invalid_if_missing)?;

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        Ok(user)
    }

    async fn issue_session(&self, user: &User, ctx: &RequestContext) -> Result<AuthResponse> {
        let session_id = generate_session_id();

        let access_token = self.jwt.generate_access_token(user, &session_id)?;
        let refresh_token = self.jwt.generate_refresh_token(user, &session_id)?;

        self.create_session(user, &session_id, &refresh_token, ctx)
            .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_ttl_seconds(),
            session_id,
            user: user.clone().into(),
        })
    }

    async fn create_session(
        &self,
        user: &User,
        session_id: &str,
        refresh_token: &str,
        ctx: &RequestContext,
    ) -> Result<Session> {
        let refresh_token_hash = hash_token(refresh_token);

        let exp_timestamp = self.jwt.get_expiration(refresh_token)?;
        let expires_at = chrono::DateTime::from_timestamp(exp_timestamp, 0)
            .ok_or_else(|| AuthError::Internal("Invalid expiration timestamp".to_string()))?;

        let new_session = NewSession {
            id: session_id.to_string(),
            user_id: user.id,
            refresh_token_hash,
            ip_address: ctx.ip_address.as_deref().map(sanitize_input),
            user_agent: ctx.user_agent.as_deref().map(sanitize_input),
            expires_at,
        };

        let session = self.session_repo.create(&new_session).await?;

        Ok(session)
    }

    async fn invalidate_user_cache(&self, user_id: Uuid) {
        let cache_key = gymdesk_cache::user_cache_key(&user_id.to_string());
        if let Err(e) = self.cache.delete(&cache_key).await {
            tracing::warn!("User cache invalidation failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymdesk_cache::CacheConfig;
    use gymdesk_database::DatabaseConfig;

    fn policy() -> SecurityPolicy {
        SecurityPolicy {
            max_login_attempts: 3,
            lockout_duration_minutes: 15,
            bcrypt_cost: 10,
        }
    }

    async fn test_service() -> AuthService {
        let db = Database::new(DatabaseConfig::from_env())
            .await
            .expect("Failed to connect to database");
        let cache = Cache::new(CacheConfig::from_env())
            .await
            .expect("Failed to connect to Redis");
        let jwt = JwtService::new(
            "test-access-secret-0123456789abcdef",
            "test-refresh-secret-0123456789abcdef",
        )
        .unwrap();

        AuthService::new(db, cache, jwt, policy())
    }

    fn unique_username(prefix: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("{}{}", prefix, &id[..8])
    }

    async fn seed_user(svc: &AuthService, username: &str, password: &str) -> UserProfile {
        svc.create_user(
            NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: password.to_string(),
                role: UserRole::Member,
            },
            None,
            &RequestContext::default(),
        )
        .await
        .expect("Failed to seed user")
    }

    const PASSWORD: &str = "Val1d&Secret";

    #[test]
    fn policy_defaults() {
        let policy = SecurityPolicy::default();
        assert_eq!(policy.max_login_attempts, 5);
        assert_eq!(policy.lockout_duration_minutes, 15);
        assert_eq!(policy.bcrypt_cost, 12);
    }

    #[tokio::test]
    #[ignore] // Only run with Postgres and Redis available
    async fn failed_attempts_reset_after_successful_login() {
        let svc = test_service().await;
        let username = unique_username("gym1");
        seed_user(&svc, &username, PASSWORD).await;
        let ctx = RequestContext::default();

        for _ in 0..2 {
            let result = svc
                .login(
                    LoginRequest {
                        username: username.clone(),
                        password: "Wr0ng&Secret".to_string(),
                    },
                    &ctx,
                )
                .await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }

        let repo = UserRepository::new(svc.db.pool().clone());
        let user = repo.find_by_username(&username).await.unwrap();
        assert_eq!(user.failed_login_attempts, 2);

        svc.login(
            LoginRequest {
                username: username.clone(),
                password: PASSWORD.to_string(),
            },
            &ctx,
        )
        .await
        .expect("Login should succeed");

        let user = repo.find_by_username(&username).await.unwrap();
        assert_eq!(user.failed_login_attempts, 0);
    }

    #[tokio::test]
    #[ignore] // Only run with Postgres and Redis available
    async fn lockout_blocks_correct_password() {
        let svc = test_service().await;
        let username = unique_username("gym2");
        seed_user(&svc, &username, PASSWORD).await;
        let ctx = RequestContext::default();

        for attempt in 0..3 {
            let result = svc
                .login(
                    LoginRequest {
                        username: username.clone(),
                        password: "Wr0ng&Secret".to_string(),
                    },
                    &ctx,
                )
                .await;

            if attempt < 2 {
                assert!(matches!(result, Err(AuthError::InvalidCredentials)));
            } else {
                assert!(matches!(result, Err(AuthError::AccountLocked { .. })));
            }
        }

        // Correct password is irrelevant while the lock holds
        let result = svc
            .login(
                LoginRequest {
                    username: username.clone(),
                    password: PASSWORD.to_string(),
                },
                &ctx,
            )
            .await;
        assert!(matches!(result, Err(AuthError::AccountLocked { .. })));
    }

    #[tokio::test]
    #[ignore] // Only run with Postgres and Redis available
    async fn logout_is_idempotent() {
        let svc = test_service().await;
        let username = unique_username("gym3");
        seed_user(&svc, &username, PASSWORD).await;
        let ctx = RequestContext::default();

        let response = svc
            .login(
                LoginRequest {
                    username: username.clone(),
                    password: PASSWORD.to_string(),
                },
                &ctx,
            )
            .await
            .unwrap();

        svc.logout(&response.session_id, &ctx).await.unwrap();
        svc.logout(&response.session_id, &ctx).await.unwrap();
        svc.logout("unknown-session-id", &ctx).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Only run with Postgres and Redis available
    async fn refresh_rotates_the_session() {
        let svc = test_service().await;
        let username = unique_username("gym4");
        seed_user(&svc, &username, PASSWORD).await;
        let ctx = RequestContext::default();

        let first = svc
            .login(
                LoginRequest {
                    username: username.clone(),
                    password: PASSWORD.to_string(),
                },
                &ctx,
            )
            .await
            .unwrap();

        let second = svc.refresh_session(&first.refresh_token, &ctx).await.unwrap();
        assert_ne!(first.session_id, second.session_id);

        // The rotated-out token is dead
        let replay = svc.refresh_session(&first.refresh_token, &ctx).await;
        assert!(matches!(replay, Err(AuthError::SessionInvalid)));
    }
}
