//! Staff authentication: Argon2 password hashes and HS256 JWT access/refresh tokens.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::db::repository::FullRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Staff, StaffId, StaffRole, Tenant, TenantId};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Staff id.
    pub sub: String,
    pub tenant_id: TenantId,
    pub role: StaffRole,
    pub email: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn staff_id(&self) -> AppResult<StaffId> {
        self.sub
            .parse()
            .map_err(|_| AppError::authentication("Token subject is not a staff id"))
    }

    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub staff: Staff,
}

/// Issues and verifies tokens with the configured secrets.
#[derive(Clone)]
pub struct TokenService {
    settings: JwtSettings,
}

impl TokenService {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    pub fn issue(&self, staff: &Staff, token_type: TokenType) -> AppResult<String> {
        let (secret, ttl) = match token_type {
            TokenType::Access => (&self.settings.access_secret, self.settings.access_ttl_secs),
            TokenType::Refresh => (&self.settings.refresh_secret, self.settings.refresh_ttl_secs),
        };
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: staff.id.to_string(),
            tenant_id: staff.tenant_id,
            role: staff.role,
            email: staff.email.clone(),
            token_type,
            iat: now,
            exp: now + ttl as i64,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::server(format!("Failed to sign token: {}", e)))
    }

    pub fn issue_pair(&self, staff: &Staff) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(staff, TokenType::Access)?,
            refresh_token: self.issue(staff, TokenType::Refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.settings.access_ttl_secs,
        })
    }

    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenType::Refresh)
    }

    fn verify(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let secret = match expected {
            TokenType::Access => &self.settings.access_secret,
            TokenType::Refresh => &self.settings.refresh_secret,
        };
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::authentication("Token has expired")
            }
            _ => AppError::authentication("Invalid token"),
        })?;

        if claims.token_type != expected {
            return Err(AppError::authentication("Wrong token type"));
        }
        Ok(claims)
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::server(format!("Password hashing failed: {}", e)))
}

/// `Ok(false)` on mismatch; an error only for a malformed stored hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::server(format!("Stored password hash is invalid: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::server(format!("Password verification failed: {}", e))),
    }
}

/// Check credentials of a staff member of `tenant` and issue a token pair.
///
/// Unknown emails, inactive accounts, accounts without a password and wrong
/// passwords all produce the same 401 message.
pub async fn login<R: FullRepository + ?Sized>(
    repo: &R,
    tokens: &TokenService,
    tenant: &Tenant,
    request: LoginRequest,
) -> AppResult<LoginResponse> {
    let rejected = || AppError::authentication("Invalid email or password");

    let email = request.email.trim().to_lowercase();
    let staff = repo
        .find_staff_by_email(tenant.id, &email)
        .await?
        .ok_or_else(rejected)?;
    if !staff.is_active {
        return Err(rejected());
    }
    let hash = staff.password_hash.as_deref().ok_or_else(rejected)?;
    if !verify_password(&request.password, hash)? {
        log::warn!("Failed login for {} in tenant {}", email, tenant.slug);
        return Err(rejected());
    }

    let mut staff = staff;
    staff.last_login_at = Some(Utc::now());
    let staff = repo.update_staff(staff).await?;

    Ok(LoginResponse {
        tokens: tokens.issue_pair(&staff)?,
        staff,
    })
}

/// Exchange a refresh token for a new pair, re-reading the staff record so
/// deactivated accounts and role changes take effect.
pub async fn refresh<R: FullRepository + ?Sized>(
    repo: &R,
    tokens: &TokenService,
    tenant: &Tenant,
    request: RefreshRequest,
) -> AppResult<TokenPair> {
    let claims = tokens.verify_refresh(&request.refresh_token)?;
    if claims.tenant_id != tenant.id {
        return Err(AppError::authorization("Token was issued for another tenant"));
    }
    let staff = repo
        .get_staff(tenant.id, claims.staff_id()?)
        .await
        .map_err(|_| AppError::authentication("Staff account no longer exists"))?;
    if !staff.is_active {
        return Err(AppError::authentication("Staff account is inactive"));
    }
    tokens.issue_pair(&staff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(role: StaffRole) -> Staff {
        Staff {
            id: StaffId::generate(),
            tenant_id: TenantId::generate(),
            first_name: "Sam".into(),
            last_name: "Keeper".into(),
            email: "sam@example.com".into(),
            phone: None,
            role,
            department: None,
            position: None,
            password_hash: None,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip_carries_tenant_and_role() {
        let service = TokenService::new(JwtSettings::default());
        let s = staff(StaffRole::Admin);
        let pair = service.issue_pair(&s).unwrap();

        let claims = service.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.tenant_id, s.tenant_id);
        assert_eq!(claims.staff_id().unwrap(), s.id);
        assert!(claims.is_admin());
        assert_eq!(pair.token_type, "Bearer");
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let service = TokenService::new(JwtSettings::default());
        let pair = service.issue_pair(&staff(StaffRole::Staff)).unwrap();
        assert_eq!(service.verify_access(&pair.refresh_token).unwrap_err().status, 401);
        assert!(service.verify_refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let ours = TokenService::new(JwtSettings::default());
        let theirs = TokenService::new(JwtSettings {
            access_secret: "someone-else".into(),
            ..JwtSettings::default()
        });
        let token = theirs.issue(&staff(StaffRole::Staff), TokenType::Access).unwrap();
        assert!(ours.verify_access(&token).is_err());
        assert!(ours.verify_access("not.a.jwt").is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(hash_password("short").is_err());
        assert!(verify_password("x", "not-a-hash").is_err());
    }
}
