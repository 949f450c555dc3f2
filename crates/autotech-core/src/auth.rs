//! Frontera de autenticación y compuerta de administración.
//!
//! El alta, el login y la gestión de contraseñas los resuelve un colaborador
//! externo (`AuthProvider`). El core sólo consume el usuario actual y la
//! respuesta a "¿es admin?", que sale de las filas de `user_roles`.

use autotech_domain::password::{validate_email, validate_password_length, validate_sign_up_password};
use autotech_domain::records::UserRoleRow;
use autotech_domain::DomainError;
use dashmap::DashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use uuid::Uuid;

use crate::remote::{to_row, Query, RemoteDataClient, Table};
use crate::CoreError;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

pub trait AuthProvider: Send + Sync {
    fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<CurrentUser, CoreError>;
    fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, CoreError>;
    fn sign_out(&self) -> Result<(), CoreError>;
    fn request_password_reset(&self, email: &str) -> Result<(), CoreError>;
    /// Cambia la contraseña del usuario con sesión iniciada.
    fn update_password(&self, new_password: &str) -> Result<(), CoreError>;
    fn current_user(&self) -> Option<CurrentUser>;
}

struct Account {
    user: CurrentUser,
    password_hash: String,
}

/// Proveedor en memoria para tests y la demo.
#[derive(Default)]
pub struct InMemoryAuthProvider {
    accounts: DashMap<String, Account>,
    session: RwLock<Option<CurrentUser>>,
    reset_requests: DashMap<String, usize>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cuántas veces se pidió restablecer la contraseña de `email`.
    pub fn reset_requests(&self, email: &str) -> usize {
        self.reset_requests.get(&normalize_email(email)).map(|v| *v).unwrap_or(0)
    }

    fn set_session(&self, user: Option<CurrentUser>) -> Result<(), CoreError> {
        let mut guard = self.session
                            .write()
                            .map_err(|_| CoreError::Storage("session lock poisoned".into()))?;
        *guard = user;
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(user_id: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl AuthProvider for InMemoryAuthProvider {
    fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<CurrentUser, CoreError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_sign_up_password(password)?;
        if self.accounts.contains_key(&email) {
            return Err(CoreError::Conflict(format!("account '{email}' already exists")));
        }
        let id = Uuid::new_v4().to_string();
        let display_name = Some(display_name.trim().to_string()).filter(|n| !n.is_empty());
        let user = CurrentUser { id: id.clone(), email: email.clone(), display_name };
        let account = Account { password_hash: hash_password(&id, password), user: user.clone() };
        self.accounts.insert(email, account);
        self.set_session(Some(user.clone()))?;
        info!("signed up user id={}", user.id);
        Ok(user)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, CoreError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        let user = match self.accounts.get(&email) {
            Some(acc) if acc.password_hash == hash_password(&acc.user.id, password) => acc.user.clone(),
            _ => return Err(CoreError::Unauthorized("invalid email or password".into())),
        };
        self.set_session(Some(user.clone()))?;
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), CoreError> {
        self.set_session(None)
    }

    // No revela si la cuenta existe.
    fn request_password_reset(&self, email: &str) -> Result<(), CoreError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if self.accounts.contains_key(&email) {
            *self.reset_requests.entry(email).or_insert(0) += 1;
        }
        Ok(())
    }

    fn update_password(&self, new_password: &str) -> Result<(), CoreError> {
        validate_password_length(new_password)?;
        let user = self.current_user()
                       .ok_or_else(|| CoreError::Unauthorized("sign in required".into()))?;
        let mut account = self.accounts
                              .get_mut(&user.email)
                              .ok_or_else(|| CoreError::not_found(format!("account '{}'", user.email)))?;
        account.password_hash = hash_password(&user.id, new_password);
        Ok(())
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.session.read().ok().and_then(|s| s.clone())
    }
}

/// Interruptor explícito del chequeo de rol admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    #[default]
    Enforced,
    Disabled,
}

impl FromStr for GateMode {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enforced" | "on" => Ok(GateMode::Enforced),
            "disabled" | "off" => Ok(GateMode::Disabled),
            other => Err(CoreError::Validation(DomainError::UnknownValue { field: "admin_gate",
                                                                           value: other.to_string() })),
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateMode::Enforced => f.write_str("enforced"),
            GateMode::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdminGate {
    mode: GateMode,
}

impl AdminGate {
    pub fn new(mode: GateMode) -> Self {
        AdminGate { mode }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Con la compuerta desactivada deja pasar a cualquiera (y lo deja en el log).
    pub fn authorize<C>(&self, client: &C, user: Option<&CurrentUser>) -> Result<(), CoreError>
        where C: RemoteDataClient + ?Sized
    {
        if self.mode == GateMode::Disabled {
            warn!("admin gate disabled: allowing {}", user.map(|u| u.id.as_str()).unwrap_or("anonymous"));
            return Ok(());
        }
        let user = user.ok_or_else(|| CoreError::Unauthorized("sign in required".into()))?;
        if !is_admin(client, &user.id)? {
            return Err(CoreError::Unauthorized(format!("user {} is not an admin", user.id)));
        }
        Ok(())
    }
}

pub fn is_admin<C>(client: &C, user_id: &str) -> Result<bool, CoreError>
    where C: RemoteDataClient + ?Sized
{
    let rows = client.select(Table::UserRoles,
                             &Query::all().eq("user_id", user_id).eq("role", ADMIN_ROLE).limit(1))?;
    Ok(!rows.is_empty())
}

/// Asigna el rol admin (idempotente).
pub fn grant_admin<C>(client: &C, user_id: &str) -> Result<(), CoreError>
    where C: RemoteDataClient + ?Sized
{
    if is_admin(client, user_id)? {
        return Ok(());
    }
    let row = UserRoleRow { user_id: user_id.to_string(), role: ADMIN_ROLE.to_string() };
    client.insert(Table::UserRoles, vec![to_row(&row)?])?;
    info!("granted admin role to {user_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryDataClient;

    #[test]
    fn sign_up_checks_strength_and_duplicates() {
        let auth = InMemoryAuthProvider::new();
        assert!(auth.sign_up("a@b.com", "weak", "A").is_err());
        let user = auth.sign_up("A@B.com", "Str0ng!pass", "  Ana ").unwrap();
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.display_name.as_deref(), Some("Ana"));
        assert!(matches!(auth.sign_up("a@b.com", "Str0ng!pass", ""), Err(CoreError::Conflict(_))));
    }

    #[test]
    fn sign_in_out_and_password_update() {
        let auth = InMemoryAuthProvider::new();
        auth.sign_up("tech@shop.io", "Str0ng!pass", "Tech").unwrap();
        auth.sign_out().unwrap();
        assert!(auth.current_user().is_none());
        assert!(matches!(auth.sign_in("tech@shop.io", "wrong-pass"), Err(CoreError::Unauthorized(_))));
        auth.sign_in("tech@shop.io", "Str0ng!pass").unwrap();
        auth.update_password("another-long-one").unwrap();
        auth.sign_out().unwrap();
        assert!(auth.sign_in("tech@shop.io", "another-long-one").is_ok());
    }

    #[test]
    fn reset_requests_are_counted_silently() {
        let auth = InMemoryAuthProvider::new();
        auth.sign_up("tech@shop.io", "Str0ng!pass", "Tech").unwrap();
        auth.request_password_reset("tech@shop.io").unwrap();
        auth.request_password_reset("ghost@shop.io").unwrap();
        assert_eq!(auth.reset_requests("tech@shop.io"), 1);
        assert_eq!(auth.reset_requests("ghost@shop.io"), 0);
    }

    #[test]
    fn gate_requires_admin_role_unless_disabled() {
        let client = InMemoryDataClient::new();
        let user = CurrentUser { id: "u1".into(), email: "u1@x.io".into(), display_name: None };
        let gate = AdminGate::new(GateMode::Enforced);
        assert!(matches!(gate.authorize(&client, None), Err(CoreError::Unauthorized(_))));
        assert!(matches!(gate.authorize(&client, Some(&user)), Err(CoreError::Unauthorized(_))));
        grant_admin(&client, "u1").unwrap();
        grant_admin(&client, "u1").unwrap();
        assert!(gate.authorize(&client, Some(&user)).is_ok());
        assert!(AdminGate::new(GateMode::Disabled).authorize(&client, None).is_ok());
    }

    #[test]
    fn gate_mode_parsing() {
        assert_eq!("disabled".parse::<GateMode>().unwrap(), GateMode::Disabled);
        assert_eq!("ENFORCED".parse::<GateMode>().unwrap(), GateMode::Enforced);
        assert!(matches!("maybe".parse::<GateMode>(),
                         Err(CoreError::Validation(DomainError::UnknownValue { field: "admin_gate", .. }))));
    }
}
