use crate::model::SessionUser;

pub const SESSION_COOKIE: &str = "session_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Participant,
    Admin,
}

/// What the browser knows about who is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// The session has not been resolved yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(SessionUser, Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SessionResolved(Option<SessionUser>),
    SignedIn(SessionUser),
    TeamRenamed(String),
    SignedOut,
    ResolveFailed,
}

impl AuthState {
    fn authenticated(user: SessionUser) -> Self {
        let role = if user.is_admin {
            Role::Admin
        } else {
            Role::Participant
        };
        AuthState::Authenticated(user, role)
    }

    pub fn apply(self, event: AuthEvent) -> AuthState {
        match (self, event) {
            (_, AuthEvent::SessionResolved(Some(user))) | (_, AuthEvent::SignedIn(user)) => {
                AuthState::authenticated(user)
            }
            (_, AuthEvent::SessionResolved(None))
            | (_, AuthEvent::SignedOut)
            | (_, AuthEvent::ResolveFailed) => AuthState::Anonymous,
            (AuthState::Authenticated(mut user, role), AuthEvent::TeamRenamed(team_name)) => {
                user.team_name = team_name;
                AuthState::Authenticated(user, role)
            }
            // A rename can only come from a signed-in user.
            (state, AuthEvent::TeamRenamed(_)) => state,
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            AuthState::Authenticated(user, _) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(..))
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AuthState::Authenticated(_, Role::Admin))
    }
}

/// Finds a cookie's value in a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// Builds the `Set-Cookie` value for a session. `secure` adds the `Secure` attribute, which
/// keeps the cookie off plain-HTTP connections.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Strict{}",
        SESSION_COOKIE,
        token,
        max_age_secs,
        secure_attribute(secure)
    )
}

pub fn expired_session_cookie(secure: bool) -> String {
    format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Strict{}",
        SESSION_COOKIE,
        secure_attribute(secure)
    )
}

fn secure_attribute(secure: bool) -> &'static str {
    if secure {
        "; Secure"
    } else {
        ""
    }
}

/// Hashes a password into an Argon2id PHC string.
#[cfg(feature = "ssr")]
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use argon2::Argon2;
    use rand::Rng;

    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks a password against a stored hash. A malformed hash never verifies.
#[cfg(feature = "ssr")]
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};
    use argon2::Argon2;

    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
