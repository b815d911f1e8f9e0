use async_trait::async_trait;
use aura_types::UserId;

/// What a verified token resolves to.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub display_name: String,
}

/// Identity/session verification is an external collaborator; this is the
/// seam it plugs into. `Ok(None)` means the token did not verify.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> anyhow::Result<Option<AuthContext>>;
}

/// Development verifier: accepts `"<user_id>:<display_name>"` bearer
/// tokens. Stands in for the real provider in tests and local runs.
pub struct DevTokenVerifier;

#[async_trait]
impl TokenVerifier for DevTokenVerifier {
    async fn verify(&self, token: &str) -> anyhow::Result<Option<AuthContext>> {
        match token.split_once(':') {
            Some((user_id, name)) if !user_id.is_empty() && !name.is_empty() => {
                Ok(Some(AuthContext {
                    user_id: UserId::new(user_id),
                    display_name: name.to_owned(),
                }))
            }
            _ => Ok(None),
        }
    }
}
