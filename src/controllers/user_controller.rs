use serde_json::json;
use tracing::info;

use crate::models::{SessionContext, User};
use crate::repositories::UserRepository;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppResult};

pub struct UserController {
    repository: UserRepository,
}

impl UserController {
    pub fn new(state: &AppState) -> Self {
        Self {
            repository: state.users(),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        let mut users = self.repository.list(None).await?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    /// Ativar ou desativar um utilizador
    pub async fn set_active(&self, session: &SessionContext, id: &str, ativo: bool) -> AppResult<User> {
        if !ativo && session.user_id == id {
            return Err(bad_request_error("Não pode desativar a própria conta"));
        }
        let user = self.repository.get(id).await?;
        if user.ativo == ativo {
            return Ok(user);
        }
        let updated = self.repository.update(&user.id, json!({ "ativo": ativo })).await?;
        info!("👤 Utilizador {} {}", updated.email, if ativo { "ativado" } else { "desativado" });
        Ok(updated)
    }
}
