use super::EntityRepository;
use crate::clients::EntityQuery;
use crate::models::User;
use crate::utils::errors::AppError;

pub type UserRepository = EntityRepository<User>;

impl EntityRepository<User> {
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim().to_lowercase();
        let users = self
            .filter(&EntityQuery::new().eq("email", email.as_str()), None, Some(1))
            .await?;
        Ok(users.into_iter().next())
    }
}
