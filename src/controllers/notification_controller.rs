use futures::stream::Stream;

use crate::dto::notification_dto::NotificationListQuery;
use crate::models::{Notification, SessionContext};
use crate::services::NotificationHub;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct NotificationController {
    hub: NotificationHub,
}

impl NotificationController {
    pub fn new(state: &AppState) -> Self {
        Self {
            hub: state.notifications.clone(),
        }
    }

    pub async fn list(
        &self,
        session: &SessionContext,
        query: &NotificationListQuery,
    ) -> AppResult<Vec<Notification>> {
        self.hub.list_for(session, query.unread_only).await
    }

    pub async fn unread_count(&self, session: &SessionContext) -> AppResult<usize> {
        self.hub.unread_count(session).await
    }

    pub async fn mark_read(&self, session: &SessionContext, id: &str) -> AppResult<Notification> {
        self.hub.mark_read(session, id).await
    }

    pub async fn mark_all_read(&self, session: &SessionContext) -> AppResult<usize> {
        self.hub.mark_all_read(session).await
    }

    /// Notificaciones en vivo para la sesión
    pub fn stream(&self, session: SessionContext) -> impl Stream<Item = Notification> + Send + 'static {
        self.hub.subscribe(session)
    }
}
