//! Entrega de notificações
//!
//! Un único hub: consume el feed de cambios del cliente de entidades, sondea
//! periódicamente como respaldo, elimina duplicados por id y reparte por un
//! canal `broadcast` a los visores de cada sesión.

use futures::stream::{self, Stream};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clients::{ChangeKind, Collection, EntityChange, EntityClient, Sort};
use crate::models::{Notification, SessionContext};
use crate::repositories::NotificationRepository;
use crate::utils::errors::{AppError, AppResult};

/// Cuántas notificaciones recientes mira cada sondeo
const POLL_WINDOW: usize = 50;

/// Ids recordados para deduplicar; basta cubrir varias ventanas de sondeo
const SEEN_CAPACITY: usize = POLL_WINDOW * 4;

/// Últimos ids repartidos, en orden de llegada
struct SeenIds {
    order: VecDeque<String>,
    ids: HashSet<String>,
    capacity: usize,
}

impl SeenIds {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// `true` si el id es nuevo
    fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

#[derive(Clone)]
pub struct NotificationHub {
    repository: NotificationRepository,
    sender: broadcast::Sender<Notification>,
    seen: Arc<Mutex<SeenIds>>,
}

impl NotificationHub {
    pub fn new(entities: Arc<dyn EntityClient>) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            repository: NotificationRepository::new(entities),
            sender,
            seen: Arc::new(Mutex::new(SeenIds::new(SEEN_CAPACITY))),
        }
    }

    /// Crea la notificación; un fallo se registra y nunca falla el request
    pub async fn notify(&self, notification: Notification) -> Option<Notification> {
        match self.repository.create(&notification).await {
            Ok(created) => {
                debug!("🔔 Notificação {:?} para {}", created.kind, created.user_id);
                self.dispatch(created.clone());
                Some(created)
            }
            Err(e) => {
                warn!("⚠️ Notificação não criada ({:?}): {}", notification.kind, e);
                None
            }
        }
    }

    /// Reparte una notificación la primera vez que se ve su id
    fn dispatch(&self, notification: Notification) -> bool {
        if !self.mark_seen(&notification.id) {
            return false;
        }
        // Sin visores conectados el envío falla y no pasa nada
        let _ = self.sender.send(notification);
        true
    }

    fn mark_seen(&self, id: &str) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(id),
            Err(poisoned) => poisoned.into_inner().insert(id),
        }
    }

    pub async fn list_for(&self, session: &SessionContext, only_unread: bool) -> AppResult<Vec<Notification>> {
        Ok(self
            .repository
            .list(Some(&Sort::newest_first()))
            .await?
            .into_iter()
            .filter(|n| n.visible_to(session) && (!only_unread || !n.is_read))
            .collect())
    }

    pub async fn unread_count(&self, session: &SessionContext) -> AppResult<usize> {
        Ok(self.list_for(session, true).await?.len())
    }

    pub async fn mark_read(&self, session: &SessionContext, id: &str) -> AppResult<Notification> {
        let notification = self.repository.get(id).await?;
        if !notification.visible_to(session) {
            return Err(AppError::NotFound(format!("Notificação '{}' não encontrada", id)));
        }
        if notification.is_read {
            return Ok(notification);
        }
        self.repository
            .update(id, serde_json::json!({ "isRead": true }))
            .await
    }

    pub async fn mark_all_read(&self, session: &SessionContext) -> AppResult<usize> {
        let unread = self.list_for(session, true).await?;
        let mut marked = 0;
        for notification in unread {
            self.repository
                .update(&notification.id, serde_json::json!({ "isRead": true }))
                .await?;
            marked += 1;
        }
        Ok(marked)
    }

    /// Stream de notificaciones visibles para la sesión
    pub fn subscribe(&self, session: SessionContext) -> impl Stream<Item = Notification> + Send + 'static {
        let receiver = self.sender.subscribe();
        stream::unfold((receiver, session), |(mut receiver, session)| async move {
            loop {
                match receiver.recv().await {
                    Ok(notification) if notification.visible_to(&session) => {
                        return Some((notification, (receiver, session)))
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ Visor de notificações atrasado, {} perdidas", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    fn handle_change(&self, change: EntityChange) {
        if change.collection != Collection::Notifications || change.kind != ChangeKind::Create {
            return;
        }
        let Some(record) = change.record else { return };
        match serde_json::from_value::<Notification>(record) {
            Ok(notification) => {
                self.dispatch(notification);
            }
            Err(e) => warn!("⚠️ Notificação {} ilegível no feed: {}", change.id, e),
        }
    }

    async fn poll(&self, announce: bool) {
        let recent = match self
            .repository
            .list(Some(&Sort::newest_first()))
            .await
        {
            Ok(recent) => recent,
            Err(e) => {
                warn!("⚠️ Sondagem de notificações falhou: {}", e);
                return;
            }
        };
        for notification in recent.into_iter().take(POLL_WINDOW).rev() {
            if announce {
                self.dispatch(notification);
            } else {
                self.mark_seen(&notification.id);
            }
        }
    }

    /// Arranca el consumidor del feed de cambios con sondeo de respaldo
    pub fn spawn(&self, entities: &Arc<dyn EntityClient>, poll_interval: Duration) -> JoinHandle<()> {
        let hub = self.clone();
        let mut changes = entities.subscribe();
        tokio::spawn(async move {
            info!("🔔 Hub de notificações activo (sondagem a cada {:?})", poll_interval);
            // Lo que ya existe al arrancar no se anuncia
            hub.poll(false).await;
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.tick().await;

            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) => hub.handle_change(change),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("⚠️ Feed de mudanças atrasado ({} eventos), a sondar", skipped);
                            hub.poll(true).await;
                        }
                        Err(RecvError::Closed) => {
                            warn!("⚠️ Feed de mudanças fechado, apenas sondagem");
                            break;
                        }
                    },
                    _ = ticker.tick() => hub.poll(true).await,
                }
            }

            loop {
                ticker.tick().await;
                hub.poll(true).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryEntityClient;
    use crate::models::{NotificationKind, NotificationTarget, Role};
    use futures::StreamExt;

    fn session(role: Role, technician: Option<&str>) -> SessionContext {
        SessionContext {
            user_id: "u".into(),
            email: "u@oficina.pt".into(),
            role,
            technician: technician.map(str::to_string),
            display_name: "U".into(),
        }
    }

    #[tokio::test]
    async fn test_notify_scopes_and_marks_read() {
        let entities: Arc<dyn EntityClient> = Arc::new(InMemoryEntityClient::new());
        let hub = NotificationHub::new(entities);
        let nuno = session(Role::Tecnico, Some("nuno"));
        let admin = session(Role::Admin, None);

        hub.notify(Notification::new(
            NotificationTarget::Technician("nuno".into()),
            NotificationKind::MaquinaAtribuida,
            "Máquina atribuída",
        ))
        .await
        .unwrap();
        hub.notify(Notification::new(NotificationTarget::Admin, NotificationKind::MaquinaConcluida, "Concluída"))
            .await
            .unwrap();
        hub.notify(Notification::new(NotificationTarget::All, NotificationKind::NovaMaquina, "Nova"))
            .await
            .unwrap();

        assert_eq!(hub.unread_count(&nuno).await.unwrap(), 2);
        assert_eq!(hub.unread_count(&admin).await.unwrap(), 2);

        assert_eq!(hub.mark_all_read(&nuno).await.unwrap(), 2);
        assert_eq!(hub.unread_count(&nuno).await.unwrap(), 0);
        // `all` foi lida pelo técnico
        assert_eq!(hub.unread_count(&admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_hides_other_targets() {
        let entities: Arc<dyn EntityClient> = Arc::new(InMemoryEntityClient::new());
        let hub = NotificationHub::new(entities);
        let created = hub
            .notify(Notification::new(NotificationTarget::Admin, NotificationKind::PecasChegaram, "x"))
            .await
            .unwrap();

        let nuno = session(Role::Tecnico, Some("nuno"));
        assert!(matches!(hub.mark_read(&nuno, &created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_subscribe_receives_each_notification_once() {
        let entities: Arc<dyn EntityClient> = Arc::new(InMemoryEntityClient::new());
        let hub = NotificationHub::new(Arc::clone(&entities));
        let mut stream = Box::pin(hub.subscribe(session(Role::Tecnico, Some("nuno"))));

        let created = hub
            .notify(Notification::new(
                NotificationTarget::Technician("nuno".into()),
                NotificationKind::OsAtribuida,
                "O.S. atribuída",
            ))
            .await
            .unwrap();

        // O mesmo registo a chegar pelo feed não se repete
        hub.handle_change(EntityChange {
            collection: Collection::Notifications,
            kind: ChangeKind::Create,
            id: created.id.clone(),
            record: Some(serde_json::to_value(&created).unwrap()),
        });
        hub.notify(Notification::new(NotificationTarget::All, NotificationKind::NovaMaquina, "Nova"))
            .await
            .unwrap();

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(first.id, created.id);
        assert_eq!(second.kind, NotificationKind::NovaMaquina);
    }

    #[test]
    fn test_seen_ids_are_bounded() {
        let mut seen = SeenIds::new(SEEN_CAPACITY);
        for i in 0..SEEN_CAPACITY * 3 {
            assert!(seen.insert(&format!("n{}", i)));
        }
        assert_eq!(seen.ids.len(), SEEN_CAPACITY);
        assert_eq!(seen.order.len(), SEEN_CAPACITY);

        // Os mais recentes continuam deduplicados, os antigos saíram
        let newest = format!("n{}", SEEN_CAPACITY * 3 - 1);
        assert!(!seen.insert(&newest));
        assert!(seen.insert("n0"));
    }

    #[tokio::test]
    async fn test_hub_memory_stays_bounded() {
        let entities: Arc<dyn EntityClient> = Arc::new(InMemoryEntityClient::new());
        let hub = NotificationHub::new(entities);
        for i in 0..SEEN_CAPACITY + 25 {
            let mut notification =
                Notification::new(NotificationTarget::All, NotificationKind::NovaMaquina, "Nova");
            notification.id = format!("n{}", i);
            assert!(hub.dispatch(notification));
        }
        assert_eq!(hub.seen.lock().unwrap().ids.len(), SEEN_CAPACITY);
    }

    #[tokio::test]
    async fn test_unknown_kind_still_counts() {
        let entities: Arc<dyn EntityClient> = Arc::new(InMemoryEntityClient::new());
        entities
            .create(
                Collection::Notifications,
                serde_json::json!({ "userId": "all", "message": "Revisão anual", "type": "lembrete" }),
            )
            .await
            .unwrap();
        let hub = NotificationHub::new(entities);
        assert_eq!(hub.unread_count(&session(Role::Admin, None)).await.unwrap(), 1);
    }
}
