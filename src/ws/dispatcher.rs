//! Notification Dispatcher - Calcolo e invio degli eventi `deadlines` e `new_message`
//!
//! Tutto quello che passa di qui è best-effort: gli errori vengono loggati e mai propagati
//! alla richiesta HTTP che ha innescato la notifica.

use crate::dtos::{ChatMessageDTO, DeadlineItem, NewMessagePayload, SenderSummaryDTO, ServerEvent};
use crate::repositories::{ProjectRepository, TaskRepository};
use crate::ws::ConnectionRegistry;
use chrono::{DateTime, Duration, Utc};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Ampiezza della finestra delle scadenze imminenti
pub const DEADLINE_WINDOW_DAYS: i64 = 7;

#[derive(Clone)]
pub struct NotificationDispatcher {
    registry: Arc<ConnectionRegistry>,
    projects: ProjectRepository,
    tasks: TaskRepository,
}

impl NotificationDispatcher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        projects: ProjectRepository,
        tasks: TaskRepository,
    ) -> Self {
        Self {
            registry,
            projects,
            tasks,
        }
    }

    /// Scadenze di progetti e task dell'utente nei prossimi sette giorni, in ordine crescente
    pub async fn compute_upcoming_deadlines(
        &self,
        user_id: i32,
    ) -> Result<Vec<DeadlineItem>, sqlx::Error> {
        self.compute_upcoming_deadlines_at(user_id, Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn compute_upcoming_deadlines_at(
        &self,
        user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeadlineItem>, sqlx::Error> {
        // 1. Progetti dell'utente
        let projects = self.projects.find_many_by_owner(&user_id).await?;

        // 2. Task di ogni progetto, query in parallelo
        let task_lists = try_join_all(
            projects
                .iter()
                .map(|project| self.tasks.find_many_by_project(&project.project_id)),
        )
        .await?;

        // 3. Proiezione su DeadlineItem, scartando chi non ha una scadenza
        let mut items: Vec<DeadlineItem> = projects
            .iter()
            .filter_map(DeadlineItem::from_project)
            .collect();
        for (project, tasks) in projects.iter().zip(task_lists.iter()) {
            items.extend(
                tasks
                    .iter()
                    .filter_map(|task| DeadlineItem::from_task(project, task)),
            );
        }

        // 4. Ordinamento e finestra
        let upcoming = select_upcoming(items, now);
        debug!(count = upcoming.len(), "Upcoming deadlines computed");
        Ok(upcoming)
    }

    /// Ricalcola le scadenze e le invia a tutte le connessioni dell'utente (sostituzione completa).
    /// Ritorna il numero di connessioni raggiunte.
    #[instrument(skip(self))]
    pub async fn refresh_deadlines(&self, user_id: i32) -> usize {
        if !self.registry.is_user_online(user_id) {
            debug!("User not online, skipping deadline refresh");
            return 0;
        }

        match self.compute_upcoming_deadlines(user_id).await {
            Ok(deadlines) => {
                let count = deadlines.len();
                let delivered = self
                    .registry
                    .send_to_user(user_id, &ServerEvent::Deadlines { deadlines });
                info!(count, delivered, "Deadlines pushed");
                delivered
            }
            Err(e) => {
                error!("Failed to compute upcoming deadlines: {:?}", e);
                0
            }
        }
    }

    /// Come [`refresh_deadlines`](Self::refresh_deadlines) ma fuori dal ciclo richiesta/risposta
    pub fn spawn_refresh_deadlines(&self, user_id: i32) -> JoinHandle<usize> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.refresh_deadlines(user_id).await })
    }

    /// Invia `new_message` al solo destinatario, mai alle altre schede del mittente
    #[instrument(skip(self, message, from), fields(message_id = message.id, recipient_id = message.recipient_id))]
    pub fn notify_new_message(&self, message: &ChatMessageDTO, from: SenderSummaryDTO) -> usize {
        let event = ServerEvent::NewMessage {
            data: NewMessagePayload {
                message: message.clone(),
                from,
            },
        };
        let delivered = self.registry.send_to_user(message.recipient_id, &event);
        debug!(delivered, "New message notification sent");
        delivered
    }
}

/// Ordina per scadenza e tiene solo gli elementi non completati in `[now, now + 7 giorni]`
pub fn select_upcoming(mut items: Vec<DeadlineItem>, now: DateTime<Utc>) -> Vec<DeadlineItem> {
    let horizon = now + Duration::days(DEADLINE_WINDOW_DAYS);
    items.sort_by_key(|item| item.deadline);
    items
        .into_iter()
        .filter(|item| item.deadline >= now && item.deadline <= horizon)
        .filter(|item| !item.is_completed())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DeadlineKind;

    fn item(id: i32, kind: DeadlineKind, deadline: DateTime<Utc>, status: &str) -> DeadlineItem {
        DeadlineItem {
            id,
            project_id: 1,
            project_title: "Website".to_string(),
            title: format!("item {}", id),
            deadline,
            kind,
            status: status.to_string(),
        }
    }

    #[test]
    fn test_select_upcoming_window_and_order() {
        let now = Utc::now();
        let items = vec![
            item(1, DeadlineKind::Task, now + Duration::days(3), "open"),
            item(2, DeadlineKind::Task, now - Duration::seconds(1), "open"),
            item(3, DeadlineKind::Project, now + Duration::days(1), "in_progress"),
            item(4, DeadlineKind::Task, now + Duration::days(8), "open"),
            item(5, DeadlineKind::Project, now + Duration::days(7), "new"),
            item(6, DeadlineKind::Task, now, "open"),
        ];

        let ids: Vec<i32> = select_upcoming(items, now).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![6, 3, 1, 5]);
    }

    #[test]
    fn test_select_upcoming_drops_completed() {
        let now = Utc::now();
        let items = vec![
            item(1, DeadlineKind::Task, now + Duration::days(1), "done"),
            item(2, DeadlineKind::Project, now + Duration::days(1), "completed"),
            item(3, DeadlineKind::Project, now + Duration::days(1), "cancelled"),
            item(4, DeadlineKind::Task, now + Duration::days(2), "in_progress"),
        ];

        let ids: Vec<i32> = select_upcoming(items, now).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_select_upcoming_never_returns_out_of_window() {
        let now = Utc::now();
        let items: Vec<DeadlineItem> = (-20..20)
            .map(|h| item(h, DeadlineKind::Task, now + Duration::hours(i64::from(h) * 12), "open"))
            .collect();

        for selected in select_upcoming(items, now) {
            assert!(selected.deadline >= now);
            assert!(selected.deadline <= now + Duration::days(DEADLINE_WINDOW_DAYS));
        }
    }
}
