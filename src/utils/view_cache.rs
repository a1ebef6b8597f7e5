use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;

use crate::schedule::session::ScheduleView;

/// One [`ScheduleView`] per view session. Idle sessions expire; views never
/// share state with each other.
#[derive(Clone)]
pub struct ViewRegistry {
    views: Cache<String, Arc<Mutex<ScheduleView>>>,
    per_page: u32,
}

impl ViewRegistry {
    pub fn new(max_sessions: u64, idle_ttl: Duration, per_page: u32) -> Self {
        Self {
            views: Cache::builder()
                .max_capacity(max_sessions)
                .time_to_idle(idle_ttl)
                .build(),
            per_page,
        }
    }

    /// Existing view for the session, or a fresh one.
    pub async fn view(&self, session_id: &str) -> Arc<Mutex<ScheduleView>> {
        let per_page = self.per_page;
        self.views
            .get_with(session_id.to_string(), async move {
                log::info!("Opening schedule view for session {}", session_id);
                Arc::new(Mutex::new(ScheduleView::new(per_page)))
            })
            .await
    }

    /// Drops the session's view. Returns whether one existed.
    pub async fn close(&self, session_id: &str) -> bool {
        self.views.remove(session_id).await.is_some()
    }
}
