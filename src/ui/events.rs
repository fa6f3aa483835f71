//! Background task event processing.
//!
//! Results are applied one at a time on the UI task, so merging never races
//! with input handling.

use crate::app::{App, AppEvent};
use tokio::sync::mpsc;

use super::sync;

/// Apply one background result to the application state.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    match event {
        AppEvent::TopicsRefreshed(result) => app.apply_refresh(result),
        AppEvent::MoreTopicsLoaded(result) => app.apply_more(result),
        AppEvent::AllTopicsLoaded(result) => app.apply_all(result),
        AppEvent::PostsLoaded {
            topic_id,
            origin,
            result,
        } => app.apply_posts(topic_id, origin, result),
        AppEvent::TopicCreated(result) => {
            if app.apply_topic_created(result) {
                // Show the new topic without waiting for the timer.
                sync::request_refresh(app, event_tx);
            }
        }
        AppEvent::PostActionCompleted { post_id, result } => {
            app.apply_post_action(post_id, result)
        }
        AppEvent::TaskPanicked { task, error } => app.apply_task_panic(task, &error),
    }
}
