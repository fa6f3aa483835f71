//! Background network operations driven by the UI.
//!
//! Every operation checks its in-flight flag, sets it, and spawns one task
//! that reports back through the `AppEvent` channel. The flag is cleared
//! only when the result (or a panic report) is applied on the UI task, so
//! a second request of the same kind issued meanwhile is a no-op.

use crate::app::{App, AppEvent, PostsOrigin, ReaderState, Task, View};
use std::future::Future;
use tokio::sync::mpsc;

use super::helpers::catch_task_panic;

/// Spawn `work`, catching panics, and deliver its event.
fn spawn_task<F>(event_tx: &mpsc::Sender<AppEvent>, task: Task, work: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let event = match catch_task_panic(work).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task = task.name(), error = %error, "Task panicked");
                AppEvent::TaskPanicked { task, error }
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(task = task.name(), error = %e, "Failed to send task result (receiver dropped)");
        }
    });
}

/// Re-fetch the first page of latest topics.
pub(super) fn request_refresh(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    if app.sync.refreshing {
        tracing::debug!("Refresh already in flight, ignoring");
        return false;
    }
    app.sync.refreshing = true;
    app.set_status("Refreshing...");

    let client = app.client.clone();
    spawn_task(event_tx, Task::Refresh, async move {
        AppEvent::TopicsRefreshed(client.refresh_topics().await)
    });
    true
}

/// Follow the current continuation cursor.
pub(super) fn request_load_more(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    if app.sync.loading_more {
        tracing::debug!("Load more already in flight, ignoring");
        return false;
    }
    if !app.topics.has_more() {
        app.set_status("No more topics");
        return false;
    }
    app.sync.loading_more = true;
    app.set_status("Loading more topics...");

    let client = app.client.clone();
    let cursor = app.topics.more_cursor.clone();
    spawn_task(event_tx, Task::LoadMore, async move {
        AppEvent::MoreTopicsLoaded(client.more_topics(&cursor).await)
    });
    true
}

/// Fetch up to the configured page cap and replace the list.
pub(super) fn request_load_all(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    if app.sync.loading_all {
        tracing::debug!("Load all already in flight, ignoring");
        return false;
    }
    app.sync.loading_all = true;
    app.set_status(format!("Loading up to {} pages...", app.max_pages));

    let client = app.client.clone();
    let max_pages = app.max_pages;
    spawn_task(event_tx, Task::LoadAll, async move {
        AppEvent::AllTopicsLoaded(client.load_all_topics(max_pages).await)
    });
    true
}

/// Open the selected topic in the viewport.
///
/// Two fetches race: the first page (one request) for a quick render and
/// the full post set (two requests). Whichever lands later is shown, except
/// that a first page never replaces the full set.
pub(super) fn open_topic(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    if app.sync.loading_posts() {
        app.set_status("Still loading posts...");
        return false;
    }
    let Some(topic) = app.selected_topic() else {
        return false;
    };
    let reader = ReaderState::new(topic);
    let topic_id = reader.topic_id;
    app.reader = Some(reader);
    app.sync.posts_in_flight = 2;
    app.set_status("Loading posts...");

    let client = app.client.clone();
    spawn_task(
        event_tx,
        Task::Posts(PostsOrigin::FirstPage),
        async move {
            AppEvent::PostsLoaded {
                topic_id,
                origin: PostsOrigin::FirstPage,
                result: client.topic_posts_page(topic_id, 1).await,
            }
        },
    );

    let client = app.client.clone();
    spawn_task(event_tx, Task::Posts(PostsOrigin::Full), async move {
        AppEvent::PostsLoaded {
            topic_id,
            origin: PostsOrigin::Full,
            result: client.topic_posts(topic_id).await,
        }
    });
    true
}

/// Submit the compose form.
///
/// Validation errors stay on the form without a request. The form is kept
/// (marked submitting) until the result arrives.
pub(super) fn submit_topic(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    if app.sync.creating_topic {
        return false;
    }
    let Some(form) = app.compose.as_mut() else {
        return false;
    };
    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(msg) => {
            form.error = Some(msg);
            return false;
        }
    };
    form.submitting = true;
    form.error = None;
    app.sync.creating_topic = true;
    app.set_status("Creating topic...");

    let client = app.client.clone();
    spawn_task(event_tx, Task::CreateTopic, async move {
        AppEvent::TopicCreated(client.create_topic(&draft).await)
    });
    true
}

/// Like the selected post in the viewport.
pub(super) fn like_selected_post(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) -> bool {
    let Some(post) = app.reader.as_ref().and_then(|r| r.selected()) else {
        app.set_status("No post selected");
        return false;
    };
    if post.liked() {
        app.set_status("Already liked");
        return false;
    }
    let post_id = post.id;
    app.set_status("Liking...");

    let client = app.client.clone();
    spawn_task(event_tx, Task::PostAction, async move {
        AppEvent::PostActionCompleted {
            post_id,
            result: client.like_post(post_id).await,
        }
    });
    true
}

/// Periodic refresh. The timer re-arms when it fires, even if a refresh is
/// still in flight and this one is dropped.
pub(super) fn on_tick(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    if app.take_refresh_due(tokio::time::Instant::now()) {
        tracing::debug!("Auto-refresh timer fired");
        if request_refresh(app, event_tx) {
            app.needs_redraw = true;
        }
    }
}

/// Leave the compose form, discarding its contents.
pub(super) fn cancel_compose(app: &mut App) {
    if app.compose.as_ref().is_some_and(|f| f.submitting) {
        app.set_status("Topic is being submitted...");
        return;
    }
    app.compose = None;
    app.view = View::Browse;
}
