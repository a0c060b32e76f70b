//! # Dialogue Tests
//!
//! End-to-end tests of the task creation dialogue driven through
//! [`DialogueEngine`] with a fake backend and transport. Timers run on
//! tokio's paused clock.

mod common;

use chrono::NaiveDate;
use std::time::Duration;
use teloxide::types::ChatId;

use common::{harness, harness_with};
use task_capture::bot::ButtonReply;
use task_capture::config::DialogConfig;
use task_capture::drafts::DraftId;
use task_capture::session::DialogStage;
use task_capture::task_model::{Category, NewTask, Priority};
use task_capture::timeouts::TimeoutToken;

const CHAT: ChatId = ChatId(42);
const OTHER_CHAT: ChatId = ChatId(7);

fn draft(text: &str) -> DraftId {
    DraftId::derive(text)
}

async fn wait(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn test_full_walk_work_category() {
    let h = harness();
    let id = draft("Buy milk");

    h.engine.handle_text(CHAT, "Buy milk").await;
    let prompt = h.transport.last(CHAT).unwrap();
    assert_eq!(prompt.text, "Choose a category for the task \"Buy milk\":");
    assert!(prompt.markup.is_some());
    assert_eq!(
        h.engine.sessions().get(CHAT).unwrap().stage,
        DialogStage::AwaitingCategory
    );

    h.engine.handle_button(CHAT, &format!("cat:{id}:Work")).await;
    assert_eq!(
        h.engine.sessions().get(CHAT).unwrap().stage,
        DialogStage::AwaitingWeight
    );
    assert_eq!(
        h.transport.last(CHAT).unwrap().text,
        "Please select the PMD value for this task:"
    );

    h.engine.handle_button(CHAT, &format!("pmd:{id}:skip")).await;
    assert_eq!(
        h.engine.sessions().get(CHAT).unwrap().stage,
        DialogStage::AwaitingPriority
    );

    h.engine.handle_button(CHAT, &format!("prio:{id}:High")).await;
    assert_eq!(
        h.engine.sessions().get(CHAT).unwrap().stage,
        DialogStage::AwaitingDueDate
    );

    let reply = h.engine.handle_button(CHAT, &format!("date:{id}:skip")).await;
    assert_eq!(reply, ButtonReply::default());

    assert_eq!(
        h.backend.created(),
        vec![NewTask::new("Buy milk", Category::Work).with_priority(Some(Priority::High))]
    );
    assert_eq!(
        h.transport.last(CHAT).unwrap().text,
        "Task \"Buy milk\" has been added to the \"Work\" category with PMD: not set, Priority: High, Due Date: not set."
    );
    assert!(h.engine.sessions().is_empty());
    assert!(h.engine.timeouts().is_empty());
    assert!(h.engine.drafts().is_empty());

    // Nothing else fires later
    wait(120).await;
    assert_eq!(h.backend.created().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_walk_with_values() {
    let h = harness();
    let id = draft("Fix the fence");

    h.engine.handle_text(CHAT, "Fix the fence").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Home")).await;
    h.engine.handle_button(CHAT, &format!("pmd:{id}:4")).await;
    h.engine.handle_button(CHAT, &format!("prio:{id}:Low")).await;
    h.engine.handle_button(CHAT, &format!("date:{id}:2026-10-20")).await;

    let expected = NewTask::new("Fix the fence", Category::Home)
        .with_weight(Some(4.0))
        .with_priority(Some(Priority::Low))
        .with_due_date(NaiveDate::from_ymd_opt(2026, 10, 20));
    assert_eq!(h.backend.created(), vec![expected]);
    assert_eq!(
        h.transport.last(CHAT).unwrap().text,
        "Task \"Fix the fence\" has been added to the \"Home\" category with PMD: 4, Priority: Low, Due Date: 2026-10-20."
    );
}

#[tokio::test(start_paused = true)]
async fn test_category_timeout_commits_default_category() {
    let h = harness();

    h.engine.handle_text(CHAT, "Call mom").await;
    wait(29).await;
    assert!(h.backend.created().is_empty());

    wait(2).await;
    assert_eq!(
        h.backend.created(),
        vec![NewTask::new("Call mom", Category::Today)]
    );
    let text = h.transport.last(CHAT).unwrap().text;
    assert!(text.starts_with("Category selection time expired."));
    assert!(text.contains("\"Today\" category"));
    assert!(h.engine.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_weight_timeout_keeps_category() {
    let h = harness();
    let id = draft("Report");

    h.engine.handle_text(CHAT, "Report").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Work")).await;
    wait(31).await;

    assert_eq!(h.backend.created(), vec![NewTask::new("Report", Category::Work)]);
    assert!(h
        .transport
        .last(CHAT)
        .unwrap()
        .text
        .starts_with("PMD selection time expired."));
}

#[tokio::test(start_paused = true)]
async fn test_priority_timeout_keeps_weight() {
    let h = harness();
    let id = draft("Plan trip");

    h.engine.handle_text(CHAT, "Plan trip").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Global")).await;
    h.engine.handle_button(CHAT, &format!("pmd:{id}:8")).await;
    wait(31).await;

    assert_eq!(
        h.backend.created(),
        vec![NewTask::new("Plan trip", Category::Global).with_weight(Some(8.0))]
    );
    assert!(h
        .transport
        .last(CHAT)
        .unwrap()
        .text
        .starts_with("Priority selection time expired."));
}

#[tokio::test(start_paused = true)]
async fn test_selection_resets_timer() {
    let h = harness();
    let id = draft("Email Bob");

    h.engine.handle_text(CHAT, "Email Bob").await;
    wait(20).await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Work")).await;

    // The category deadline would have passed here
    wait(15).await;
    assert!(h.backend.created().is_empty());
    assert_eq!(
        h.engine.sessions().get(CHAT).unwrap().stage,
        DialogStage::AwaitingWeight
    );

    wait(20).await;
    assert_eq!(h.backend.created().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fire_after_dialog_moved_on_is_ignored() {
    let h = harness();
    let id = draft("Sort mail");

    h.engine.handle_text(CHAT, "Sort mail").await;
    let armed = h.engine.sessions().get(CHAT).unwrap();
    h.engine.handle_button(CHAT, &format!("cat:{id}:Work")).await;
    let sent_before = h.transport.texts(CHAT).len();

    h.engine
        .fire(TimeoutToken {
            chat_id: CHAT,
            generation: armed.generation,
            stage: DialogStage::AwaitingCategory,
        })
        .await;

    assert!(h.backend.created().is_empty());
    assert_eq!(h.transport.texts(CHAT).len(), sent_before);
    let session = h.engine.sessions().get(CHAT).unwrap();
    assert_eq!(session.stage, DialogStage::AwaitingWeight);
    assert_eq!(session.category, Some(Category::Work));
}

#[tokio::test(start_paused = true)]
async fn test_fire_with_stale_generation_same_stage_is_ignored() {
    let h = harness();

    h.engine.handle_text(CHAT, "Water plants").await;
    let first = h.engine.sessions().get(CHAT).unwrap();

    // Identical text: same draft id and stage, new generation
    h.engine.handle_text(CHAT, "Water plants").await;
    let second = h.engine.sessions().get(CHAT).unwrap();
    assert_eq!(second.draft_id, first.draft_id);
    assert_eq!(second.stage, first.stage);
    assert_ne!(second.generation, first.generation);
    assert_eq!(h.backend.created().len(), 1);

    h.engine
        .fire(TimeoutToken {
            chat_id: CHAT,
            generation: first.generation,
            stage: DialogStage::AwaitingCategory,
        })
        .await;
    assert_eq!(h.backend.created().len(), 1);
    assert_eq!(h.engine.sessions().get(CHAT).unwrap(), second);

    // The current token still commits
    h.engine
        .fire(TimeoutToken {
            chat_id: CHAT,
            generation: second.generation,
            stage: DialogStage::AwaitingCategory,
        })
        .await;
    assert_eq!(h.backend.created().len(), 2);
    assert!(h.engine.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_due_date_outside_calendar_is_rejected() {
    let h = harness();
    let id = draft("Renew passport");

    h.engine.handle_text(CHAT, "Renew passport").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Work")).await;
    h.engine.handle_button(CHAT, &format!("pmd:{id}:skip")).await;
    h.engine.handle_button(CHAT, &format!("prio:{id}:skip")).await;

    for date in ["1999-01-01", "2026-11-15"] {
        let reply = h.engine.handle_button(CHAT, &format!("date:{id}:{date}")).await;
        assert_eq!(
            reply.notice.as_deref(),
            Some("This button is no longer active.")
        );
        assert_eq!(
            h.engine.sessions().get(CHAT).unwrap().stage,
            DialogStage::AwaitingDueDate
        );
    }
    assert!(h.backend.created().is_empty());

    // Last day offered by the calendar
    h.engine.handle_button(CHAT, &format!("date:{id}:2026-11-14")).await;
    assert_eq!(
        h.backend.created(),
        vec![NewTask::new("Renew passport", Category::Work)
            .with_due_date(NaiveDate::from_ymd_opt(2026, 11, 14))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_due_date_after_category_waits_longer() {
    let config = DialogConfig {
        weight_categories: vec![],
        ..DialogConfig::default()
    };
    let h = harness_with(config);
    let id = draft("Pay rent");

    h.engine.handle_text(CHAT, "Pay rent").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Home")).await;
    assert_eq!(
        h.engine.sessions().get(CHAT).unwrap().stage,
        DialogStage::AwaitingDueDate
    );

    wait(31).await;
    assert!(h.backend.created().is_empty());

    wait(30).await;
    assert_eq!(h.backend.created(), vec![NewTask::new("Pay rent", Category::Home)]);
    assert!(h
        .transport
        .last(CHAT)
        .unwrap()
        .text
        .starts_with("Date selection time expired."));
}

#[tokio::test(start_paused = true)]
async fn test_non_eligible_category_commits_immediately() {
    let h = harness();
    let id = draft("Stretch");

    h.engine.handle_text(CHAT, "Stretch").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Everyday")).await;

    assert_eq!(
        h.backend.created(),
        vec![NewTask::new("Stretch", Category::Everyday)]
    );
    assert!(h.engine.sessions().is_empty());
    assert!(h.engine.timeouts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_global_skips_due_date() {
    let h = harness();
    let id = draft("Learn Rust");

    h.engine.handle_text(CHAT, "Learn Rust").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Global")).await;
    h.engine.handle_button(CHAT, &format!("pmd:{id}:skip")).await;
    h.engine.handle_button(CHAT, &format!("prio:{id}:Med")).await;

    assert_eq!(
        h.backend.created(),
        vec![NewTask::new("Learn Rust", Category::Global).with_priority(Some(Priority::Med))]
    );
    assert!(h.engine.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_task() {
    let h = harness();
    let id = draft("Maybe later");

    h.engine.handle_text(CHAT, "Maybe later").await;
    let reply = h.engine.handle_button(CHAT, &format!("cancel:{id}")).await;
    assert_eq!(reply, ButtonReply::default());

    assert_eq!(
        h.transport.last(CHAT).unwrap().text,
        "Task creation cancelled. \"Maybe later\" was not added."
    );
    assert!(h.engine.sessions().is_empty());
    assert!(h.engine.drafts().is_empty());

    wait(60).await;
    assert!(h.backend.created().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_timeout_is_noop() {
    let h = harness();
    let id = draft("Too slow");

    h.engine.handle_text(CHAT, "Too slow").await;
    wait(31).await;
    let sent_before = h.transport.texts(CHAT).len();

    let reply = h.engine.handle_button(CHAT, &format!("cancel:{id}")).await;
    assert_eq!(reply, ButtonReply::default());
    assert_eq!(h.transport.texts(CHAT).len(), sent_before);
    assert_eq!(h.backend.created().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_stage_button_is_rejected() {
    let h = harness();
    let id = draft("Review PR");

    h.engine.handle_text(CHAT, "Review PR").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Work")).await;
    let before = h.engine.sessions().get(CHAT).unwrap();

    let reply = h.engine.handle_button(CHAT, &format!("cat:{id}:Home")).await;
    assert_eq!(
        reply.notice.as_deref(),
        Some("This button is no longer active.")
    );
    assert_eq!(h.engine.sessions().get(CHAT).unwrap(), before);
    assert!(h.backend.created().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unoffered_weight_is_rejected() {
    let h = harness();
    let id = draft("Odd weight");

    h.engine.handle_text(CHAT, "Odd weight").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Work")).await;

    let reply = h.engine.handle_button(CHAT, &format!("pmd:{id}:5")).await;
    assert!(reply.notice.is_some());
    assert_eq!(
        h.engine.sessions().get(CHAT).unwrap().stage,
        DialogStage::AwaitingWeight
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_draft_reports_expiry() {
    let h = harness();

    let reply = h
        .engine
        .handle_button(CHAT, "cat:0123456789abcdef:Work")
        .await;
    assert_eq!(reply, ButtonReply::default());
    assert_eq!(
        h.transport.last(CHAT).unwrap().text,
        "This task is no longer available. Please send it again."
    );
    assert!(h.backend.created().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_and_decorative_payloads() {
    let h = harness();

    let reply = h.engine.handle_button(CHAT, "garbage").await;
    assert!(reply.notice.is_some());

    let reply = h.engine.handle_button(CHAT, "ignore").await;
    assert_eq!(reply, ButtonReply::default());
    assert!(h.transport.texts(CHAT).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_new_text_supersedes_active_dialog() {
    let h = harness();
    let first = draft("First task");

    h.engine.handle_text(CHAT, "First task").await;
    h.engine.handle_button(CHAT, &format!("cat:{first}:Work")).await;
    h.engine.handle_text(CHAT, "Second task").await;

    assert_eq!(
        h.backend.created(),
        vec![NewTask::new("First task", Category::Work)]
    );
    let session = h.engine.sessions().get(CHAT).unwrap();
    assert_eq!(session.draft_id, draft("Second task"));
    assert_eq!(session.stage, DialogStage::AwaitingCategory);

    // Buttons of the first dialog no longer apply
    h.engine.handle_button(CHAT, &format!("pmd:{first}:2")).await;
    assert_eq!(
        h.transport.last(CHAT).unwrap().text,
        "This task is no longer available. Please send it again."
    );
    assert_eq!(h.backend.created().len(), 1);

    wait(31).await;
    assert_eq!(
        h.backend.created(),
        vec![
            NewTask::new("First task", Category::Work),
            NewTask::new("Second task", Category::Today),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_chats_are_independent() {
    let h = harness();
    let id = draft("Shared text");

    h.engine.handle_text(CHAT, "Shared text").await;
    h.engine.handle_text(OTHER_CHAT, "Shared text").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Everyday")).await;

    assert_eq!(h.backend.created().len(), 1);
    assert_eq!(
        h.engine.sessions().get(OTHER_CHAT).unwrap().stage,
        DialogStage::AwaitingCategory
    );
    // The other chat still holds the shared draft
    assert_eq!(h.engine.drafts().len(), 1);

    wait(31).await;
    assert_eq!(
        h.backend.created(),
        vec![
            NewTask::new("Shared text", Category::Everyday),
            NewTask::new("Shared text", Category::Today),
        ]
    );
    assert!(h.engine.drafts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_is_reported() {
    let h = harness();
    h.backend.set_failing(true);
    let id = draft("Unlucky");

    h.engine.handle_text(CHAT, "Unlucky").await;
    h.engine.handle_button(CHAT, &format!("cat:{id}:Today")).await;

    assert_eq!(
        h.transport.last(CHAT).unwrap().text,
        "Failed to add task to Notion. Please try again later or contact the administrator."
    );
    assert!(h.engine.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_commands_and_blank_text_are_ignored() {
    let h = harness();

    h.engine.handle_text(CHAT, "/list").await;
    h.engine.handle_text(CHAT, "   ").await;

    assert!(h.engine.sessions().is_empty());
    assert!(h.transport.texts(CHAT).is_empty());
}
