use std::sync::atomic::Ordering;

use super::*;
use chrono::NaiveDate;
use serde_json::json;
use shared::{calendar::CustomEvent, domain::{Ownership, TemplateId}};

use crate::test_support::{Call, FakeTransport};

fn controller_over(transport: &Arc<FakeTransport>) -> Arc<SessionController> {
    SessionController::new(transport.clone(), PageLayout::default())
}

fn calendar(id: &str) -> CalendarReference {
    CalendarReference::Calendar(CalendarId::new(id))
}

fn drain(events: &mut broadcast::Receiver<EditorEvent>) -> Vec<EditorEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn own_calendar_loads_as_owned() {
    let transport = Arc::new(FakeTransport::new());
    let controller = controller_over(&transport);

    controller.bootstrap(calendar("cal-1")).await.unwrap();

    let session = controller.session().await;
    assert_eq!(session.ownership(), Ownership::Owned);
    assert_eq!(session.calendar_id(), Some(&CalendarId::new("cal-1")));
    assert!(!session.is_initializing());
    assert_eq!(transport.calls(), vec![Call::Fetch("cal-1".into())]);

    assert_eq!(controller.document().await.name, "Family 2026");
    let svg = controller.current_svg().await.expect("preview");
    assert!(svg.contains(r#"width="35in""#));
    assert!(svg.contains("<text>loaded</text>"));
}

#[tokio::test]
async fn foreign_calendar_loads_view_only() {
    let transport = Arc::new(FakeTransport::shared());
    let controller = controller_over(&transport);

    controller.bootstrap(calendar("cal-9")).await.unwrap();

    let session = controller.session().await;
    assert_eq!(session.ownership(), Ownership::ViewingShared);
    assert_eq!(session.calendar_id(), None);
    assert_eq!(session.original_calendar_id(), Some(&CalendarId::new("cal-9")));
}

#[tokio::test]
async fn template_reference_starts_owned_copy() {
    let transport = Arc::new(FakeTransport::new());
    let controller = controller_over(&transport);

    controller
        .bootstrap(CalendarReference::Template(TemplateId::new("moon")))
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec![Call::FromTemplate("moon".into())]);
    let session = controller.session().await;
    assert_eq!(session.ownership(), Ownership::Owned);
    assert_eq!(session.calendar_id(), Some(&CalendarId::new("template-1")));
    assert_eq!(controller.document().await.name, "Moon phases");
}

#[tokio::test]
async fn missing_reference_creates_default_calendar() {
    let transport = Arc::new(FakeTransport::new());
    let controller = controller_over(&transport);

    controller.bootstrap(CalendarReference::None).await.unwrap();

    assert_eq!(transport.calls(), vec![Call::CreateDefault]);
    let session = controller.session().await;
    assert_eq!(session.ownership(), Ownership::Owned);
    assert_eq!(session.calendar_id(), Some(&CalendarId::new("default-1")));
    assert_eq!(controller.document().await.name, DEFAULT_CALENDAR_NAME);
    assert_eq!(
        controller.document().await.configuration.setting("theme"),
        Some(&json!("classic"))
    );
}

#[tokio::test]
async fn failed_load_falls_back_to_default() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_fetch.store(true, Ordering::SeqCst);
    let controller = controller_over(&transport);
    let mut events = controller.subscribe_events();

    controller.bootstrap(calendar("cal-1")).await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![Call::Fetch("cal-1".into()), Call::CreateDefault]
    );
    let session = controller.session().await;
    assert_eq!(session.calendar_id(), Some(&CalendarId::new("default-1")));
    assert!(!session.is_initializing());
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, EditorEvent::LoadFellBack { .. })));
}

#[tokio::test]
async fn failed_default_still_finishes_bootstrap() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_default.store(true, Ordering::SeqCst);
    let controller = controller_over(&transport);

    let err = controller.bootstrap(CalendarReference::None).await.unwrap_err();

    assert!(matches!(err, SessionError::Load { .. }));
    assert!(!controller.session().await.is_initializing());
    assert_eq!(controller.current_svg().await, None);
}

#[tokio::test]
async fn begin_edit_copies_shared_calendar() {
    let transport = Arc::new(FakeTransport::shared());
    let controller = controller_over(&transport);
    controller.bootstrap(calendar("cal-9")).await.unwrap();
    let mut events = controller.subscribe_events();

    controller.begin_edit().await.unwrap();

    let session = controller.session().await;
    assert_eq!(session.ownership(), Ownership::Owned);
    assert_eq!(session.calendar_id(), Some(&CalendarId::new("copy-1")));
    assert_eq!(session.original_calendar_id(), None);
    assert!(drain(&mut events).iter().any(|event| matches!(
        event,
        EditorEvent::SessionChanged(snapshot) if snapshot.ownership == Ownership::Owned
    )));

    controller.begin_edit().await.unwrap();
    let copies = transport
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Copy(_)))
        .count();
    assert_eq!(copies, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_begin_edits_copy_once() {
    let transport = Arc::new(FakeTransport::shared());
    transport.copy_delay_ms.store(50, Ordering::SeqCst);
    let controller = controller_over(&transport);
    controller.bootstrap(calendar("cal-9")).await.unwrap();

    let edits: Vec<_> = (0..2)
        .map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.begin_edit().await })
        })
        .collect();
    for edit in edits {
        edit.await.unwrap().unwrap();
    }

    let copies = transport
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Copy(_)))
        .count();
    assert_eq!(copies, 1);
    assert_eq!(
        controller.session().await.calendar_id(),
        Some(&CalendarId::new("copy-1"))
    );
}

#[tokio::test]
async fn begin_edit_passes_through_owned_sessions() {
    let transport = Arc::new(FakeTransport::new());
    let controller = controller_over(&transport);
    controller.bootstrap(calendar("cal-1")).await.unwrap();

    controller.begin_edit().await.unwrap();

    assert_eq!(transport.calls(), vec![Call::Fetch("cal-1".into())]);
}

#[tokio::test]
async fn failed_copy_keeps_session_view_only() {
    let transport = Arc::new(FakeTransport::shared());
    transport.fail_copy.store(true, Ordering::SeqCst);
    let controller = controller_over(&transport);
    controller.bootstrap(calendar("cal-9")).await.unwrap();
    let mut events = controller.subscribe_events();

    let err = controller.begin_edit().await.unwrap_err();

    assert!(matches!(err, SessionError::Copy { .. }));
    assert!(err.is_retryable());
    let session = controller.session().await;
    assert_eq!(session.ownership(), Ownership::ViewingShared);
    assert_eq!(session.original_calendar_id(), Some(&CalendarId::new("cal-9")));
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, EditorEvent::CopyFailed { .. })));
}

#[tokio::test]
async fn shared_calendar_is_never_saved_without_copy() {
    let transport = Arc::new(FakeTransport::shared());
    let controller = controller_over(&transport);
    controller.bootstrap(calendar("cal-9")).await.unwrap();

    let err = controller.persist_latest().await.unwrap_err();

    assert!(matches!(err, SessionError::NotCopied { .. }));
    assert!(transport.saves().is_empty());
}

#[tokio::test]
async fn unsaved_session_creates_then_upserts() {
    let transport = Arc::new(FakeTransport::new());
    transport.default_has_id.store(false, Ordering::SeqCst);
    let controller = controller_over(&transport);
    controller.bootstrap(CalendarReference::None).await.unwrap();
    assert_eq!(controller.session().await.ownership(), Ownership::None);

    let first = controller.persist_latest().await.unwrap();
    assert!(first.first_save);
    assert_eq!(first.calendar_id, CalendarId::new("saved-1"));
    assert_eq!(
        controller.session().await.calendar_id(),
        Some(&CalendarId::new("saved-1"))
    );

    let second = controller.persist_latest().await.unwrap();
    assert!(!second.first_save);

    let saves = transport.saves();
    assert!(matches!(saves[0], Call::SaveNew(_)));
    assert!(matches!(&saves[1], Call::Autosave(id, _) if id == "saved-1"));
}

#[tokio::test]
async fn save_sends_rebuilt_derived_maps_and_refreshes_preview() {
    let transport = Arc::new(FakeTransport::new());
    let controller = controller_over(&transport);
    controller.bootstrap(calendar("cal-1")).await.unwrap();

    controller
        .update_document(|doc| {
            doc.name = "Renamed".to_string();
            doc.configuration.add_event(
                CustomEvent::new(NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(), "🎆", "Fireworks")
                    .with_title_shown(true),
            );
        })
        .await;
    controller.persist_latest().await.unwrap();

    let saves = transport.saves();
    let Call::Autosave(id, request) = &saves[0] else {
        panic!("expected autosave, got {saves:?}");
    };
    assert_eq!(id, "cal-1");
    assert_eq!(request.name, "Renamed");
    assert_eq!(request.configuration.custom_dates()["2026-07-04"].emoji, "🎆");
    assert_eq!(request.configuration.event_titles()["2026-07-04"], "Fireworks");

    let svg = controller.current_svg().await.unwrap();
    assert!(svg.contains("<text>Renamed</text>"));
}

#[tokio::test]
async fn failed_save_keeps_session_and_reports() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_saves.store(1, Ordering::SeqCst);
    let controller = controller_over(&transport);
    controller.bootstrap(calendar("cal-1")).await.unwrap();
    let mut events = controller.subscribe_events();

    let err = controller.persist_latest().await.unwrap_err();

    assert!(matches!(
        &err,
        SessionError::Save { calendar_id: Some(id), .. } if id.as_str() == "cal-1"
    ));
    assert_eq!(
        controller.session().await.calendar_id(),
        Some(&CalendarId::new("cal-1"))
    );
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, EditorEvent::SaveFailed { .. })));

    controller.persist_latest().await.unwrap();
}

#[tokio::test]
async fn legacy_configuration_becomes_editable() {
    let transport = Arc::new(FakeTransport::new());
    *transport.stored_configuration.lock().unwrap() = serde_json::from_value(json!({
        "customDates": { "2026-12-25": { "emoji": "🎄" } },
        "eventTitles": { "2026-12-25": "Christmas" }
    }))
    .unwrap();
    let controller = controller_over(&transport);

    controller.bootstrap(calendar("cal-1")).await.unwrap();

    let document = controller.document().await;
    let events = document.configuration.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Christmas");
    assert!(events[0].show_title);
}

#[tokio::test]
async fn bootstrap_reports_initializing_to_autosave() {
    let transport = Arc::new(FakeTransport::new());
    let controller = controller_over(&transport);
    let target: Arc<dyn AutosaveTarget> = controller.clone();

    controller
        .transition(SessionTransition::BeginBootstrap)
        .await
        .unwrap();
    assert!(target.is_initializing().await);

    controller
        .transition(SessionTransition::FinishBootstrap)
        .await
        .unwrap();
    assert!(!target.is_initializing().await);
}
