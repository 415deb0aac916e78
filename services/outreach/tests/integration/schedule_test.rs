use std::collections::BTreeSet;

use uuid::Uuid;

use touchbase_domain::cadence::{CadenceKind, CadenceRule, generate};
use touchbase_domain::pagination::PageRequest;
use touchbase_outreach::domain::types::{
    QueueEntryStatus, ScheduleFilter, SchedulePatch, ScheduleStatus,
};
use touchbase_outreach::error::OutreachServiceError;
use touchbase_outreach::usecase::schedule::{
    CancelScheduleUseCase, CreateSchedulesInput, CreateSchedulesUseCase, DEFAULT_PRIORITY,
    ListDeliveryLogsUseCase, ListSchedulesUseCase, UpdateScheduleUseCase,
};

use crate::helpers::{
    MockCampaignRepo, MockDeliveryLogRepo, MockQueueRepo, MockRecipientRepo, MockScheduleRepo,
    test_campaign, test_queue_entry, test_recipient, test_recipient_without_email, test_schedule,
};

fn weekly_rule(occurrences: u32) -> CadenceRule {
    let mut rule = CadenceRule::recurring(CadenceKind::Weekly, "2026-09-07", "09:00", occurrences);
    rule.weekdays = BTreeSet::from([1]); // Mondays
    rule
}

fn create_input(
    campaign_id: Uuid,
    recipient_id: Uuid,
    rule: CadenceRule,
    exclusions: impl IntoIterator<Item = usize>,
) -> CreateSchedulesInput {
    CreateSchedulesInput {
        campaign_id,
        recipient_id,
        rule,
        exclusions: exclusions.into_iter().collect(),
        subject: None,
        content: None,
        priority: DEFAULT_PRIORITY,
    }
}

#[tokio::test]
async fn should_create_one_record_and_one_queue_entry_per_active_instance() {
    let user_id = Uuid::new_v4();
    let campaign = test_campaign(user_id);
    let recipient = test_recipient();

    let schedules = MockScheduleRepo::empty();
    let queue = MockQueueRepo::empty();
    let schedules_handle = schedules.schedules_handle();
    let entries_handle = queue.entries_handle();

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules,
        queue,
        hard_cap: 100,
    };

    let created = uc
        .execute(
            user_id,
            create_input(campaign.id, recipient.id, weekly_rule(4), []),
        )
        .await
        .unwrap();

    assert_eq!(created.len(), 4);
    assert_eq!(schedules_handle.lock().unwrap().len(), 4);

    let entries = entries_handle.lock().unwrap();
    assert_eq!(entries.len(), 4, "one queue entry per record");
    for (schedule, entry) in created.iter().zip(entries.iter()) {
        assert_eq!(entry.schedule_id, schedule.id);
        assert_eq!(entry.priority, DEFAULT_PRIORITY);
        assert_eq!(entry.status, QueueEntryStatus::Pending);
    }

    let first = &created[0];
    assert_eq!(first.status, ScheduleStatus::Scheduled);
    assert_eq!(first.cadence_kind, "weekly");
    assert_eq!(first.recipient_email, "dana@example.com");
    assert_eq!(first.subject, "Checking in, Dana");
    assert_eq!(first.content, "Hi Dana, it has been a while.");
}

#[tokio::test]
async fn should_commit_only_unexcluded_ordinals() {
    let user_id = Uuid::new_v4();
    let campaign = test_campaign(user_id);
    let recipient = test_recipient();
    let rule = weekly_rule(3);

    let expected: Vec<_> = generate(&rule, 100)
        .into_iter()
        .filter(|i| i.ordinal != 1)
        .map(|i| i.date)
        .collect();

    let schedules = MockScheduleRepo::empty();
    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules,
        queue: MockQueueRepo::empty(),
        hard_cap: 100,
    };

    let created = uc
        .execute(user_id, create_input(campaign.id, recipient.id, rule, [1]))
        .await
        .unwrap();

    let committed: Vec<_> = created.iter().map(|s| s.scheduled_at).collect();
    assert_eq!(committed, expected, "ordinals 0 and 2 survive, 1 is dropped");
}

#[tokio::test]
async fn should_reject_unknown_campaign_before_any_write() {
    let user_id = Uuid::new_v4();
    let recipient = test_recipient();

    let schedules = MockScheduleRepo::empty();
    let queue = MockQueueRepo::empty();
    let schedules_handle = schedules.schedules_handle();
    let entries_handle = queue.entries_handle();

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::empty(),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules,
        queue,
        hard_cap: 100,
    };

    let result = uc
        .execute(
            user_id,
            create_input(Uuid::new_v4(), recipient.id, weekly_rule(2), []),
        )
        .await;

    assert!(
        matches!(result, Err(OutreachServiceError::CampaignNotFound)),
        "expected CampaignNotFound, got {result:?}"
    );
    assert!(schedules_handle.lock().unwrap().is_empty());
    assert!(entries_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_campaign_owned_by_someone_else() {
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let campaign = test_campaign(owner);
    let recipient = test_recipient();

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules: MockScheduleRepo::empty(),
        queue: MockQueueRepo::empty(),
        hard_cap: 100,
    };

    let result = uc
        .execute(
            intruder,
            create_input(campaign.id, recipient.id, weekly_rule(2), []),
        )
        .await;

    assert!(matches!(result, Err(OutreachServiceError::CampaignNotFound)));
}

#[tokio::test]
async fn should_reject_unknown_recipient() {
    let user_id = Uuid::new_v4();
    let campaign = test_campaign(user_id);

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::empty(),
        schedules: MockScheduleRepo::empty(),
        queue: MockQueueRepo::empty(),
        hard_cap: 100,
    };

    let result = uc
        .execute(
            user_id,
            create_input(campaign.id, Uuid::new_v4(), weekly_rule(2), []),
        )
        .await;

    assert!(matches!(result, Err(OutreachServiceError::RecipientNotFound)));
}

#[tokio::test]
async fn should_reject_recipient_without_email_before_any_write() {
    let user_id = Uuid::new_v4();
    let campaign = test_campaign(user_id);
    let recipient = test_recipient_without_email();

    let schedules = MockScheduleRepo::empty();
    let schedules_handle = schedules.schedules_handle();

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules,
        queue: MockQueueRepo::empty(),
        hard_cap: 100,
    };

    let result = uc
        .execute(
            user_id,
            create_input(campaign.id, recipient.id, weekly_rule(2), []),
        )
        .await;

    assert!(
        matches!(result, Err(OutreachServiceError::RecipientMissingEmail)),
        "expected RecipientMissingEmail, got {result:?}"
    );
    assert!(
        schedules_handle.lock().unwrap().is_empty(),
        "no rows may be written when validation fails"
    );
}

#[tokio::test]
async fn should_reject_when_every_instance_is_excluded() {
    let user_id = Uuid::new_v4();
    let campaign = test_campaign(user_id);
    let recipient = test_recipient();

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules: MockScheduleRepo::empty(),
        queue: MockQueueRepo::empty(),
        hard_cap: 100,
    };

    let result = uc
        .execute(
            user_id,
            create_input(campaign.id, recipient.id, weekly_rule(2), [0, 1]),
        )
        .await;

    assert!(matches!(result, Err(OutreachServiceError::EmptySeries)));
}

#[tokio::test]
async fn should_keep_schedules_when_enqueue_fails() {
    let user_id = Uuid::new_v4();
    let campaign = test_campaign(user_id);
    let recipient = test_recipient();

    let schedules = MockScheduleRepo::empty();
    let queue = MockQueueRepo::failing();
    let schedules_handle = schedules.schedules_handle();
    let entries_handle = queue.entries_handle();

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules,
        queue,
        hard_cap: 100,
    };

    let created = uc
        .execute(
            user_id,
            create_input(campaign.id, recipient.id, weekly_rule(2), []),
        )
        .await
        .expect("queue failure must not fail schedule creation");

    assert_eq!(created.len(), 2);
    assert_eq!(schedules_handle.lock().unwrap().len(), 2);
    assert!(entries_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_override_campaign_templates_when_provided() {
    let user_id = Uuid::new_v4();
    let campaign = test_campaign(user_id);
    let recipient = test_recipient();

    let uc = CreateSchedulesUseCase {
        campaigns: MockCampaignRepo::new(vec![campaign.clone()]),
        recipients: MockRecipientRepo::new(vec![recipient.clone()]),
        schedules: MockScheduleRepo::empty(),
        queue: MockQueueRepo::empty(),
        hard_cap: 100,
    };

    let mut input = create_input(campaign.id, recipient.id, weekly_rule(1), []);
    input.subject = Some("One-off: {{name}}".to_owned());
    input.content = Some("Custom body".to_owned());

    let created = uc.execute(user_id, input).await.unwrap();
    assert_eq!(created[0].subject, "One-off: Dana");
    assert_eq!(created[0].content, "Custom body");
}

#[tokio::test]
async fn should_list_only_own_schedules_in_scheduled_at_order() {
    let user_id = Uuid::new_v4();
    let other = Uuid::new_v4();
    let mut early = test_schedule(user_id, ScheduleStatus::Scheduled);
    let mut late = test_schedule(user_id, ScheduleStatus::Scheduled);
    early.scheduled_at = late.scheduled_at - chrono::Duration::days(1);
    let foreign = test_schedule(other, ScheduleStatus::Scheduled);

    let uc = ListSchedulesUseCase {
        schedules: MockScheduleRepo::new(vec![late.clone(), foreign, early.clone()]),
    };

    let listed = uc
        .execute(user_id, ScheduleFilter::default(), PageRequest::default())
        .await
        .unwrap();

    let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![early.id, late.id]);
}

#[tokio::test]
async fn should_reject_empty_patch() {
    let user_id = Uuid::new_v4();
    let schedule = test_schedule(user_id, ScheduleStatus::Scheduled);

    let uc = UpdateScheduleUseCase {
        schedules: MockScheduleRepo::new(vec![schedule.clone()]),
    };

    let result = uc
        .execute(schedule.id, user_id, SchedulePatch::default())
        .await;
    assert!(matches!(result, Err(OutreachServiceError::MissingData)));
}

#[tokio::test]
async fn should_update_subject_on_pending_schedule() {
    let user_id = Uuid::new_v4();
    let schedule = test_schedule(user_id, ScheduleStatus::Scheduled);

    let uc = UpdateScheduleUseCase {
        schedules: MockScheduleRepo::new(vec![schedule.clone()]),
    };

    let updated = uc
        .execute(
            schedule.id,
            user_id,
            SchedulePatch {
                subject: Some("Rescheduled hello".to_owned()),
                ..SchedulePatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.subject, "Rescheduled hello");
    assert_eq!(updated.content, schedule.content, "untouched fields survive");
}

#[tokio::test]
async fn should_refuse_to_edit_sent_schedule() {
    let user_id = Uuid::new_v4();
    let schedule = test_schedule(user_id, ScheduleStatus::Sent);

    let uc = UpdateScheduleUseCase {
        schedules: MockScheduleRepo::new(vec![schedule.clone()]),
    };

    let result = uc
        .execute(
            schedule.id,
            user_id,
            SchedulePatch {
                subject: Some("too late".to_owned()),
                ..SchedulePatch::default()
            },
        )
        .await;
    assert!(matches!(result, Err(OutreachServiceError::ScheduleLocked)));
}

#[tokio::test]
async fn should_not_overwrite_schedule_delivered_between_read_and_write() {
    let user_id = Uuid::new_v4();
    let sent = test_schedule(user_id, ScheduleStatus::Sent);
    let schedules = MockScheduleRepo::new(vec![sent.clone()]);
    let stored = schedules.schedules_handle();

    // The pre-check sees the schedule as it was before the worker sent it.
    let mut before_delivery = sent.clone();
    before_delivery.status = ScheduleStatus::Scheduled;
    schedules.serve_stale_read(before_delivery);

    let uc = UpdateScheduleUseCase { schedules };
    let result = uc
        .execute(
            sent.id,
            user_id,
            SchedulePatch {
                subject: Some("rewriting history".to_owned()),
                status: Some(ScheduleStatus::Scheduled),
                ..SchedulePatch::default()
            },
        )
        .await;

    assert!(matches!(result, Err(OutreachServiceError::ScheduleLocked)));
    let stored = stored.lock().unwrap();
    assert_eq!(stored[0].status, ScheduleStatus::Sent);
    assert_eq!(stored[0].subject, sent.subject);
}

#[tokio::test]
async fn should_cancel_pending_schedule_and_its_queue_entry() {
    let user_id = Uuid::new_v4();
    let schedule = test_schedule(user_id, ScheduleStatus::Scheduled);
    let entry = test_queue_entry(schedule.id, 0);

    let schedules = MockScheduleRepo::new(vec![schedule.clone()]);
    let queue = MockQueueRepo::new(vec![entry]);
    let schedules_handle = schedules.schedules_handle();
    let entries_handle = queue.entries_handle();

    let uc = CancelScheduleUseCase { schedules, queue };
    uc.execute(schedule.id, user_id).await.unwrap();

    assert!(schedules_handle.lock().unwrap().is_empty());
    assert!(entries_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_conflict_when_queue_entry_already_claimed() {
    let user_id = Uuid::new_v4();
    let schedule = test_schedule(user_id, ScheduleStatus::Scheduled);
    let mut entry = test_queue_entry(schedule.id, 0);
    entry.status = QueueEntryStatus::Processing;
    entry.claimed_by = Some("outreach-worker".to_owned());

    let schedules = MockScheduleRepo::new(vec![schedule.clone()]);
    let schedules_handle = schedules.schedules_handle();

    let uc = CancelScheduleUseCase {
        schedules,
        queue: MockQueueRepo::new(vec![entry]),
    };

    let result = uc.execute(schedule.id, user_id).await;
    assert!(matches!(result, Err(OutreachServiceError::ScheduleLocked)));
    assert_eq!(
        schedules_handle.lock().unwrap().len(),
        1,
        "schedule must survive a refused cancellation"
    );
}

#[tokio::test]
async fn should_return_not_found_when_cancelling_unknown_schedule() {
    let uc = CancelScheduleUseCase {
        schedules: MockScheduleRepo::empty(),
        queue: MockQueueRepo::empty(),
    };

    let result = uc.execute(Uuid::new_v4(), Uuid::new_v4()).await;
    assert!(matches!(result, Err(OutreachServiceError::ScheduleNotFound)));
}

#[tokio::test]
async fn should_list_delivery_logs_for_owned_schedule_only() {
    let user_id = Uuid::new_v4();
    let schedule = test_schedule(user_id, ScheduleStatus::Sent);

    let logs = MockDeliveryLogRepo::empty();
    logs.logs.lock().unwrap().push(
        touchbase_outreach::domain::types::DeliveryLogEntry {
            id: Uuid::new_v4(),
            schedule_id: schedule.id,
            attempt_number: 1,
            status: ScheduleStatus::Sent,
            attempted_at: chrono::Utc::now(),
            delivered_at: Some(chrono::Utc::now()),
            error_message: None,
        },
    );

    let uc = ListDeliveryLogsUseCase {
        schedules: MockScheduleRepo::new(vec![schedule.clone()]),
        logs: logs.clone(),
    };

    let listed = uc.execute(schedule.id, user_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].attempt_number, 1);

    // A stranger gets 404, not an empty list.
    let result = uc.execute(schedule.id, Uuid::new_v4()).await;
    assert!(matches!(result, Err(OutreachServiceError::ScheduleNotFound)));
}
