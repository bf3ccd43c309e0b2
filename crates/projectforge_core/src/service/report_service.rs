//! Dashboard aggregation service.
//!
//! # Responsibility
//! - Turn report query rows into the dashboard's derived views.
//!
//! # Invariants
//! - Member progress sums to the total task count across all buckets.
//! - A bucket with zero tasks reports 0% completion.
//! - Reminder triage order: open before followed up; among open ones
//!   today, then overdue, then future; then by date ascending.

use crate::model::task::Task;
use crate::model::EntityId;
use crate::repo::entity_repo::{LookupItem, RepoResult};
use crate::repo::report_repo::{
    DateSpan, ReminderView, ReportRepository, StatusCount, TaskFilter, TimelineItem,
    UNASSIGNED_LABEL,
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Days past today covered by the fallback display window.
const FALLBACK_WINDOW_DAYS: i64 = 30;

/// Task completion rollup for one assignee bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberProgress {
    /// `None` for the unassigned bucket.
    pub member_id: Option<EntityId>,
    pub name: String,
    pub total: i64,
    pub completed: i64,
}

impl MemberProgress {
    pub fn percent_completed(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Use-case service for dashboard views.
pub struct ReportService<R: ReportRepository> {
    repo: R,
}

impl<R: ReportRepository> ReportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn timeline_extent(&self) -> RepoResult<Option<DateSpan>> {
        self.repo.timeline_extent()
    }

    /// Stored timeline extent, or [`fallback_window`] when nothing is dated.
    pub fn display_window(&self, today: NaiveDate) -> RepoResult<DateSpan> {
        Ok(self
            .repo
            .timeline_extent()?
            .unwrap_or_else(|| fallback_window(today)))
    }

    pub fn timeline(&self, window: DateSpan) -> RepoResult<Vec<TimelineItem>> {
        self.repo.timeline_items(window)
    }

    pub fn member_progress(&self) -> RepoResult<Vec<MemberProgress>> {
        let members = self.repo.members()?;
        let counts = self.repo.task_status_counts()?;
        Ok(build_member_progress(&members, &counts))
    }

    pub fn triaged_reminders(&self, today: NaiveDate) -> RepoResult<Vec<ReminderView>> {
        let mut reminders = self.repo.reminders()?;
        triage_reminders(&mut reminders, today);
        Ok(reminders)
    }

    /// Open reminders due today or earlier, in triage order.
    pub fn pending_reminders(&self, today: NaiveDate) -> RepoResult<Vec<ReminderView>> {
        let mut reminders = self.triaged_reminders(today)?;
        reminders.retain(|reminder| !reminder.followed_up && reminder.reminder_date <= today);
        Ok(reminders)
    }

    pub fn filter_tasks(&self, filter: &TaskFilter) -> RepoResult<Vec<Task>> {
        self.repo.filter_tasks(filter)
    }
}

/// First day of `today`'s month through `today` + 30 days.
pub fn fallback_window(today: NaiveDate) -> DateSpan {
    DateSpan {
        start: today.with_day(1).unwrap_or(today),
        end: today + Duration::days(FALLBACK_WINDOW_DAYS),
    }
}

/// Rolls status counts up per member, members by id then `Unassigned`.
///
/// Counts for an assignee id missing from `members` land in their own
/// bucket so totals still add up.
pub fn build_member_progress(members: &[LookupItem], counts: &[StatusCount]) -> Vec<MemberProgress> {
    let mut by_member: BTreeMap<EntityId, MemberProgress> = members
        .iter()
        .map(|member| {
            (
                member.id,
                MemberProgress {
                    member_id: Some(member.id),
                    name: member.name.clone(),
                    total: 0,
                    completed: 0,
                },
            )
        })
        .collect();
    let mut unassigned = MemberProgress {
        member_id: None,
        name: UNASSIGNED_LABEL.to_string(),
        total: 0,
        completed: 0,
    };

    for count in counts {
        let bucket = match count.assigned_to {
            Some(member_id) => by_member.entry(member_id).or_insert_with(|| MemberProgress {
                member_id: Some(member_id),
                name: format!("Unknown member {member_id}"),
                total: 0,
                completed: 0,
            }),
            None => &mut unassigned,
        };
        bucket.total += count.count;
        if count.status.is_completed() {
            bucket.completed += count.count;
        }
    }

    let mut progress: Vec<MemberProgress> = by_member.into_values().collect();
    progress.push(unassigned);
    progress
}

/// Sorts reminders into triage order for `today`.
pub fn triage_reminders(reminders: &mut [ReminderView], today: NaiveDate) {
    reminders.sort_by_key(|reminder| {
        (
            reminder.followed_up,
            urgency_tier(reminder, today),
            reminder.reminder_date,
            reminder.id,
        )
    });
}

fn urgency_tier(reminder: &ReminderView, today: NaiveDate) -> u8 {
    if reminder.followed_up {
        return 0;
    }
    if reminder.reminder_date == today {
        0
    } else if reminder.reminder_date < today {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::{build_member_progress, fallback_window, triage_reminders, MemberProgress};
    use crate::model::task::TaskStatus;
    use crate::repo::entity_repo::LookupItem;
    use crate::repo::report_repo::{ReminderView, StatusCount};
    use chrono::{Duration, NaiveDate};

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn reminder(id: i64, date: NaiveDate, followed_up: bool) -> ReminderView {
        ReminderView {
            id,
            task_id: 1,
            task_name: "Ship".to_string(),
            reminder_date: date,
            note: String::new(),
            followed_up,
        }
    }

    fn count(assigned_to: Option<i64>, status: TaskStatus, count: i64) -> StatusCount {
        StatusCount {
            assigned_to,
            status,
            count,
        }
    }

    #[test]
    fn triage_puts_today_then_overdue_then_future_then_followed_up() {
        let today = day(2024, 5, 15);
        let mut reminders = vec![
            reminder(1, today - Duration::days(1), true),
            reminder(2, today, false),
            reminder(3, today - Duration::days(2), false),
            reminder(4, today + Duration::days(3), false),
        ];
        triage_reminders(&mut reminders, today);
        let order: Vec<i64> = reminders.iter().map(|item| item.id).collect();
        assert_eq!(order, vec![2, 3, 4, 1]);
    }

    #[test]
    fn triage_orders_followed_up_by_date_only() {
        let today = day(2024, 5, 15);
        let mut reminders = vec![
            reminder(1, today + Duration::days(1), true),
            reminder(2, today, true),
            reminder(3, today - Duration::days(4), true),
        ];
        triage_reminders(&mut reminders, today);
        let order: Vec<i64> = reminders.iter().map(|item| item.id).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn progress_buckets_sum_to_task_total() {
        let members = vec![
            LookupItem {
                id: 1,
                name: "Ada Lovelace".to_string(),
            },
            LookupItem {
                id: 2,
                name: "Idle Person".to_string(),
            },
        ];
        let counts = vec![
            count(None, TaskStatus::NotStarted, 2),
            count(Some(1), TaskStatus::Completed, 3),
            count(Some(1), TaskStatus::Blocked, 1),
            count(Some(9), TaskStatus::Completed, 1),
        ];
        let progress = build_member_progress(&members, &counts);

        let total: i64 = progress.iter().map(|bucket| bucket.total).sum();
        assert_eq!(total, 7);
        assert_eq!(progress.len(), 4);
        assert_eq!(progress[0].percent_completed(), 75.0);
        assert_eq!(progress[1].total, 0);
        assert_eq!(progress[1].percent_completed(), 0.0);
        assert_eq!(progress[2].name, "Unknown member 9");
        assert_eq!(
            progress[3],
            MemberProgress {
                member_id: None,
                name: "Unassigned".to_string(),
                total: 2,
                completed: 0,
            }
        );
    }

    #[test]
    fn fallback_window_spans_month_start_to_thirty_days_out() {
        let window = fallback_window(day(2024, 2, 20));
        assert_eq!(window.start, day(2024, 2, 1));
        assert_eq!(window.end, day(2024, 3, 21));
    }
}
