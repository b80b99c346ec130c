//! Scheduler
//!
//! Places weekly meetings and generated tasks onto gap days within working
//! hours. Untimed tasks are spread in blocks of at most two hours with a
//! short break between blocks, never past the end of the working day and
//! never beyond the daily capacity.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use timefill_ai::GeneratedTask;

use crate::config::ScheduleSettings;

const MAX_BLOCK_MINUTES: i64 = 120;
const MIN_BLOCK_MINUTES: i64 = 30;
const BREAK_MINUTES: i64 = 15;

const MEETING_PROJECT: &str = "Meetings";
const MEETING_TASK: &str = "Team Meeting";

/// Scheduler output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Sorted by (date, start)
    pub tasks: Vec<GeneratedTask>,
    /// Tasks that did not fit into any gap day
    pub unscheduled: Vec<GeneratedTask>,
}

/// Occupied intervals and used minutes of one day
#[derive(Debug, Default)]
struct DayPlan {
    busy: Vec<(NaiveTime, NaiveTime)>,
    used_minutes: i64,
}

impl DayPlan {
    fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> Option<NaiveTime> {
        self.busy
            .iter()
            .filter(|(s, e)| *s < end && start < *e)
            .map(|(_, e)| *e)
            .max()
    }

    fn reserve(&mut self, start: NaiveTime, end: NaiveTime) {
        self.busy.push((start, end));
        self.busy.sort();
        self.used_minutes += (end - start).num_minutes();
    }
}

pub struct Scheduler<'a> {
    settings: &'a ScheduleSettings,
}

impl<'a> Scheduler<'a> {
    #[must_use]
    pub fn new(settings: &'a ScheduleSettings) -> Self {
        Self { settings }
    }

    fn capacity_minutes(&self) -> i64 {
        i64::from(self.settings.daily_hours) * 60
    }

    /// One task per configured meeting and ISO week, on that weekday when it is a gap day
    #[must_use]
    pub fn weekly_meetings(&self, gap_days: &[NaiveDate]) -> Vec<GeneratedTask> {
        let mut weeks: BTreeMap<(i32, u32), Vec<NaiveDate>> = BTreeMap::new();
        for day in gap_days {
            let week = day.iso_week();
            weeks.entry((week.year(), week.week())).or_default().push(*day);
        }

        let mut meetings = Vec::new();
        for days in weeks.values() {
            for meeting in &self.settings.meetings {
                let Some(day) = days.iter().find(|d| d.weekday() == meeting.weekday) else {
                    continue;
                };
                let duration = Duration::minutes(i64::from(meeting.duration_minutes));
                if add_time(meeting.start, duration).is_none() {
                    log::warn!("Meeting '{}' runs past midnight, skipped", meeting.title);
                    continue;
                }

                let mut task = GeneratedTask::new(*day, meeting.title.clone(), duration);
                task.start = Some(meeting.start);
                task.project_name = MEETING_PROJECT.to_string();
                task.task_name = MEETING_TASK.to_string();
                task.billable = false;
                task.is_meeting = true;
                meetings.push(task);
            }
        }
        meetings
    }

    /// Place meetings and `tasks` onto `gap_days`
    #[must_use]
    pub fn schedule(&self, tasks: Vec<GeneratedTask>, gap_days: &[NaiveDate]) -> Schedule {
        let mut gap_days: Vec<NaiveDate> = gap_days.to_vec();
        gap_days.sort_unstable();
        gap_days.dedup();

        let mut plans: BTreeMap<NaiveDate, DayPlan> =
            gap_days.iter().map(|d| (*d, DayPlan::default())).collect();
        let mut schedule = Schedule::default();

        for meeting in self.weekly_meetings(&gap_days) {
            if let (Some(start), Some(end), Some(plan)) = (
                meeting.start,
                meeting.start.and_then(|s| add_time(s, meeting.estimated)),
                plans.get_mut(&meeting.target_day),
            ) {
                plan.reserve(start, end);
            }
            schedule.tasks.push(meeting);
        }

        let mut untimed = Vec::new();
        for task in tasks {
            match self.place_timed(task, &mut plans) {
                Ok(placed) => schedule.tasks.push(placed),
                Err(task) => untimed.push(task),
            }
        }

        let mut day_idx = 0;
        for mut task in untimed {
            let placed = gap_days[day_idx.min(gap_days.len())..]
                .iter()
                .enumerate()
                .find_map(|(offset, day)| {
                    let plan = plans.get_mut(day)?;
                    let (start, block) = self.find_slot(plan, task.estimated)?;
                    Some((offset, *day, start, block))
                });

            match placed {
                Some((offset, day, start, block)) => {
                    day_idx += offset;
                    if block < task.estimated {
                        log::debug!(
                            "Task '{}' trimmed to {} minutes",
                            task.description,
                            block.num_minutes()
                        );
                    }
                    task.target_day = day;
                    task.start = Some(start);
                    task.estimated = block;
                    schedule.tasks.push(task);
                }
                None => {
                    log::warn!("No room left for task '{}'", task.description);
                    task.start = None;
                    schedule.unscheduled.push(task);
                }
            }
        }

        schedule
            .tasks
            .sort_by_key(|task| (task.target_day, task.start));
        log::info!(
            "Scheduled {} task(s) over {} day(s), {} unscheduled",
            schedule.tasks.len(),
            gap_days.len(),
            schedule.unscheduled.len()
        );
        schedule
    }

    /// Keep a task's own time when it lands on a gap day and fits; `Err` hands it to spreading
    fn place_timed(
        &self,
        mut task: GeneratedTask,
        plans: &mut BTreeMap<NaiveDate, DayPlan>,
    ) -> Result<GeneratedTask, GeneratedTask> {
        let Some(start) = task.start else {
            return Err(task);
        };
        let Some(plan) = plans.get_mut(&task.target_day) else {
            task.start = None;
            return Err(task);
        };

        let (day_start, day_end) = (self.settings.day_start, self.settings.day_end);
        let length = task.estimated.min(day_end - day_start);
        let start = start.max(day_start);
        let start = match add_time(start, length) {
            Some(end) if end <= day_end => start,
            _ => day_end - length,
        };
        let end = start + length;

        if plan.overlaps(start, end).is_some()
            || plan.used_minutes + length.num_minutes() > self.capacity_minutes()
        {
            task.start = None;
            return Err(task);
        }

        plan.reserve(start, end);
        task.start = Some(start);
        task.estimated = length;
        Ok(task)
    }

    /// Earliest start and block length for a task on one day
    fn find_slot(&self, plan: &mut DayPlan, estimated: Duration) -> Option<(NaiveTime, Duration)> {
        let remaining = self.capacity_minutes() - plan.used_minutes;
        let wanted = estimated.num_minutes().max(1);
        let block_minutes = wanted.min(MAX_BLOCK_MINUTES).min(remaining);
        if block_minutes < wanted.min(MIN_BLOCK_MINUTES) {
            return None;
        }
        let block = Duration::minutes(block_minutes);

        let mut candidate = self.settings.day_start;
        loop {
            let end = add_time(candidate, block).filter(|end| *end <= self.settings.day_end)?;
            match plan.overlaps(candidate, end) {
                Some(busy_end) => {
                    candidate = add_time(busy_end, Duration::minutes(BREAK_MINUTES))?;
                }
                None => {
                    plan.reserve(candidate, end);
                    return Some((candidate, block));
                }
            }
        }
    }
}

/// `time + duration` without wrapping past midnight
fn add_time(time: NaiveTime, duration: Duration) -> Option<NaiveTime> {
    let (end, overflow) = time.overflowing_add_signed(duration);
    (overflow == 0).then_some(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeetingSettings;
    use chrono::Weekday;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn task(day: u32, description: &str, minutes: i64) -> GeneratedTask {
        GeneratedTask::new(date(day), description.to_string(), Duration::minutes(minutes))
    }

    fn standup() -> MeetingSettings {
        MeetingSettings {
            weekday: Weekday::Tue,
            start: time(10, 0),
            duration_minutes: 40,
            title: "Weekly Team Standup".to_string(),
        }
    }

    #[test]
    fn test_weekly_meetings_once_per_week_on_gap_days() {
        let settings = ScheduleSettings {
            meetings: vec![standup()],
            ..ScheduleSettings::default()
        };
        // Tue 4th and Tue 11th are gaps, Tue 18th is not
        let gaps = [date(3), date(4), date(11), date(12), date(17)];

        let meetings = Scheduler::new(&settings).weekly_meetings(&gaps);
        let days: Vec<NaiveDate> = meetings.iter().map(|m| m.target_day).collect();
        assert_eq!(days, vec![date(4), date(11)]);

        let meeting = &meetings[0];
        assert!(meeting.is_meeting);
        assert!(!meeting.billable);
        assert_eq!(meeting.start, Some(time(10, 0)));
        assert_eq!(meeting.end(), Some(time(10, 40)));
        assert_eq!(meeting.project_name, "Meetings");
    }

    #[test]
    fn test_spread_blocks_with_breaks() {
        let settings = ScheduleSettings::default();
        let tasks = vec![task(3, "A", 180), task(3, "B", 60), task(3, "C", 60)];

        let schedule = Scheduler::new(&settings).schedule(tasks, &[date(3)]);
        assert!(schedule.unscheduled.is_empty());

        let slots: Vec<(NaiveTime, Option<NaiveTime>)> = schedule
            .tasks
            .iter()
            .map(|t| (t.start.unwrap(), t.end()))
            .collect();
        assert_eq!(
            slots,
            vec![
                (time(9, 0), Some(time(11, 0))),
                (time(11, 15), Some(time(12, 15))),
                (time(12, 30), Some(time(13, 30))),
            ]
        );
    }

    #[test]
    fn test_spread_respects_capacity_and_day_end() {
        let settings = ScheduleSettings::default();
        let tasks: Vec<GeneratedTask> = (0..6).map(|i| task(3, &format!("T{i}"), 120)).collect();

        let schedule = Scheduler::new(&settings).schedule(tasks, &[date(3), date(4)]);

        for day in [date(3), date(4)] {
            let minutes: i64 = schedule
                .tasks
                .iter()
                .filter(|t| t.target_day == day)
                .map(|t| t.estimated.num_minutes())
                .sum();
            assert!(minutes <= 8 * 60, "{day} has {minutes} minutes");
        }
        assert!(schedule
            .tasks
            .iter()
            .all(|t| t.end().unwrap() <= time(18, 0)));
        assert_eq!(schedule.tasks.len() + schedule.unscheduled.len(), 6);
        // 09:00-11:00, 11:15-13:15, 13:30-15:30, 15:45-17:45 fit on each day
        assert_eq!(schedule.tasks.len(), 6);
    }

    #[test]
    fn test_unscheduled_when_no_room() {
        let settings = ScheduleSettings::default();
        let tasks: Vec<GeneratedTask> = (0..5).map(|i| task(3, &format!("T{i}"), 120)).collect();

        let schedule = Scheduler::new(&settings).schedule(tasks, &[date(3)]);
        assert_eq!(schedule.tasks.len(), 4);
        assert_eq!(schedule.unscheduled.len(), 1);
        assert_eq!(schedule.unscheduled[0].description, "T4");
    }

    #[test]
    fn test_spread_skips_meetings_and_counts_them() {
        let settings = ScheduleSettings {
            meetings: vec![standup()],
            ..ScheduleSettings::default()
        };
        let tasks = vec![task(4, "Coding", 120), task(4, "Review", 60)];

        let schedule = Scheduler::new(&settings).schedule(tasks, &[date(4)]);
        let order: Vec<(&str, NaiveTime)> = schedule
            .tasks
            .iter()
            .map(|t| (t.description.as_str(), t.start.unwrap()))
            .collect();

        // Coding would overlap the meeting at 09:00 and follows it; Review fits before it
        assert_eq!(
            order,
            vec![
                ("Review", time(9, 0)),
                ("Weekly Team Standup", time(10, 0)),
                ("Coding", time(10, 55)),
            ]
        );
    }

    #[test]
    fn test_timed_tasks_clamped_to_working_hours() {
        let settings = ScheduleSettings::default();
        let mut early = task(3, "Early", 60);
        early.start = Some(time(7, 0));
        let mut late = task(3, "Late", 60);
        late.start = Some(time(17, 30));

        let schedule = Scheduler::new(&settings).schedule(vec![late, early], &[date(3)]);
        let slots: Vec<(&str, NaiveTime)> = schedule
            .tasks
            .iter()
            .map(|t| (t.description.as_str(), t.start.unwrap()))
            .collect();
        assert_eq!(slots, vec![("Early", time(9, 0)), ("Late", time(17, 0))]);
    }

    #[test]
    fn test_timed_task_on_non_gap_day_is_respread() {
        let settings = ScheduleSettings::default();
        let mut task = task(5, "Moved", 60);
        task.start = Some(time(9, 0));

        let schedule = Scheduler::new(&settings).schedule(vec![task], &[date(3)]);
        assert_eq!(schedule.tasks[0].target_day, date(3));
        assert_eq!(schedule.tasks[0].start, Some(time(9, 0)));
    }
}
