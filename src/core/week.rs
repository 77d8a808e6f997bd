use super::day::Day;
use super::task::Task;

/// Tasks partitioned by weekday for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekView {
    /// Non-empty buckets in Monday→Sunday order.
    pub days: Vec<(Day, Vec<Task>)>,
    /// Tasks whose stored day matches no weekday label. Not displayed.
    pub unrecognized: Vec<Task>,
}

impl WeekView {
    pub fn build(tasks: &[Task]) -> Self {
        let mut buckets: [Vec<Task>; 7] = Default::default();
        let mut unrecognized = Vec::new();

        for task in tasks {
            match task.weekday() {
                Some(day) => buckets[day as usize].push(task.clone()),
                None => unrecognized.push(task.clone()),
            }
        }

        let days = Day::ALL
            .into_iter()
            .zip(buckets)
            .filter(|(_, tasks)| !tasks.is_empty())
            .collect();

        Self { days, unrecognized }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn tasks_for(&self, day: Day) -> &[Task] {
        self.days
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, tasks)| tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.days.iter().map(|(_, tasks)| tasks.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::TaskDraft;
    use chrono::Utc;

    fn task(title: &str, day: &str) -> Task {
        let draft = TaskDraft::new(title, "desc", Some(Day::Monday)).validate().unwrap();
        let mut t = Task::new(draft, Utc::now());
        t.day = day.to_string();
        t
    }

    #[test]
    fn two_monday_one_friday() {
        let tasks = vec![task("a", "Monday"), task("b", "Friday"), task("c", "Monday")];
        let view = WeekView::build(&tasks);
        assert_eq!(view.days.len(), 2);
        assert_eq!(view.days[0].0, Day::Monday);
        assert_eq!(view.days[1].0, Day::Friday);
        assert_eq!(view.days[0].1.len(), 2);
        assert_eq!(view.days[1].1.len(), 1);
    }

    #[test]
    fn buckets_keep_insertion_order() {
        let tasks = vec![task("first", "Sunday"), task("second", "Sunday"), task("third", "Sunday")];
        let view = WeekView::build(&tasks);
        let titles: Vec<_> = view.tasks_for(Day::Sunday).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn unrecognized_days_are_set_aside() {
        let tasks = vec![task("a", "Monday"), task("b", "Someday"), task("c", "monday")];
        let view = WeekView::build(&tasks);
        assert_eq!(view.len(), 1);
        assert_eq!(view.unrecognized.len(), 2);
    }

    #[test]
    fn grouping_is_exhaustive_and_idempotent() {
        let tasks = vec![
            task("a", "Wednesday"),
            task("b", "Holiday"),
            task("c", "Monday"),
            task("d", "Wednesday"),
            task("e", "Saturday"),
        ];
        let view = WeekView::build(&tasks);
        assert_eq!(view.len() + view.unrecognized.len(), tasks.len());
        for t in &tasks {
            let in_bucket = view.days.iter().any(|(_, ts)| ts.contains(t));
            assert!(in_bucket ^ view.unrecognized.contains(t));
        }

        let flattened: Vec<Task> = view
            .days
            .iter()
            .flat_map(|(_, ts)| ts.iter().cloned())
            .chain(view.unrecognized.iter().cloned())
            .collect();
        assert_eq!(WeekView::build(&flattened), view);
    }

    #[test]
    fn empty_list_has_no_buckets() {
        let view = WeekView::build(&[]);
        assert!(view.is_empty());
        assert!(view.tasks_for(Day::Monday).is_empty());
    }
}
