//! Plain-text rendering of the dashboard and the weekly task list.

use std::fmt::{self, Display, Write};

use chrono::{DateTime, TimeZone, Utc};

use crate::core::session::LoginRecord;
use crate::core::task::Task;
use crate::core::week::WeekView;

/// Edits shown per task in the list.
const RECENT_EDITS: usize = 3;

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn success(msg: impl Into<String>) -> Self {
        Self::Success(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(msg) => write!(f, "✓ {}", msg),
            Self::Error(msg) => write!(f, "✗ {}", msg),
        }
    }
}

/// `Oct 12, 09:00 AM`
pub fn short_timestamp<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    ts.with_timezone(tz).format("%b %-d, %I:%M %p").to_string()
}

/// `Saturday, October 17, 2026 at 09:05:12 AM`
pub fn long_timestamp<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    ts.with_timezone(tz)
        .format("%A, %B %-d, %Y at %I:%M:%S %p")
        .to_string()
}

pub fn render_task<Tz: TimeZone>(out: &mut String, task: &Task, tz: &Tz)
where
    Tz::Offset: Display,
{
    let _ = writeln!(out, "  • {}  [{}]", task.title, task.id);
    let _ = writeln!(out, "    Created: {}", short_timestamp(&task.created_at, tz));
    let _ = writeln!(out, "    {}", task.description);

    if !task.edit_history.is_empty() {
        let _ = writeln!(out, "    Edit History ({})", task.edit_history.len());
        for edit in task.recent_edits(RECENT_EDITS) {
            let _ = writeln!(
                out,
                "      {} • {}",
                edit.field.display_name(),
                short_timestamp(&edit.timestamp, tz)
            );
        }
    }
}

pub fn render_week<Tz: TimeZone>(tasks: &[Task], tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    if tasks.is_empty() {
        out.push_str("No tasks yet. Add your first task to get started!\n");
        return out;
    }

    let view = WeekView::build(tasks);
    for (day, day_tasks) in &view.days {
        let _ = writeln!(out, "{} ({})", day, day_tasks.len());
        for task in day_tasks {
            render_task(&mut out, task, tz);
        }
        out.push('\n');
    }

    if !view.unrecognized.is_empty() {
        let _ = writeln!(
            out,
            "({} task(s) filed under an unknown day are not shown)",
            view.unrecognized.len()
        );
    }
    out
}

/// Full edit history of one task, oldest first.
pub fn render_history<Tz: TimeZone>(task: &Task, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "{}  [{}]", task.title, task.id);
    let _ = writeln!(out, "Created: {}", long_timestamp(&task.created_at, tz));
    if task.edit_history.is_empty() {
        out.push_str("No edits.\n");
        return out;
    }
    for (i, edit) in task.edit_history.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {:<12} {}",
            i + 1,
            edit.field.display_name(),
            long_timestamp(&edit.timestamp, tz)
        );
    }
    out
}

pub fn render_session<Tz: TimeZone>(username: &str, record: Option<&LoginRecord>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "Welcome, {}", username);
    out.push_str("Manage your weekly tasks efficiently\n");

    let Some(record) = record else {
        return out;
    };

    out.push_str("\nLogin Information\n");
    let _ = writeln!(out, "  Timestamp:         {}", long_timestamp(&record.timestamp, tz));
    let _ = writeln!(out, "  Timezone:          {}", record.device.timezone);

    out.push_str("\nDevice Details\n");
    let _ = writeln!(out, "  Platform:          {}", record.device.platform);
    let _ = writeln!(out, "  Screen Resolution: {}", record.device.screen_resolution);
    let _ = writeln!(out, "  Language:          {}", record.device.language);

    if let Some(geo) = record.geolocation {
        out.push_str("\nGeolocation Data\n");
        let _ = writeln!(out, "  Latitude:          {:.6}", geo.latitude);
        let _ = writeln!(out, "  Longitude:         {:.6}", geo.longitude);
        let _ = writeln!(out, "  Accuracy:          {:.2} meters", geo.accuracy);
    }
    out
}

pub fn render_dashboard<Tz: TimeZone>(
    username: &str,
    record: Option<&LoginRecord>,
    tasks: &[Task],
    tz: &Tz,
) -> String
where
    Tz::Offset: Display,
{
    let mut out = render_session(username, record, tz);
    out.push_str("\nWeekly Tasks\n\n");
    out.push_str(&render_week(tasks, tz));
    out
}
