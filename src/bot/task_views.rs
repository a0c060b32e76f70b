//! Text rendering of task queries
//!
//! All renderers produce HTML for Telegram's HTML parse mode; task names
//! and tags are escaped.

use chrono::NaiveDate;
use teloxide::utils::html;

use crate::localization::{t, t_args};
use crate::task_model::{priority_rank, Category, NewTask, TaskRecord};

/// Longest task text echoed back in prompts and lists
const MAX_DISPLAY_CHARS: usize = 200;

/// Size of one outgoing chunk, below Telegram's 4096-character message limit
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Buckets of the grouped list, in display order
const LIST_BUCKETS: [Category; 6] = [
    Category::Today,
    Category::Home,
    Category::Work,
    Category::Global,
    Category::Everyday,
    Category::Personal,
];

/// Active records grouped by tag.
///
/// A record appears under every known bucket it is tagged with; untagged
/// records go to the uncategorized bucket and records tagged only with
/// unknown tags are not shown. Each bucket is ordered High, Med, Low, then
/// records without a priority, keeping the query order otherwise.
pub fn group_active_tasks(records: &[TaskRecord]) -> Vec<(String, Vec<&TaskRecord>)> {
    let active: Vec<&TaskRecord> = records.iter().filter(|r| r.is_active()).collect();

    let mut groups: Vec<(String, Vec<&TaskRecord>)> = LIST_BUCKETS
        .iter()
        .map(|category| {
            let tag = category.to_string();
            let members: Vec<&TaskRecord> =
                active.iter().copied().filter(|r| r.has_tag(&tag)).collect();
            (tag, members)
        })
        .collect();
    groups.push((
        t("list-uncategorized"),
        active.iter().copied().filter(|r| r.tags.is_empty()).collect(),
    ));

    for (_, members) in groups.iter_mut() {
        members.sort_by_key(|r| priority_rank(r.priority.as_deref()));
    }

    groups.retain(|(_, members)| !members.is_empty());
    groups
}

/// Render the grouped list, or `None` when nothing is active
pub fn format_grouped_task_list(records: &[TaskRecord]) -> Option<String> {
    let groups = group_active_tasks(records);
    if groups.is_empty() {
        return None;
    }

    let mut text = format!("{}\n\n", t("list-title"));
    for (bucket, members) in groups {
        text.push_str(&format!("<b>{}</b>:\n", html::escape(&bucket)));
        for record in members {
            text.push_str(&format!("  - {}\n", display_name(record)));
        }
        text.push('\n');
    }

    Some(text.trim_end().to_string())
}

/// Records shown by the today view
#[derive(Debug, Default)]
pub struct TodaySections<'a> {
    /// Tagged Today
    pub today: Vec<&'a TaskRecord>,
    /// Other categories, due on `today`
    pub due_today: Vec<&'a TaskRecord>,
    /// Other categories, High priority
    pub high_priority: Vec<&'a TaskRecord>,
}

impl TodaySections<'_> {
    pub fn is_empty(&self) -> bool {
        self.today.is_empty() && self.due_today.is_empty() && self.high_priority.is_empty()
    }
}

pub fn collect_today_sections(records: &[TaskRecord], today: NaiveDate) -> TodaySections<'_> {
    let today_tag = Category::Today.to_string();
    let mut sections = TodaySections::default();

    for record in records.iter().filter(|r| r.is_active()) {
        if record.has_tag(&today_tag) {
            sections.today.push(record);
            continue;
        }
        if record.due_date == Some(today) {
            sections.due_today.push(record);
        }
        if record.priority.as_deref() == Some("High") {
            sections.high_priority.push(record);
        }
    }

    sections
}

/// Render the today view, or `None` when all sections are empty
pub fn format_today_tasks(records: &[TaskRecord], today: NaiveDate) -> Option<String> {
    let sections = collect_today_sections(records, today);
    if sections.is_empty() {
        return None;
    }

    let mut text = format!("<b>{}</b>\n\n", t("today-title"));

    if !sections.today.is_empty() {
        text.push_str(&format!("<b>{}</b>\n", t("today-category")));
        for (i, record) in sections.today.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", i + 1, display_name(record)));
        }
        text.push('\n');
    }

    for (title, members) in [
        (t("today-due"), &sections.due_today),
        (t("today-high-priority"), &sections.high_priority),
    ] {
        if members.is_empty() {
            continue;
        }
        text.push_str(&format!("<b>{}</b>\n", title));
        for (i, record) in members.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} ({})\n",
                i + 1,
                display_name(record),
                html::escape(&record.tags.join(", "))
            ));
        }
        text.push('\n');
    }

    Some(text.trim_end().to_string())
}

fn display_name(record: &TaskRecord) -> String {
    html::escape(&truncate_for_display(&record.name))
}

/// Split a rendered view into chunks of at most `limit` characters.
///
/// Cuts only at line breaks so HTML tags, which never span lines, stay
/// balanced in every chunk. A single line longer than `limit` becomes its
/// own chunk.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();
        if current_len > 0 && current_len + 1 + line_len > limit {
            chunks.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }
        if current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim_end().to_string());
    }
    chunks
}

/// Shorten a task body for echoing it back to the user
pub fn truncate_for_display(body: &str) -> String {
    if body.chars().count() <= MAX_DISPLAY_CHARS {
        return body.to_string();
    }
    let mut shortened: String = body.chars().take(MAX_DISPLAY_CHARS).collect();
    shortened.push('…');
    shortened
}

/// Acknowledgement listing every field of a committed task
pub fn format_task_added(task: &NewTask) -> String {
    let not_set = t("not-set");
    let pmd = task.weight.map(|w| w.to_string()).unwrap_or_else(|| not_set.clone());
    let priority = task
        .priority
        .map(|p| p.to_string())
        .unwrap_or_else(|| not_set.clone());
    let due = task
        .due_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| not_set.clone());

    t_args(
        "task-added",
        &[
            ("task", &truncate_for_display(&task.name)),
            ("category", &task.category.to_string()),
            ("pmd", &pmd),
            ("priority", &priority),
            ("due", &due),
        ],
    )
}

/// Render the database schema, one `name: type` line per property
pub fn format_structure(properties: &[(String, String)]) -> String {
    let mut text = format!("{}\n\n", t("structure-title"));
    for (name, kind) in properties {
        text.push_str(&format!("{}: {}\n", name, kind));
    }
    text.trim_end().to_string()
}
