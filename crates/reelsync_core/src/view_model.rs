use crate::progress::{Phase, ProgressRecord};

/// Render-ready summary of a job's status, derived entirely from the durable
/// record so any observer surface can reconstruct it after a remount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub phase_label: &'static str,
    pub headline: String,
    pub percent: Option<u8>,
    pub active: bool,
}

pub fn status_view(record: Option<&ProgressRecord>) -> StatusView {
    let Some(record) = record else {
        return StatusView {
            phase_label: Phase::Idle.label(),
            headline: "No job running".to_string(),
            percent: None,
            active: false,
        };
    };

    if let Some(error) = &record.error {
        return StatusView {
            phase_label: record.phase.label(),
            headline: error.clone(),
            percent: None,
            active: false,
        };
    }
    if let Some(message) = &record.message {
        return StatusView {
            phase_label: record.phase.label(),
            headline: message.clone(),
            percent: None,
            active: false,
        };
    }

    let counters = &record.counters;
    let percent = if counters.total > 0 {
        Some(((counters.current.min(counters.total) * 100) / counters.total) as u8)
    } else {
        None
    };
    let headline = if counters.total > 0 {
        format!(
            "{} {} of {} ({} processed, {} skipped, {} removed)",
            capitalize(record.phase.label()),
            counters.current,
            counters.total,
            counters.processed,
            counters.skipped,
            counters.removed,
        )
    } else {
        format!("{}...", capitalize(record.phase.label()))
    };

    StatusView {
        phase_label: record.phase.label(),
        headline,
        percent,
        active: record.processing,
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
