use std::fmt::Write as _;

use docdesk_core::model::DocumentStatus;
use docdesk_core::{
    AnalysisTab, AnalysisView, AppViewModel, MessageRole, MessageStatus, QueryPhase, Toast,
    ToastLevel,
};

/// Full screen for the current view, minus the progress line.
pub fn render_screen(view: &AppViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Projects ==");
    for row in &view.projects {
        let marker = match (row.has_children, row.expanded) {
            (false, _) => ' ',
            (true, false) => '+',
            (true, true) => '-',
        };
        let count = match row.aggregated_documents {
            Some(total) => format!("{} ({} total)", row.own_documents, total),
            None => row.own_documents.to_string(),
        };
        let _ = writeln!(
            out,
            "{}{} {} [{}] {}",
            "  ".repeat(row.depth),
            marker,
            row.name,
            row.project_id,
            count
        );
    }

    let _ = writeln!(
        out,
        "== Documents ({} of {}..{} selected) ==",
        view.selection.selected, view.selection.min, view.selection.max
    );
    for doc in &view.documents {
        let check = if doc.selected { "[x]" } else { "[ ]" };
        let status = match doc.status {
            DocumentStatus::Ready => "",
            DocumentStatus::Processing => " (processing)",
            DocumentStatus::Error => " (error)",
        };
        let lock = if doc.selectable { "" } else { " -" };
        let _ = writeln!(out, "{check}{lock} {} [{}]{status}", doc.name, doc.id);
    }
    if view.selection.can_confirm {
        let _ = writeln!(out, "(type `confirm` to analyse the selection)");
    }

    if !view.saved_analyses.is_empty() {
        let _ = writeln!(out, "== Recent analyses ==");
        for saved in &view.saved_analyses {
            let _ = writeln!(
                out,
                "{} [{}] {}",
                saved.created_at.format("%Y-%m-%d %H:%M"),
                saved.id,
                saved.draft.document_names.join(", ")
            );
        }
    }

    if let Some(analysis) = &view.analysis {
        render_analysis(&mut out, analysis);
    }
    out
}

fn render_analysis(out: &mut String, analysis: &AnalysisView) {
    let names: Vec<&str> = analysis.documents.iter().map(|doc| doc.name.as_str()).collect();
    let _ = writeln!(out, "== Analysis: {} ==", names.join(" | "));
    let tabs = [
        (AnalysisTab::Chat, "chat".to_string()),
        (
            AnalysisTab::Comparison,
            if analysis.comparison_loading {
                "comparison (loading)".to_string()
            } else {
                "comparison".to_string()
            },
        ),
        (
            AnalysisTab::Patterns,
            format!("patterns ({})", analysis.patterns.len()),
        ),
        (
            AnalysisTab::Contradictions,
            format!("contradictions ({})", analysis.contradictions.len()),
        ),
    ];
    let labels: Vec<String> = tabs
        .iter()
        .map(|(tab, label)| {
            if *tab == analysis.active_tab {
                format!("<{label}>")
            } else {
                label.clone()
            }
        })
        .collect();
    let _ = writeln!(out, "{}", labels.join("  "));

    match analysis.active_tab {
        AnalysisTab::Chat => render_chat(out, analysis),
        AnalysisTab::Comparison => {
            if let Some(error) = &analysis.comparison_error {
                let hint = if error.can_retry {
                    " (type `compare-retry`)"
                } else {
                    ""
                };
                let _ = writeln!(out, "! {}{hint}", error.message);
            }
            if let Some(comparison) = &analysis.comparison {
                let _ = writeln!(out, "Similarities:");
                for line in &comparison.similarities {
                    let _ = writeln!(out, "  + {line}");
                }
                let _ = writeln!(out, "Differences:");
                for line in &comparison.differences {
                    let _ = writeln!(out, "  ~ {line}");
                }
            }
        }
        AnalysisTab::Patterns => {
            for pattern in &analysis.patterns {
                let confidence = pattern
                    .confidence
                    .map(|value| format!(" ({:.0}%)", value * 100.0))
                    .unwrap_or_default();
                let _ = writeln!(out, "* {}{confidence}", pattern.description);
            }
        }
        AnalysisTab::Contradictions => {
            for contradiction in &analysis.contradictions {
                let severity = contradiction
                    .severity
                    .as_deref()
                    .map(|level| format!(" [{level}]"))
                    .unwrap_or_default();
                let _ = writeln!(out, "! {}{severity}", contradiction.description);
            }
        }
    }
}

fn render_chat(out: &mut String, analysis: &AnalysisView) {
    for message in &analysis.messages {
        let who = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "assistant",
        };
        let body = match message.status {
            MessageStatus::Retrieving => "(retrieving relevant passages...)".to_string(),
            MessageStatus::Generating => "(generating answer...)".to_string(),
            MessageStatus::Cancelled => "(cancelled)".to_string(),
            MessageStatus::Error => {
                let retry = if message.can_retry {
                    format!(" (type `retry {}`)", message.id)
                } else {
                    String::new()
                };
                format!(
                    "error: {}{retry}",
                    message.error.as_deref().unwrap_or("unknown error")
                )
            }
            MessageStatus::Idle | MessageStatus::Completed => message.content.clone(),
        };
        let _ = writeln!(out, "#{} {who}: {body}", message.id);
        for citation in &message.citations {
            let page = citation
                .page
                .map(|page| format!(" p.{page}"))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "    > {}{page}: {}",
                citation.document_name, citation.excerpt
            );
        }
    }
}

/// One-line progress indicator while a question is running.
pub fn render_status(view: &AppViewModel) -> Option<String> {
    let analysis = view.analysis.as_ref()?;
    let progress = analysis.progress.as_ref()?;
    let phase = match analysis.phase {
        QueryPhase::Idle => return None,
        QueryPhase::Retrieving => "Retrieving",
        QueryPhase::Generating => "Generating",
    };
    Some(format!(
        "{phase}... {}% (~{}s left)",
        progress.percent,
        progress.remaining_ms.div_ceil(1000)
    ))
}

pub fn render_toast(toast: &Toast) -> String {
    match toast.level {
        ToastLevel::Info => format!("[info] {}", toast.text),
        ToastLevel::Error => format!("[error] {}", toast.text),
    }
}
