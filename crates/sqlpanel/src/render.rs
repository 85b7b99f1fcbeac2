//! HTML fragments for the panel body and the detail views.

use crate::panel::SqlPanel;
use crate::views::QueryReport;
use serde_json::Value;
use std::fmt::Write;

/// Simple HTML escape
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "<em>NULL</em>".to_string(),
        Value::String(s) => escape(s),
        other => escape(&other.to_string()),
    }
}

pub(crate) fn panel(panel: &SqlPanel) -> String {
    let rows = panel.process_response();
    if rows.is_empty() {
        return "<div class=\"sqlpanel\"><p>No queries were recorded for this request.</p></div>"
            .to_string();
    }

    let mut body = String::new();
    for row in &rows {
        let mut actions = Vec::new();
        if row.engine_available {
            if let Some(url) = &row.select_url {
                actions.push(format!(
                    "<a class=\"sqlpanel-select\" href=\"{}\">SELECT</a>",
                    escape(url)
                ));
            }
            if let Some(url) = &row.explain_url {
                actions.push(format!(
                    "<a class=\"sqlpanel-explain\" href=\"{}\">EXPLAIN</a>",
                    escape(url)
                ));
            }
        }
        let class = if row.is_slow { " class=\"sqlpanel-slow\"" } else { "" };
        let _ = write!(
            body,
            "<tr{class}><td>{}</td><td>{:.2}</td><td>{}</td><td><pre title=\"{}\">{}</pre></td><td>{}</td></tr>",
            row.query_index,
            row.duration_ms,
            actions.join(" "),
            escape(&row.raw_sql),
            escape(&row.sql),
            escape(&row.params),
        );
    }

    format!(
        "<div class=\"sqlpanel\"><p><strong>{}</strong> in {:.2} ms</p>\
         <table><thead><tr><th>#</th><th>Time (ms)</th><th>Action</th><th>Query</th><th>Params</th></tr></thead>\
         <tbody>{body}</tbody></table></div>",
        rows.len(),
        panel.total_duration().as_secs_f64() * 1000.0,
    )
}

pub(crate) fn report(title: &str, report: &QueryReport) -> String {
    let headers: String = report
        .result
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape(c)))
        .collect();

    let mut body = String::new();
    for row in &report.result.rows {
        body.push_str("<tr>");
        for value in row {
            let _ = write!(body, "<td>{}</td>", cell(value));
        }
        body.push_str("</tr>");
    }

    let note = if report.truncated {
        format!(
            "<p class=\"sqlpanel-note\">Showing the first {} rows.</p>",
            report.result.rows.len()
        )
    } else {
        String::new()
    };

    format!(
        "<div class=\"sqlpanel-detail\"><h3>{}</h3><pre>{}</pre>\
         <p>Executed in {:.2} ms (replayed in {:.2} ms) on {}</p>{note}\
         <table><thead><tr>{headers}</tr></thead><tbody>{body}</tbody></table></div>",
        escape(title),
        escape(&report.formatted_sql),
        report.duration.as_secs_f64() * 1000.0,
        report.replay_duration.as_secs_f64() * 1000.0,
        escape(report.dialect.name()),
    )
}
