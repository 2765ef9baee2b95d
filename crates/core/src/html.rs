//! HTML rendering of a results map.
//!
//! One block per logic file, coloured by the noisy count as a share of the total number of
//! subjects: green up to 1%, yellow up to 10%, red above.

use crate::runner::ResultsMap;
use crate::{QcError, QcResult};
use std::path::Path;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
h1 { color: #333; margin-bottom: 5px; }
h2 { color: #555; margin-top: 0; margin-bottom: 20px; font-weight: normal; }
.qc-block { border-radius: 5px; margin-bottom: 15px; padding: 15px; background-color: #eee; }
.description { font-style: italic; color: #555; margin-bottom: 10px; }
.header { font-weight: bold; font-size: 1.1em; margin-bottom: 5px; }
";

fn colour_for(percentage: f64) -> &'static str {
    if percentage > 10.0 {
        "#ffcccc"
    } else if percentage > 1.0 {
        "#fff2cc"
    } else {
        "#ccffcc"
    }
}

fn percentage(count: u64, total_subjects: u64) -> f64 {
    if total_subjects == 0 {
        0.0
    } else {
        count as f64 / total_subjects as f64 * 100.0
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders `results` as a standalone HTML page.
///
/// `total_subjects` is the denominator for the percentages, `epsilon_spent` is shown in the
/// page header.
pub fn render_html_report(results: &ResultsMap, total_subjects: u64, epsilon_spent: f64) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\" />\n");
    html.push_str("<title>Data Quality Check Report</title>\n");
    html.push_str(&format!("<style>\n{STYLE}</style>\n</head>\n<body>\n"));
    html.push_str("<h1>Data Quality Check Report</h1>\n");
    html.push_str(&format!(
        "<h2>Total Subjects: {total_subjects} | Total Epsilon Used: {epsilon_spent:.2}</h2>\n"
    ));

    for (name, record) in results {
        let share = percentage(record.count, total_subjects);
        let share_dp = percentage(record.count_with_dp, total_subjects);

        html.push_str(&format!(
            "<div class=\"qc-block\" style=\"background-color:{};\">\n",
            colour_for(share_dp)
        ));
        html.push_str(&format!("<div class=\"header\">{}</div>\n", escape(name)));
        if let Some(description) = &record.description {
            html.push_str(&format!(
                "<div class=\"description\">{}</div>\n",
                escape(description)
            ));
        }
        html.push_str(&format!(
            "<div>Count: {} ({share:.2}%)</div>\n",
            record.count
        ));
        html.push_str(&format!(
            "<div>Count with Differential Privacy: {} ({share_dp:.2}%)</div>\n",
            record.count_with_dp
        ));
        html.push_str(&format!(
            "<div>Epsilon Used: {}</div>\n</div>\n",
            record.epsilon_used
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Writes a rendered report to `path`.
pub fn write_html_report(path: &Path, html: &str) -> QcResult<()> {
    std::fs::write(path, html).map_err(|source| QcError::ReportWrite {
        path: path.to_path_buf(),
        source,
    })
}
