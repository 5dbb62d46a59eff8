// 服务端渲染的 HTML 页面

use actix_web::http::StatusCode;

use crate::store::ScanRecord;

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ccc;padding:.3rem .5rem;text-align:left}\
input[type=text]{width:70%}";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
{body}
<p><a href="/">New scan</a> | <a href="/scans">History</a></p>
</body>
</html>
"#,
        title = escape_html(title),
        style = STYLE,
        body = body
    )
}

pub fn index_page() -> String {
    layout(
        "ZAP Scanner",
        r#"<h1>ZAP Scanner</h1>
<form method="post" action="/">
<label for="url">Target URL</label>
<input type="text" id="url" name="url" placeholder="http://example.com" required>
<button type="submit">Scan</button>
</form>
<p>The scan runs synchronously and may take a while.</p>"#,
    )
}

/// 扫描完成页
pub struct ResultView<'a> {
    pub scan_id: i64,
    pub target_url: &'a str,
    pub report_name: &'a str,
    pub alert_count: usize,
    pub times_scanned: Option<i64>,
}

pub fn result_page(view: &ResultView<'_>) -> String {
    let body = format!(
        r#"<h1>Scan complete</h1>
<p>Target: <code>{target}</code></p>
<p>Scan #{id} recorded {count} alert(s).{times}</p>
<p><a href="/download/{link}">Download report ({name})</a></p>"#,
        target = escape_html(view.target_url),
        id = view.scan_id,
        count = view.alert_count,
        times = view
            .times_scanned
            .map(|n| format!(" This target has been scanned {} time(s).", n))
            .unwrap_or_default(),
        link = escape_html(view.report_name),
        name = escape_html(view.report_name),
    );
    layout("Scan complete", &body)
}

pub fn history_page(scans: &[ScanRecord]) -> String {
    let mut rows = String::new();
    for scan in scans {
        let report = match &scan.report_name {
            Some(name) => format!(
                r#"<a href="/download/{0}">{0}</a>"#,
                escape_html(name)
            ),
            None => "-".to_string(),
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            scan.id,
            escape_html(&scan.target_url),
            escape_html(scan.scanned_at.as_deref().unwrap_or("-")),
            escape_html(scan.risk.as_deref().unwrap_or("-")),
            scan.alert_count,
            report
        ));
    }

    let body = if rows.is_empty() {
        "<h1>Scan history</h1>\n<p>No scans yet.</p>".to_string()
    } else {
        format!(
            "<h1>Scan history</h1>\n<table>\n<tr><th>#</th><th>Target</th><th>Scanned at</th>\
             <th>Top risk</th><th>Alerts</th><th>Report</th></tr>\n{}</table>",
            rows
        )
    };
    layout("Scan history", &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>",
        escape_html(&title),
        escape_html(message)
    );
    layout(&title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn result_page_links_to_report() {
        let html = result_page(&ResultView {
            scan_id: 7,
            target_url: "http://test.local/?q=<b>",
            report_name: "test.local_-0123456789abcdef.html",
            alert_count: 2,
            times_scanned: Some(3),
        });

        assert!(html.contains(r#"href="/download/test.local_-0123456789abcdef.html""#));
        assert!(html.contains("http://test.local/?q=&lt;b&gt;"));
        assert!(html.contains("Scan #7 recorded 2 alert(s)."));
        assert!(html.contains("scanned 3 time(s)"));
    }

    #[test]
    fn result_page_without_count() {
        let html = result_page(&ResultView {
            scan_id: 8,
            target_url: "http://test.local",
            report_name: "test.local-0123456789abcdef.html",
            alert_count: 0,
            times_scanned: None,
        });

        assert!(html.contains("Scan #8 recorded 0 alert(s).</p>"));
        assert!(!html.contains("time(s)"));
    }

    #[test]
    fn empty_history() {
        assert!(history_page(&[]).contains("No scans yet."));
    }

    #[test]
    fn error_page_shows_status() {
        let html = error_page(StatusCode::BAD_GATEWAY, "engine <down>");
        assert!(html.contains("502 Bad Gateway"));
        assert!(html.contains("engine &lt;down&gt;"));
    }
}
