// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Static HTML reports.
//!
//! A [`Page`] is built up section by section and then written as
//! `index.html`. Styling comes from Bootstrap's CDN stylesheet; the page
//! needs no scripts.


use std::path::{Path, PathBuf};

use hifitime::Epoch;
use log::info;
use thiserror::Error;

const BOOTSTRAP_CSS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";

/// Escape text for inclusion in HTML.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A GPS time as a UTC date and time, e.g. "2015-09-14 09:50:45 UTC".
pub fn gps_to_utc(gps: f64) -> String {
    let (y, m, d, h, min, s, _) = Epoch::from_gpst_seconds(gps).to_gregorian_utc();
    format!("{y:04}-{m:02}-{d:02} {h:02}:{min:02}:{s:02} UTC")
}

/// A GPS time followed by its UTC equivalent.
pub fn gps_with_utc(gps: f64) -> String {
    format!("{gps} ({})", gps_to_utc(gps))
}

/// A table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Link { text: String, href: String },
}

impl Cell {
    pub fn link<S: Into<String>, T: Into<String>>(text: S, href: T) -> Self {
        Cell::Link {
            text: text.into(),
            href: href.into(),
        }
    }

    fn to_html(&self) -> String {
        match self {
            Cell::Text(t) => escape(t),
            Cell::Link { text, href } => {
                format!("<a href=\"{}\">{}</a>", escape(href), escape(text))
            }
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// An HTML page under construction.
#[derive(Debug, Clone, Default)]
pub struct Page {
    title: String,
    body: String,
}

impl Page {
    fn line(&mut self, html: String) {
        self.body.push_str(&html);
        self.body.push('\n');
    }

    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
        }
    }

    /// A heading; `level` is clamped to 1–6.
    pub fn heading(&mut self, level: u8, text: &str) -> &mut Self {
        let level = level.clamp(1, 6);
        self.line(format!("<h{level}>{}</h{level}>", escape(text)));
        self
    }

    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        self.line(format!("<p>{}</p>", escape(text)));
        self
    }

    /// A highlighted note, e.g. for a result that needs attention.
    pub fn alert(&mut self, kind: &str, text: &str) -> &mut Self {
        self.line(format!(
            "<div class=\"alert alert-{}\" role=\"alert\">{}</div>",
            escape(kind),
            escape(text),
        ));
        self
    }

    /// Insert HTML as-is.
    pub fn raw(&mut self, html: &str) -> &mut Self {
        self.body.push_str(html);
        self.body.push('\n');
        self
    }

    /// A two-column list of named values.
    pub fn parameters<K: AsRef<str>, V: AsRef<str>>(&mut self, params: &[(K, V)]) -> &mut Self {
        self.body.push_str("<dl class=\"row\">\n");
        for (k, v) in params {
            self.line(format!(
                "<dt class=\"col-sm-3\">{}</dt><dd class=\"col-sm-9\">{}</dd>",
                escape(k.as_ref()),
                escape(v.as_ref()),
            ));
        }
        self.body.push_str("</dl>\n");
        self
    }

    pub fn table(&mut self, header: &[&str], rows: &[Vec<Cell>]) -> &mut Self {
        self.body
            .push_str("<table class=\"table table-sm table-striped table-hover\">\n<thead><tr>");
        for h in header {
            self.body.push_str(&format!("<th scope=\"col\">{}</th>", escape(h)));
        }
        self.body.push_str("</tr></thead>\n<tbody>\n");
        for row in rows {
            self.body.push_str("<tr>");
            for cell in row {
                self.body.push_str(&format!("<td>{}</td>", cell.to_html()));
            }
            self.body.push_str("</tr>\n");
        }
        self.body.push_str("</tbody>\n</table>\n");
        self
    }

    /// An image, given by its path relative to the page.
    pub fn figure(&mut self, src: &Path, caption: &str) -> &mut Self {
        let src = escape(&src.display().to_string());
        self.line(format!(
            "<figure class=\"figure\"><a href=\"{src}\"><img class=\"figure-img img-fluid\" src=\"{src}\" alt=\"{alt}\"></a><figcaption class=\"figure-caption\">{alt}</figcaption></figure>",
            alt = escape(caption),
        ));
        self
    }

    /// A section hidden until its summary is clicked. Its contents are built
    /// by `f`.
    pub fn collapsible<F: FnOnce(&mut Page)>(&mut self, summary: &str, f: F) -> &mut Self {
        let mut inner = Page::default();
        f(&mut inner);
        self.line(format!(
            "<details class=\"mb-2\"><summary>{}</summary>\n{}</details>",
            escape(summary),
            inner.body,
        ));
        self
    }

    /// The whole document.
    pub fn render(&self) -> String {
        let created = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        format!(
            "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">
<title>{title}</title>
<link rel=\"stylesheet\" href=\"{BOOTSTRAP_CSS}\">
</head>
<body>
<div class=\"container\">
<h1 class=\"mt-3\">{title}</h1>
{body}<hr>
<footer class=\"text-muted small mb-3\">Created by {name} {version} at {created}</footer>
</div>
</body>
</html>
",
            title = escape(&self.title),
            body = self.body,
            name = env!("CARGO_PKG_NAME"),
            version = env!("CARGO_PKG_VERSION"),
        )
    }

    /// Write the page as `index.html` in `dir`. The path written is
    /// returned.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join("index.html");
        std::fs::write(&path, self.render()).map_err(|err| ReportError::IO {
            file: path.clone(),
            err,
        })?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{file}: {err}")]
    IO { file: PathBuf, err: std::io::Error },
}
