//! Printable summaries of fetched pages.

use std::path::PathBuf;

use serde_json::{json, Value};

use paco::{Page, PacoResult};

/// Outcome of one `--select` query.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub selector: String,
    pub count: usize,
    pub first_text: Option<String>,
}

/// What the CLI prints for one page.
#[derive(Debug, Clone)]
pub struct PageReport {
    pub test: String,
    pub url: String,
    pub final_url: String,
    pub device: String,
    pub status: u16,
    pub status_message: String,
    pub content_type: Option<String>,
    pub title: String,
    pub user_agent: Option<String>,
    pub attempts: u32,
    pub selections: Vec<Selection>,
    pub stored: Option<PathBuf>,
}

impl PageReport {
    pub fn from_page(page: &Page, selectors: &[String]) -> PacoResult<Self> {
        let mut selections = Vec::with_capacity(selectors.len());
        for selector in selectors {
            selections.push(Selection {
                selector: selector.clone(),
                count: page.element_count(selector)?,
                first_text: page.element_text(selector)?,
            });
        }

        Ok(Self {
            test: page.test_name(),
            url: page.url().to_string(),
            final_url: page.final_url().to_string(),
            device: page.device().to_string(),
            status: page.status_code(),
            status_message: page.status_message().to_string(),
            content_type: page.content_type().map(str::to_string),
            title: page.title(),
            user_agent: page.user_agent().map(str::to_string),
            attempts: page.attempts(),
            selections,
            stored: None,
        })
    }

    pub fn with_stored(mut self, path: PathBuf) -> Self {
        self.stored = Some(path);
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "test": self.test,
            "url": self.url,
            "finalUrl": self.final_url,
            "device": self.device,
            "status": self.status,
            "statusMessage": self.status_message,
            "contentType": self.content_type,
            "title": self.title,
            "userAgent": self.user_agent,
            "attempts": self.attempts,
            "selections": self.selections.iter().map(|s| json!({
                "selector": s.selector,
                "count": s.count,
                "firstText": s.first_text,
            })).collect::<Vec<_>>(),
            "stored": self.stored.as_ref().map(|p| p.display().to_string()),
        })
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{} {} [{}] {} {}\n",
            self.device, self.url, self.attempts, self.status, self.status_message
        );
        if self.final_url != self.url {
            out.push_str(&format!("  Redirected to: {}\n", self.final_url));
        }
        if let Some(ct) = &self.content_type {
            out.push_str(&format!("  Content-Type:  {ct}\n"));
        }
        if !self.title.is_empty() {
            out.push_str(&format!("  Title:         {}\n", self.title));
        }
        if let Some(ua) = &self.user_agent {
            out.push_str(&format!("  User-Agent:    {ua}\n"));
        }
        for s in &self.selections {
            match &s.first_text {
                Some(text) => out.push_str(&format!("  {} x{}: {}\n", s.selector, s.count, text.trim())),
                None => out.push_str(&format!("  {} x{}\n", s.selector, s.count)),
            }
        }
        if let Some(path) = &self.stored {
            out.push_str(&format!("  Stored:        {}\n", path.display()));
        }
        out
    }
}
