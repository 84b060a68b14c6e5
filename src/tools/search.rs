// src/tools/search.rs

use crate::protocol::{Action, ExecutionOutcome, Parameters};
use crate::tools::host::{HostRunner, open_url_command};
use crate::tools::{ActionHandler, require_text};
use reqwest::Url;
use std::rc::Rc;

/// `web_search`: opens a search results page in the default browser.
pub struct SearchHandler {
    runner: Rc<dyn HostRunner>,
    search_url: String,
}

impl SearchHandler {
    pub fn new(runner: Rc<dyn HostRunner>, search_url: &str) -> Self {
        Self {
            runner,
            search_url: search_url.to_string(),
        }
    }

    pub fn search_link(&self, query: &str) -> Result<Url, String> {
        Url::parse_with_params(&self.search_url, &[("q", query)])
            .map_err(|e| format!("Invalid search URL {}: {e}", self.search_url))
    }
}

impl ActionHandler for SearchHandler {
    fn action(&self) -> Action {
        Action::WebSearch
    }

    fn description(&self) -> &str {
        "Opens web search results for a query."
    }

    fn perform(&self, parameters: &Parameters) -> ExecutionOutcome {
        let query = match require_text(parameters, "query") {
            Ok(query) => query,
            Err(outcome) => return outcome,
        };
        let link = match self.search_link(query) {
            Ok(link) => link,
            Err(reason) => return ExecutionOutcome::failure(&reason),
        };

        let (program, args) = open_url_command(link.as_str());
        let out = self.runner.run(&program, &args);

        if out.success {
            ExecutionOutcome::success(
                &format!("Opened search for: {query}"),
                Some(out.output().unwrap_or_else(|| link.to_string())),
            )
        } else {
            ExecutionOutcome::failure(&format!("Failed to open browser: {}", out.reason()))
        }
    }
}
