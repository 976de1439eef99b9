use crate::debounce::Debouncer;
use crate::http::{HttpRequestArgs, DEFAULT_METHOD, METHODS};
use crate::params::{Param, ParamRows, RowId};
use crate::sync::{ChangeOrigin, ParamSync, RowDiff, SyncError, UrlChange};

use anyhow::{anyhow, bail, Result};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Editing state of one interactive session.
///
/// URL text changes go through [`Session::apply_url_change`]; parameter row
/// edits re-encode the URL immediately and user URL edits are decoded back
/// into the rows once the debounce delay has passed.
#[derive(Debug)]
pub struct Session {
    method: String,
    url: String,
    host: Option<String>,
    params: ParamSync,
    headers: ParamRows,
    body: Option<String>,
    token: Option<String>,
    width: usize,
    pending: Debouncer<String>,
}

impl Session {
    /// Starts a session on `url`, decoding its query into the rows right away.
    /// `host` is the base for relative URLs.
    pub fn new(url: &str, host: Option<&str>, width: usize) -> Self {
        let mut session = Session {
            method: DEFAULT_METHOD.to_string(),
            url: String::new(),
            host: host.map(|h| h.trim_end_matches('/').to_string()),
            params: ParamSync::new(),
            headers: ParamRows::new(),
            body: None,
            token: None,
            width,
            pending: Debouncer::default(),
        };
        session.url = session.absolutize(url);
        if let Err(e) = session.params.decode(&session.url) {
            warn!("{}", e);
        }
        session
    }

    fn absolutize(&self, url: &str) -> String {
        let url = url.trim();
        if url.contains("://") {
            return url.to_string();
        }
        match &self.host {
            Some(host) => format!("{}/{}", host, url.trim_start_matches('/')),
            None => url.to_string(),
        }
    }

    /// Applies a change of the URL text according to its origin.
    pub fn apply_url_change(&mut self, change: UrlChange, now: Instant) {
        self.url = change.text;
        match change.origin {
            ChangeOrigin::UserEdited => {
                if let Some(old) = self.pending.push(self.url.clone(), now) {
                    debug!("superseded pending decode of {}", old);
                }
            }
            ChangeOrigin::SystemRewritten => {
                if let Some(old) = self.pending.cancel() {
                    debug!("dropped pending decode of {}", old);
                }
            }
        }
    }

    /// Records a URL typed by the user. Relative URLs are resolved against
    /// the profile host.
    pub fn edit_url(&mut self, text: &str, now: Instant) {
        let url = self.absolutize(text);
        self.apply_url_change(UrlChange::user(url), now);
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_pending_decode(&self) -> bool {
        self.pending.is_pending()
    }

    /// Decodes the pending user URL if its delay has passed.
    #[cfg(test)]
    pub fn flush_due(&mut self, now: Instant) -> Option<RowDiff> {
        let url = self.pending.take_due(now)?;
        self.decode(&url)
    }

    /// Waits out the debounce delay and decodes the pending user URL.
    pub async fn settle(&mut self) -> Option<RowDiff> {
        let url = self.pending.settle().await?;
        self.decode(&url)
    }

    fn decode(&mut self, url: &str) -> Option<RowDiff> {
        match self.params.decode(url) {
            Ok(diff) => {
                debug!(
                    "decoded {} at generation {}",
                    url,
                    self.params.snapshot().generation()
                );
                Some(diff)
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Decodes a pending user URL right away, so a row edit builds on it
    /// instead of discarding it.
    fn apply_pending(&mut self) {
        if let Some(url) = self.pending.cancel() {
            debug!("applying pending decode of {} before a row edit", url);
            self.decode(&url);
        }
    }

    fn apply_encoded(&mut self, change: Result<UrlChange, SyncError>) {
        match change {
            Ok(change) => self.apply_url_change(change, Instant::now()),
            Err(e) => warn!("{}", e),
        }
    }

    fn row(&self, number: usize) -> Result<RowId> {
        self.params
            .rows()
            .id_at(number)
            .ok_or_else(|| anyhow!("No parameter row {number} (1-{})", self.params.rows().len()))
    }

    /// Renames the key of row `number`. The old key leaves the URL unless
    /// another row still names it.
    pub fn edit_key(&mut self, number: usize, text: &str) -> Result<()> {
        self.apply_pending();
        let id = self.row(number)?;
        let change = self
            .params
            .rename(id, text, &self.url)
            .ok_or_else(|| anyhow!("No parameter row {number}"))?;
        self.apply_encoded(change);
        Ok(())
    }

    pub fn edit_value(&mut self, number: usize, text: &str) -> Result<()> {
        self.apply_pending();
        let id = self.row(number)?;
        if let Some(param) = self.params.rows_mut().get_mut(id) {
            param.value = text.to_string();
        }
        let change = self.params.encode(&self.url);
        self.apply_encoded(change);
        Ok(())
    }

    /// Appends a blank row pair and returns its 1-based position.
    pub fn add_param(&mut self) -> usize {
        self.params.rows_mut().add_pair();
        self.params.rows().len()
    }

    pub fn delete_param(&mut self, number: usize) -> Result<Param> {
        self.apply_pending();
        let id = self.row(number)?;
        let (removed, change) = self
            .params
            .remove(id, &self.url)
            .ok_or_else(|| anyhow!("No parameter row {number}"))?;
        self.apply_encoded(change);
        Ok(removed)
    }

    pub fn params(&self) -> &ParamRows {
        self.params.rows()
    }

    /// Sets a header, replacing an existing one of the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        let id = self
            .headers
            .find_key_ignore_case(name)
            .or_else(|| self.headers.first_blank())
            .unwrap_or_else(|| self.headers.add_pair());
        if let Some(header) = self.headers.get_mut(id) {
            *header = Param::new(name, value);
        }
    }

    pub fn remove_header(&mut self, name: &str) -> Option<Param> {
        let id = self.headers.find_key_ignore_case(name)?;
        self.headers.remove(id)
    }

    pub fn header_rows(&self) -> &ParamRows {
        &self.headers
    }

    pub fn set_method(&mut self, method: &str) -> Result<()> {
        let method = method.to_uppercase();
        if !METHODS.contains(&method.as_str()) {
            bail!("Unsupported method {}, expected one of {}", method, METHODS.join(", "));
        }
        self.method = method;
        Ok(())
    }

    pub fn set_body(&mut self, body: Option<String>) {
        self.body = body.filter(|b| !b.trim().is_empty());
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width;
    }

    /// Human-readable request summary.
    pub fn summary(&self) -> String {
        let headers: Vec<String> = self
            .headers
            .complete()
            .map(|h| format!("{}: {}", h.key, h.value))
            .collect();
        format!(
            "Method: {}\nURL: {}\nHeaders: {}\nBody: {}",
            self.method,
            self.url,
            if headers.is_empty() {
                "(none)".to_string()
            } else {
                headers.join(", ")
            },
            self.body.as_deref().unwrap_or("(none)")
        )
    }
}

impl HttpRequestArgs for Session {
    fn method(&self) -> &str {
        &self.method
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn headers(&self) -> Vec<&Param> {
        self.headers.complete().collect()
    }

    fn body(&self) -> Option<&String> {
        self.body.as_ref()
    }

    fn token(&self) -> Option<&String> {
        self.token.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::debounce::DEFAULT_DEBOUNCE;
    use std::time::Duration;

    fn params(session: &Session) -> Vec<(String, String)> {
        session
            .params()
            .iter()
            .map(|(_, p)| (p.key.clone(), p.value.clone()))
            .collect()
    }

    fn kv(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn new_should_decode_the_initial_url() {
        let session = Session::new("https://x.test/p?a=1&b=2", None, 80);
        assert_eq!(params(&session), kv(&[("a", "1"), ("b", "2")]));
        assert!(!session.has_pending_decode());
    }

    #[test]
    fn new_should_resolve_relative_url_against_host() {
        let session = Session::new("/posts?userId=1", Some("https://api.test/"), 80);
        assert_eq!(session.url(), "https://api.test/posts?userId=1");
        assert_eq!(params(&session), kv(&[("userId", "1")]));
    }

    #[test]
    fn user_url_edit_should_decode_only_after_the_delay() {
        let mut session = Session::new("https://x.test/p", None, 80);
        let now = Instant::now();

        session.edit_url("https://x.test/p?a=1", now);
        assert_eq!(session.url(), "https://x.test/p?a=1");
        assert!(session.flush_due(now).is_none());
        assert_eq!(params(&session), kv(&[("", "")]));

        let diff = session.flush_due(now + DEFAULT_DEBOUNCE).unwrap();
        assert_eq!(diff.added.len(), 1);
        assert_eq!(params(&session), kv(&[("a", "1")]));
    }

    #[test]
    fn rapid_user_edits_should_decode_only_the_last_one() {
        let mut session = Session::new("https://x.test/p", None, 80);
        let now = Instant::now();

        session.edit_url("https://x.test/p?a", now);
        session.edit_url("https://x.test/p?a=", now + Duration::from_millis(10));
        session.edit_url("https://x.test/p?a=9", now + Duration::from_millis(20));

        assert!(session.flush_due(now + Duration::from_millis(60)).is_none());
        session.flush_due(now + Duration::from_millis(70)).unwrap();
        assert_eq!(params(&session), kv(&[("a", "9")]));
    }

    #[test]
    fn row_edit_should_rewrite_url_without_scheduling_a_decode() {
        let mut session = Session::new("https://x.test/p?old=1", None, 80);
        session.add_param();

        session.edit_key(2, "new").unwrap();
        assert_eq!(session.url(), "https://x.test/p?old=1");
        session.edit_value(2, "2").unwrap();

        assert_eq!(session.url(), "https://x.test/p?old=1&new=2");
        assert!(!session.has_pending_decode());
    }

    #[test]
    fn row_edit_should_apply_a_pending_user_edit_first() {
        let mut session = Session::new("https://x.test/p?a=1", None, 80);
        let now = Instant::now();

        session.edit_url("https://x.test/p?a=1&typed=1", now);
        session.edit_value(1, "9").unwrap();

        assert!(!session.has_pending_decode());
        assert!(session.flush_due(now + DEFAULT_DEBOUNCE).is_none());
        assert_eq!(session.url(), "https://x.test/p?a=9&typed=1");
        assert_eq!(params(&session), kv(&[("a", "9"), ("typed", "1")]));
    }

    #[test]
    fn row_edit_during_a_pending_user_edit_should_keep_url_and_rows_consistent() {
        let mut session = Session::new("https://x.test/p", None, 80);
        let now = Instant::now();

        session.edit_url("https://x.test/p?typed=1", now);
        // the pending edit lands in row 1 first, which is then renamed
        session.edit_key(1, "q").unwrap();
        session.edit_value(1, "v").unwrap();

        assert!(!session.has_pending_decode());
        assert_eq!(session.url(), "https://x.test/p?q=v");
        assert_eq!(params(&session), kv(&[("q", "v")]));
    }

    #[test]
    fn delete_during_a_pending_user_edit_should_keep_the_typed_key() {
        let mut session = Session::new("https://x.test/p?a=1", None, 80);
        let now = Instant::now();

        session.edit_url("https://x.test/p?a=1&typed=1", now);
        session.delete_param(1).unwrap();

        assert_eq!(session.url(), "https://x.test/p?typed=1");
        assert_eq!(params(&session), kv(&[("typed", "1")]));
    }

    #[test]
    fn renaming_a_key_should_drop_the_old_one_from_the_url() {
        let mut session = Session::new("https://x.test/p?a=1&b=2", None, 80);

        session.edit_key(1, "c").unwrap();

        assert_eq!(session.url(), "https://x.test/p?b=2&c=1");
        assert_eq!(params(&session), kv(&[("c", "1"), ("b", "2")]));
    }

    #[test]
    fn delete_param_should_remove_it_from_the_url() {
        let mut session = Session::new("https://x.test/p?a=1&b=2", None, 80);

        let removed = session.delete_param(1).unwrap();

        assert_eq!(removed, Param::new("a", "1"));
        assert_eq!(session.url(), "https://x.test/p?b=2");
        assert_eq!(params(&session), kv(&[("b", "2")]));
    }

    #[test]
    fn removing_a_key_from_the_url_should_drop_its_row() {
        let mut session = Session::new("https://x.test/p?a=1&b=2", None, 80);
        let now = Instant::now();

        session.edit_url("https://x.test/p?b=2", now);
        session.flush_due(now + DEFAULT_DEBOUNCE).unwrap();

        assert_eq!(params(&session), kv(&[("b", "2")]));
    }

    #[test]
    fn unparseable_user_url_should_keep_the_rows() {
        let mut session = Session::new("https://x.test/p?a=1", None, 80);
        let now = Instant::now();

        session.edit_url("http://[broken", now);

        assert!(session.flush_due(now + DEFAULT_DEBOUNCE).is_none());
        assert_eq!(params(&session), kv(&[("a", "1")]));
    }

    #[test]
    fn edit_should_fail_for_unknown_row() {
        let mut session = Session::new("https://x.test/p", None, 80);
        assert!(session.edit_key(0, "a").is_err());
        assert!(session.edit_value(2, "a").is_err());
        assert!(session.delete_param(5).is_err());
    }

    #[test]
    fn set_header_should_replace_case_insensitively() {
        let mut session = Session::new("https://x.test/", None, 80);
        session.set_header("Accept", "text/plain");
        session.set_header("accept", "application/json");
        session.set_header("X-Id", "1");

        let headers: Vec<_> = HttpRequestArgs::headers(&session).into_iter().cloned().collect();
        assert_eq!(
            headers,
            vec![Param::new("accept", "application/json"), Param::new("X-Id", "1")]
        );

        assert_eq!(session.remove_header("x-id"), Some(Param::new("X-Id", "1")));
        assert_eq!(session.remove_header("x-id"), None);
    }

    #[test]
    fn set_method_should_validate() {
        let mut session = Session::new("https://x.test/", None, 80);
        session.set_method("patch").unwrap();
        assert_eq!(HttpRequestArgs::method(&session), "PATCH");
        assert!(session.set_method("BREW").is_err());
    }

    #[test]
    fn summary_should_list_request_parts() {
        let mut session = Session::new("https://x.test/", None, 80);
        session.set_header("Accept", "application/json");
        session.set_body(Some("{}".to_string()));
        assert_eq!(
            session.summary(),
            "Method: GET\nURL: https://x.test/\nHeaders: Accept: application/json\nBody: {}"
        );
    }
}
