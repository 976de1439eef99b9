use crate::params::{Param, ParamRows, RowId};

use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to parse URL '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Where a change of the URL text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Typed by the user. Schedules a decode into the rows.
    UserEdited,
    /// Written back after the rows were re-encoded. Never decoded.
    SystemRewritten,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlChange {
    pub text: String,
    pub origin: ChangeOrigin,
}

impl UrlChange {
    pub fn user(text: impl Into<String>) -> Self {
        UrlChange {
            text: text.into(),
            origin: ChangeOrigin::UserEdited,
        }
    }

    pub fn rewritten(text: impl Into<String>) -> Self {
        UrlChange {
            text: text.into(),
            origin: ChangeOrigin::SystemRewritten,
        }
    }
}

/// The query keys the URL was last known to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySnapshot {
    generation: u64,
    keys: Vec<String>,
}

impl QuerySnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn next(&self, keys: Vec<String>) -> Self {
        QuerySnapshot {
            generation: self.generation + 1,
            keys,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDiff {
    pub added: Vec<RowId>,
    pub changed: Vec<RowId>,
    pub removed: Vec<RowId>,
}

impl RowDiff {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Decoded {
    pub rows: ParamRows,
    pub snapshot: QuerySnapshot,
    pub diff: RowDiff,
}

fn parse(s: &str) -> Result<Url, SyncError> {
    Url::parse(s).map_err(|source| SyncError::Parse {
        url: s.to_string(),
        source,
    })
}

/// Overwrites the first pair named `key` and drops its later duplicates,
/// appending the pair when the key is new.
fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    let mut found = false;
    pairs.retain_mut(|(k, v)| {
        if k != key {
            return true;
        }
        if found {
            return false;
        }
        found = true;
        *v = value.to_string();
        true
    });
    if !found {
        pairs.push((key.to_string(), value.to_string()));
    }
}

fn write_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    }
}

fn encode(
    base_url: &str,
    rows: &ParamRows,
    dropped: Option<&str>,
) -> Result<(String, Vec<String>), SyncError> {
    let mut url = parse(base_url)?;
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    debug!("query values: {:?}", pairs);

    if let Some(key) = dropped {
        if rows.last_with_key(key).is_none() {
            pairs.retain(|(k, _)| k != key);
        }
    }

    for param in rows.complete() {
        set_pair(&mut pairs, &param.key, &param.value);
    }

    write_query(&mut url, &pairs);
    let keys = pairs.into_iter().map(|(k, _)| k).collect();
    Ok((url.into(), keys))
}

/// Rewrites the query component of `base_url` from the complete rows.
///
/// Existing keys keep their position and take the value of the last row
/// naming them; keys new to the URL follow in row order. Rows with an empty
/// key or value are ignored.
pub fn encode_rows_to_url(base_url: &str, rows: &ParamRows) -> Result<String, SyncError> {
    encode(base_url, rows, None).map(|(url, _)| url)
}

/// First value of each query key, in first-seen order.
fn query_params(url: &Url) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    url.query_pairs()
        .into_owned()
        .filter(|(k, _)| seen.insert(k.clone()))
        .collect()
}

/// Reconciles `current` with the query of `url`, by key.
///
/// Keys that disappeared since `previous` lose their rows, keys still present
/// update the row that wins on encode, and new keys fill the first blank pair
/// or get a pair appended. `current` is not touched.
pub fn decode_url_to_rows(
    url: &str,
    current: &ParamRows,
    previous: &QuerySnapshot,
) -> Result<Decoded, SyncError> {
    let parsed = parse(url)?;
    let params = query_params(&parsed);
    let present: HashSet<&str> = params.iter().map(|(k, _)| k.as_str()).collect();

    let gone: HashSet<&str> = previous
        .keys
        .iter()
        .map(String::as_str)
        .filter(|k| !present.contains(k))
        .collect();

    let mut rows = current.clone();
    let mut diff = RowDiff {
        removed: rows.retain(|p| p.key.is_empty() || !gone.contains(p.key.as_str())),
        ..Default::default()
    };

    for (key, value) in &params {
        if let Some(id) = rows.last_with_key(key) {
            if let Some(param) = rows.get_mut(id) {
                if &param.value != value {
                    param.value = value.clone();
                    diff.changed.push(id);
                }
            }
        } else if let Some(id) = rows.first_blank() {
            if let Some(param) = rows.get_mut(id) {
                *param = Param::new(key.as_str(), value.as_str());
            }
            diff.added.push(id);
        } else {
            diff.added
                .push(rows.push(Param::new(key.as_str(), value.as_str())));
        }
    }

    let snapshot = previous.next(params.into_iter().map(|(k, _)| k).collect());
    debug!(
        "decoded generation {}: {} added, {} changed, {} removed",
        snapshot.generation,
        diff.added.len(),
        diff.changed.len(),
        diff.removed.len()
    );

    Ok(Decoded {
        rows,
        snapshot,
        diff,
    })
}

/// The parameter rows of an editing session together with the snapshot of
/// the query they were last reconciled with.
#[derive(Debug, Clone, Default)]
pub struct ParamSync {
    rows: ParamRows,
    snapshot: QuerySnapshot,
}

impl ParamSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &ParamRows {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut ParamRows {
        &mut self.rows
    }

    pub fn snapshot(&self) -> &QuerySnapshot {
        &self.snapshot
    }

    /// Encodes the rows into `base_url`. The result must be applied as a
    /// rewritten change so it is not decoded again.
    pub fn encode(&mut self, base_url: &str) -> Result<UrlChange, SyncError> {
        self.encode_dropping(base_url, None)
    }

    /// Removes a row pair and re-encodes. The removed key also leaves the
    /// URL, unless another row still names it.
    pub fn remove(
        &mut self,
        id: RowId,
        base_url: &str,
    ) -> Option<(Param, Result<UrlChange, SyncError>)> {
        let removed = self.rows.remove(id)?;
        let change = self.encode_dropping(base_url, Some(&removed.key));
        Some((removed, change))
    }

    /// Renames the key of row `id` and re-encodes. The old key also leaves
    /// the URL, unless another row still names it.
    pub fn rename(
        &mut self,
        id: RowId,
        key: &str,
        base_url: &str,
    ) -> Option<Result<UrlChange, SyncError>> {
        let param = self.rows.get_mut(id)?;
        let old = std::mem::replace(&mut param.key, key.to_string());
        let dropped = Some(old.as_str()).filter(|k| !k.is_empty() && *k != key);
        Some(self.encode_dropping(base_url, dropped))
    }

    fn encode_dropping(
        &mut self,
        base_url: &str,
        dropped: Option<&str>,
    ) -> Result<UrlChange, SyncError> {
        let (url, keys) = encode(base_url, &self.rows, dropped)?;
        self.snapshot = self.snapshot.next(keys);
        Ok(UrlChange::rewritten(url))
    }

    /// Decodes a user-edited URL into the rows. On error nothing changes.
    pub fn decode(&mut self, url: &str) -> Result<RowDiff, SyncError> {
        let decoded = decode_url_to_rows(url, &self.rows, &self.snapshot)?;
        self.rows = decoded.rows;
        self.snapshot = decoded.snapshot;
        Ok(decoded.diff)
    }
}
