use std::fmt::{Display, Formatter};

/// A single key/value pair as edited in a parameter or header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

impl Param {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Param {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.key.is_empty() && self.value.is_empty()
    }

    /// A row only takes part in encoding once both halves are filled in.
    pub fn is_complete(&self) -> bool {
        !self.key.is_empty() && !self.value.is_empty()
    }
}

/// Stable identity of a row pair. Survives insertions and removals around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    id: RowId,
    param: Param,
}

/// Ordered arena of key/value row pairs.
///
/// Rows are addressed by [`RowId`], never by position; the 1-based position
/// only exists for display labels. The list always holds at least one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRows {
    rows: Vec<Row>,
    next_id: u64,
}

impl Default for ParamRows {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamRows {
    pub fn new() -> Self {
        let mut rows = ParamRows {
            rows: Vec::new(),
            next_id: 0,
        };
        rows.add_pair();
        rows
    }

    #[cfg(test)]
    pub fn from_params<I>(params: I) -> Self
    where
        I: IntoIterator<Item = Param>,
    {
        let mut rows = ParamRows {
            rows: Vec::new(),
            next_id: 0,
        };
        for param in params {
            rows.push(param);
        }
        rows.ensure_not_empty();
        rows
    }

    /// Appends a blank pair. Its label is its new 1-based position.
    pub fn add_pair(&mut self) -> RowId {
        self.push(Param::default())
    }

    pub fn push(&mut self, param: Param) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(Row { id, param });
        id
    }

    /// Removes the pair with the given id, key and value together.
    pub fn remove(&mut self, id: RowId) -> Option<Param> {
        let pos = self.position(id)?;
        let row = self.rows.remove(pos);
        self.ensure_not_empty();
        Some(row.param)
    }

    #[cfg(test)]
    pub fn get(&self, id: RowId) -> Option<&Param> {
        self.rows.iter().find(|r| r.id == id).map(|r| &r.param)
    }

    pub fn get_mut(&mut self, id: RowId) -> Option<&mut Param> {
        self.rows.iter_mut().find(|r| r.id == id).map(|r| &mut r.param)
    }

    pub fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    /// Resolves a 1-based display position to the row currently shown there.
    pub fn id_at(&self, number: usize) -> Option<RowId> {
        number
            .checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .map(|r| r.id)
    }

    pub fn label(&self, id: RowId) -> Option<(String, String)> {
        self.position(id)
            .map(|p| (format!("Key {}", p + 1), format!("Value {}", p + 1)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowId, &Param)> {
        self.rows.iter().map(|r| (r.id, &r.param))
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Complete pairs in row order.
    pub fn complete(&self) -> impl Iterator<Item = &Param> {
        self.rows.iter().map(|r| &r.param).filter(|p| p.is_complete())
    }

    pub fn first_blank(&self) -> Option<RowId> {
        self.rows.iter().find(|r| r.param.is_blank()).map(|r| r.id)
    }

    /// The last row bearing `key`, i.e. the one that wins when encoding.
    pub fn last_with_key(&self, key: &str) -> Option<RowId> {
        self.rows
            .iter()
            .rev()
            .find(|r| r.param.key == key)
            .map(|r| r.id)
    }

    pub fn retain<F>(&mut self, mut keep: F) -> Vec<RowId>
    where
        F: FnMut(&Param) -> bool,
    {
        let mut removed = Vec::new();
        self.rows.retain(|r| {
            let k = keep(&r.param);
            if !k {
                removed.push(r.id);
            }
            k
        });
        self.ensure_not_empty();
        removed
    }

    /// Finds a row by case-insensitive key. Used for header rows.
    pub fn find_key_ignore_case(&self, key: &str) -> Option<RowId> {
        self.rows
            .iter()
            .find(|r| r.param.key.eq_ignore_ascii_case(key))
            .map(|r| r.id)
    }

    fn ensure_not_empty(&mut self) {
        if self.rows.is_empty() {
            self.add_pair();
        }
    }
}
