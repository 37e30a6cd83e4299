//! A named selection over a fixed list: the shared shape of the strategy and
//! plan registries.

/// Ordered names with one selected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    names: Vec<String>,
    selected: usize,
}

impl Catalog {
    /// A catalog over `names`, first entry selected.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            selected: 0,
        }
    }

    /// All names in order.
    pub fn list(&self) -> &[String] {
        &self.names
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of the selected entry.
    pub const fn selected_index(&self) -> usize {
        self.selected
    }

    /// Name of the selected entry.
    pub fn selected(&self) -> Option<&str> {
        self.names.get(self.selected).map(String::as_str)
    }

    /// Index of `name`, compared case-insensitively.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
    }

    /// Select by index. Returns the selected name.
    pub fn select_index(&mut self, index: usize) -> Option<&str> {
        if index >= self.names.len() {
            return None;
        }
        self.selected = index;
        self.selected()
    }

    /// Select by name, case-insensitively. Returns the canonical name.
    pub fn select_name(&mut self, name: &str) -> Option<&str> {
        let index = self.position(name)?;
        self.select_index(index)
    }

    /// Advance to the next entry, wrapping around.
    pub fn cycle(&mut self) -> Option<&str> {
        if self.names.is_empty() {
            return None;
        }
        let next = self.selected.checked_add(1).unwrap_or(0);
        self.selected = if next >= self.names.len() { 0 } else { next };
        self.selected()
    }

    /// Append a name if not already present. Returns its index.
    pub fn insert(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(index) = self.position(&name) {
            return index;
        }
        self.names.push(name);
        self.names.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_and_cycle() {
        let mut c = Catalog::new(["grid", "vertical"]);
        assert_eq!(c.selected(), Some("grid"));
        assert_eq!(c.cycle(), Some("vertical"));
        assert_eq!(c.cycle(), Some("grid"));
        assert_eq!(c.select_name("VERTICAL"), Some("vertical"));
        assert_eq!(c.selected_index(), 1);
        assert_eq!(c.select_index(5), None);
        assert_eq!(c.selected(), Some("vertical"));
        assert_eq!(c.select_name("spiral"), None);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut c = Catalog::new(["platform"]);
        assert_eq!(c.insert("house"), 1);
        assert_eq!(c.insert("House"), 1);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn empty_catalog() {
        let mut c = Catalog::new(Vec::<String>::new());
        assert!(c.is_empty());
        assert_eq!(c.cycle(), None);
        assert_eq!(c.selected(), None);
    }
}
