//! Per-domain array enable/disable state shared by the format readers

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Where a named array lives
pub enum ArrayDomain {
    Point,
    Cell,
    /// named sub-regions (patches, blocks) whose inclusion is toggled as a whole
    Patch,
}

impl fmt::Display for ArrayDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Cell => write!(f, "cell"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Ordered `(name, enabled)` pairs in the order the decoder discovered them
pub struct ArrayStatusList {
    entries: Vec<(String, bool)>,
}

impl ArrayStatusList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self, name: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, enabled)| *enabled)
    }

    /// set the status of `name`, returning `false` if the name is not listed
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => {
                entry.1 = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_all(&mut self, enabled: bool) {
        self.entries.iter_mut().for_each(|entry| entry.1 = enabled);
    }

    pub fn entries(&self) -> &[(String, bool)] {
        &self.entries
    }

    /// names that are currently enabled, in order
    pub fn enabled(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| name.as_str())
    }

    /// Replace the list with the freshly `discovered` names.
    ///
    /// Names still present keep their status, new names start enabled, names that
    /// disappeared are dropped and duplicates collapse onto their first occurrence.
    pub fn reconcile<I, S>(&mut self, discovered: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, bool)> = Vec::new();

        for name in discovered {
            let name = name.into();
            if entries.iter().any(|(n, _)| *n == name) {
                continue;
            }
            let enabled = self.status(&name).unwrap_or(true);
            entries.push((name, enabled));
        }

        self.entries = entries;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// The array selection of a single reader, one list per [`ArrayDomain`]
pub struct SelectionState {
    pub point: ArrayStatusList,
    pub cell: ArrayStatusList,
    pub patch: ArrayStatusList,
}

impl SelectionState {
    pub fn list(&self, domain: ArrayDomain) -> &ArrayStatusList {
        match domain {
            ArrayDomain::Point => &self.point,
            ArrayDomain::Cell => &self.cell,
            ArrayDomain::Patch => &self.patch,
        }
    }

    pub fn list_mut(&mut self, domain: ArrayDomain) -> &mut ArrayStatusList {
        match domain {
            ArrayDomain::Point => &mut self.point,
            ArrayDomain::Cell => &mut self.cell,
            ArrayDomain::Patch => &mut self.patch,
        }
    }

    /// Whether a decoder should produce `name`. Names the selection has never seen
    /// are treated as enabled.
    pub fn is_enabled(&self, domain: ArrayDomain, name: &str) -> bool {
        self.list(domain).status(name).unwrap_or(true)
    }
}
