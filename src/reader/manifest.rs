use crate::parse::{self, Element};
use crate::prelude::*;
use crate::registry::ReaderKind;
use crate::time::TimeCursor;

use super::{get_reader, AnyReader, Progress};

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
/// One `<DataSet>` entry of a `.pvd` manifest
pub struct Fragment {
    /// the `file` attribute, as written in the manifest
    pub path: PathBuf,
    /// the `timestep` attribute, `0.0` when absent
    pub time: f64,
    /// the `group` attribute. An empty group is distinct from no group.
    pub group: Option<String>,
    pub part: usize,
}

impl Fragment {
    /// `{group}-{part}`, or `part-{part}` without a group. An empty group keeps its
    /// separator so it cannot collide with an absent one.
    fn block_key(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}-{}", self.part),
            None => format!("part-{}", self.part),
        }
    }
}

/// block keys of `fragments` in order, a repeated key gets its position appended
fn unique_block_keys<'a>(fragments: impl IntoIterator<Item = &'a Fragment>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for (position, fragment) in fragments.into_iter().enumerate() {
        let mut key = fragment.block_key();
        let mut suffix = position;
        while seen.contains(&key) {
            key = format!("{}-{suffix}", fragment.block_key());
            suffix += 1;
        }
        seen.insert(key.clone());
        keys.push(key);
    }

    keys
}

/// Reader for `.pvd` manifests listing one file per time, group and part
///
/// For the active time the manifest resolves a list of active fragments, each read
/// by its own registry-selected reader. A manifest without any `timestep`
/// attributes has the single time `0.0` and every fragment is always active.
#[derive(Debug)]
pub struct ManifestReader {
    path: PathBuf,
    fragments: Vec<Fragment>,
    time: TimeCursor,
    /// no fragment carries a `timestep` attribute
    timeless: bool,
    active: Vec<usize>,
    active_readers: Vec<AnyReader>,
    progress: bool,
}

fn parse_fragment(element: &Element, auto_parts: &mut HashMap<u64, usize>) -> Result<(Fragment, bool), parse::ParseError> {
    let file = element.required_attribute("file")?;
    let explicit_time = element.parsed_attribute::<f64>("timestep")?;
    let group = element.attribute("group").map(str::to_string);
    let time = explicit_time.unwrap_or(0.0);

    let part = match element.parsed_attribute::<usize>("part")? {
        Some(part) => part,
        None if group.is_none() => {
            let counter = auto_parts.entry(time.to_bits()).or_insert(0);
            let part = *counter;
            *counter += 1;
            part
        }
        None => 0,
    };

    let fragment = Fragment {
        path: PathBuf::from(file),
        time,
        group,
        part,
    };

    Ok((fragment, explicit_time.is_some()))
}

impl ManifestReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        Error::check_exists(path)?;

        let document = parse::read_document(path).map_err(|e| Error::decode(path, e))?;
        let root = &document.root;
        if root.name != "VTKFile" || root.attribute("type") != Some("Collection") {
            return Err(Error::unsupported(path, "not a VTKFile collection"));
        }

        let collection = root
            .required_child("Collection")
            .map_err(|e| Error::decode(path, e))?;

        let mut auto_parts = HashMap::new();
        let mut fragments = Vec::new();
        let mut any_time = false;

        for element in collection.children_named("DataSet") {
            let (fragment, has_time) =
                parse_fragment(element, &mut auto_parts).map_err(|e| Error::decode(path, e))?;
            any_time |= has_time;
            fragments.push(fragment);
        }

        let mut values: Vec<f64> = fragments.iter().map(|f| f.time).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        if values.is_empty() {
            values.push(0.0);
        }

        let mut reader = Self {
            path: path.to_path_buf(),
            fragments,
            time: TimeCursor::new(values),
            timeless: !any_time,
            active: Vec::new(),
            active_readers: Vec::new(),
            progress: false,
        };
        reader.activate(reader.time.active_value())?;

        tracing::debug!(
            path = %reader.path.display(),
            fragments = reader.fragments.len(),
            time_points = reader.time.len(),
            "constructed manifest reader"
        );

        Ok(reader)
    }

    /// every fragment, in manifest order
    pub fn datasets(&self) -> &[Fragment] {
        &self.fragments
    }

    /// fragments of the active time, ordered by group then part
    pub fn active_datasets(&self) -> Vec<&Fragment> {
        self.active.iter().map(|i| &self.fragments[*i]).collect()
    }

    /// one reader per active fragment, in the order of [`Self::active_datasets`]
    pub fn active_readers(&self) -> &[AnyReader] {
        &self.active_readers
    }

    /// Mutable access to the active readers, for selecting arrays on a child. The
    /// readers are rebuilt when the active time changes.
    pub fn active_readers_mut(&mut self) -> &mut [AnyReader] {
        &mut self.active_readers
    }

    fn base_directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    fn fragments_at(&self, value: f64) -> Vec<usize> {
        let mut active: Vec<usize> = (0..self.fragments.len())
            .filter(|i| self.timeless || self.fragments[*i].time == value)
            .collect();

        active.sort_by(|a, b| {
            let (a, b) = (&self.fragments[*a], &self.fragments[*b]);
            (&a.group, a.part).cmp(&(&b.group, b.part))
        });

        active
    }

    /// resolve the fragments of `value` and their readers, replacing the current ones
    /// only if every reader could be constructed
    fn activate(&mut self, value: f64) -> Result<(), Error> {
        let active = self.fragments_at(value);

        let base = self.base_directory().to_path_buf();
        let readers = active
            .iter()
            .map(|i| get_reader(base.join(&self.fragments[*i].path)))
            .collect::<Result<Vec<_>, _>>()?;

        self.active = active;
        self.active_readers = readers;
        Ok(())
    }
}

impl Reader for ManifestReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn kind(&self) -> ReaderKind {
        ReaderKind::Pvd
    }

    fn read(&self) -> Result<Dataset, Error> {
        let progress = Progress::new(ReaderKind::Pvd.to_string(), self.progress);
        let total = self.active_readers.len();
        let keys = unique_block_keys(self.active_datasets());
        let mut blocks = MultiBlock::new();

        for (step, (key, reader)) in keys.into_iter().zip(&self.active_readers).enumerate() {
            let data = reader.read()?;
            blocks.push(Some(key), data);
            progress.step(step + 1, total);
        }

        Ok(Dataset::MultiBlock(blocks))
    }

    fn show_progress(&mut self) {
        self.progress = true;
    }

    fn hide_progress(&mut self) {
        self.progress = false;
    }

    fn progress_enabled(&self) -> bool {
        self.progress
    }

    fn time(&self) -> Option<&dyn TimeSeries> {
        Some(self)
    }

    fn time_mut(&mut self) -> Option<&mut dyn TimeSeries> {
        Some(self)
    }
}

impl TimeSeries for ManifestReader {
    fn time_values(&self) -> &[f64] {
        self.time.values()
    }

    fn active_time_index(&self) -> usize {
        self.time.active_index()
    }

    /// In a manifest without time values every fragment is always active and only
    /// `0.0` is accepted.
    fn set_active_time_value(&mut self, value: f64) -> Result<(), Error> {
        let index = self.time.resolve(value)?;
        if self.timeless {
            return Ok(());
        }

        let resolved = self.time.value(index)?;
        self.activate(resolved)?;
        self.time.set_active_index(index)?;

        tracing::debug!(path = %self.path.display(), index, value = resolved, "active time changed");
        Ok(())
    }

    fn set_active_time_point(&mut self, index: usize) -> Result<(), Error> {
        let value = self.time.value(index)?;
        self.activate(value)?;
        self.time.set_active_index(index)?;

        tracing::debug!(path = %self.path.display(), index, value, "active time changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_document;

    fn fragments(xml: &str) -> Vec<Fragment> {
        let document = parse_document(xml.as_bytes()).unwrap();
        let collection = document.root.required_child("Collection").unwrap();
        let mut auto_parts = HashMap::new();
        collection
            .children_named("DataSet")
            .map(|e| parse_fragment(e, &mut auto_parts).unwrap().0)
            .collect()
    }

    #[test]
    fn parts_without_group_auto_increment() {
        let fragments = fragments(
            r#"<VTKFile type="Collection"><Collection>
                <DataSet file="a.vtp"/>
                <DataSet file="b.vtp"/>
                <DataSet timestep="1" file="c.vtp"/>
            </Collection></VTKFile>"#,
        );

        let parts: Vec<usize> = fragments.iter().map(|f| f.part).collect();
        assert_eq!(parts, vec![0, 1, 0]);
        assert!(fragments.iter().all(|f| f.group.is_none()));
    }

    #[test]
    fn grouped_parts_default_to_zero() {
        let fragments = fragments(
            r#"<VTKFile type="Collection"><Collection>
                <DataSet timestep="1" group="" file="a.vtp"/>
                <DataSet timestep="1" group="" file="b.vtp"/>
                <DataSet timestep="1" group="" part="4" file="c.vtp"/>
            </Collection></VTKFile>"#,
        );

        let parts: Vec<usize> = fragments.iter().map(|f| f.part).collect();
        assert_eq!(parts, vec![0, 0, 4]);
        assert_eq!(fragments[0].group.as_deref(), Some(""));
    }

    #[test]
    fn block_keys() {
        let mut fragment = Fragment {
            path: PathBuf::from("a.vtp"),
            time: 0.0,
            group: Some("wall".into()),
            part: 2,
        };
        assert_eq!(fragment.block_key(), "wall-2");

        fragment.group = Some(String::new());
        assert_eq!(fragment.block_key(), "-2");

        fragment.group = None;
        assert_eq!(fragment.block_key(), "part-2");
    }

    #[test]
    fn repeated_block_keys_are_made_unique() {
        let fragment = |group: Option<&str>, part| Fragment {
            path: PathBuf::from("a.vtp"),
            time: 0.0,
            group: group.map(str::to_string),
            part,
        };
        let fragments = [
            fragment(None, 0),
            fragment(Some(""), 0),
            fragment(Some(""), 0),
            fragment(Some(""), 0),
            fragment(Some("part"), 0),
        ];

        assert_eq!(
            unique_block_keys(&fragments),
            vec!["part-0", "-0", "-0-2", "-0-3", "part-0-4"]
        );
    }
}
