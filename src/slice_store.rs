use std::sync::Arc;

use crate::error::ViewerError;
use crate::slice::Slice;

/// An ordered run of slices sharing a series identifier.
#[derive(Debug, Clone, Default)]
pub struct Series {
    key: String,
    slices: Vec<Arc<Slice>>,
}

impl Series {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slices: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn slices(&self) -> &[Arc<Slice>] {
        &self.slices
    }

    pub fn get(&self, index: usize) -> Result<&Arc<Slice>, ViewerError> {
        self.slices.get(index).ok_or(ViewerError::IndexOutOfRange {
            what: "slice",
            index,
            len: self.slices.len(),
        })
    }

    pub fn push(&mut self, slice: Slice) {
        self.slices.push(Arc::new(slice));
    }
}

/// A study session: series keyed by series identifier, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Session {
    key: String,
    series: Vec<Series>,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            series: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn series_keys(&self) -> Vec<String> {
        self.series.iter().map(|s| s.key.clone()).collect()
    }

    pub fn position(&self, series_key: &str) -> Option<usize> {
        self.series.iter().position(|s| s.key == series_key)
    }

    fn series_mut(&mut self, series_key: &str) -> &mut Series {
        let index = match self.position(series_key) {
            Some(index) => index,
            None => {
                self.series.push(Series::new(series_key));
                self.series.len() - 1
            }
        };
        &mut self.series[index]
    }
}

/// The ingest hierarchy handed over by a DICOM-reading collaborator:
/// session key → series key → ordered slices.
///
/// Keys are unique within their parent and listed in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct Study {
    sessions: Vec<Session>,
}

impl Study {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slice to the end of `session_key` / `series_key`,
    /// creating either level on first use.
    pub fn push_slice(&mut self, session_key: &str, series_key: &str, slice: Slice) {
        self.session_mut(session_key)
            .series_mut(series_key)
            .push(slice);
    }

    /// Append a whole ordered series.
    pub fn push_series(
        &mut self,
        session_key: &str,
        series_key: &str,
        slices: impl IntoIterator<Item = Slice>,
    ) {
        let series = self.session_mut(session_key).series_mut(series_key);
        for slice in slices {
            series.push(slice);
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session_keys(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.key.clone()).collect()
    }

    pub fn position(&self, session_key: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.key == session_key)
    }

    pub fn slice_count(&self) -> usize {
        self.sessions
            .iter()
            .flat_map(|session| session.series.iter())
            .map(Series::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slice_count() == 0
    }

    fn session_mut(&mut self, session_key: &str) -> &mut Session {
        let index = match self.position(session_key) {
            Some(index) => index,
            None => {
                self.sessions.push(Session::new(session_key));
                self.sessions.len() - 1
            }
        };
        &mut self.sessions[index]
    }
}

/// Owner of the currently loaded study. Read-only between loads.
#[derive(Debug, Default)]
pub struct SliceStore {
    study: Study,
}

impl SliceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole content with `study`. Sessions and series without
    /// slices are dropped so navigation never lands on an empty series.
    pub fn load(&mut self, mut study: Study) {
        for session in &mut study.sessions {
            session.series.retain(|series| !series.is_empty());
        }
        study.sessions.retain(|session| !session.series.is_empty());
        self.study = study;
    }

    pub fn study(&self) -> &Study {
        &self.study
    }

    pub fn is_empty(&self) -> bool {
        self.study.sessions.is_empty()
    }

    pub fn session(&self, index: usize) -> Result<&Session, ViewerError> {
        if self.is_empty() {
            return Err(ViewerError::EmptyStudy);
        }
        self.study
            .sessions
            .get(index)
            .ok_or(ViewerError::IndexOutOfRange {
                what: "session",
                index,
                len: self.study.sessions.len(),
            })
    }

    pub fn series(&self, session: usize, series: usize) -> Result<&Series, ViewerError> {
        let owner = self.session(session)?;
        owner
            .series
            .get(series)
            .ok_or(ViewerError::IndexOutOfRange {
                what: "series",
                index: series,
                len: owner.series.len(),
            })
    }

    pub fn slice(
        &self,
        session: usize,
        series: usize,
        index: usize,
    ) -> Result<&Arc<Slice>, ViewerError> {
        self.series(session, series)?.get(index)
    }

    pub fn session_position(&self, key: &str) -> Result<usize, ViewerError> {
        if self.is_empty() {
            return Err(ViewerError::EmptyStudy);
        }
        self.study.position(key).ok_or_else(|| ViewerError::UnknownKey {
            what: "session",
            key: key.to_string(),
        })
    }

    pub fn series_position(&self, session: usize, key: &str) -> Result<usize, ViewerError> {
        self.session(session)?
            .position(key)
            .ok_or_else(|| ViewerError::UnknownKey {
                what: "series",
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn slice(label: &str) -> Slice {
        Slice::new(label, Array2::zeros((2, 2)))
    }

    #[test]
    fn keys_keep_insertion_order_and_stay_unique() {
        let mut study = Study::new();
        study.push_slice("study-b", "s2", slice("1"));
        study.push_slice("study-a", "s1", slice("2"));
        study.push_slice("study-b", "s1", slice("3"));
        study.push_slice("study-b", "s2", slice("4"));

        assert_eq!(study.session_keys(), vec!["study-b", "study-a"]);
        assert_eq!(study.sessions()[0].series_keys(), vec!["s2", "s1"]);
        assert_eq!(study.slice_count(), 4);

        let labels: Vec<_> = study.sessions()[0].series()[0]
            .slices()
            .iter()
            .map(|s| s.label().to_string())
            .collect();
        assert_eq!(labels, vec!["1", "4"]);
    }

    #[test]
    fn load_replaces_and_drops_empty_levels() {
        let mut store = SliceStore::new();
        let mut first = Study::new();
        first.push_slice("old", "s", slice("x"));
        store.load(first);
        assert_eq!(store.study().session_keys(), vec!["old"]);

        let mut second = Study::new();
        second.push_series("empty", "nothing", Vec::new());
        second.push_slice("new", "s", slice("y"));
        store.load(second);
        assert_eq!(store.study().session_keys(), vec!["new"]);
    }

    #[test]
    fn lookups_report_errors() {
        let mut store = SliceStore::new();
        assert!(matches!(store.session(0), Err(ViewerError::EmptyStudy)));
        assert!(matches!(
            store.session_position("any"),
            Err(ViewerError::EmptyStudy)
        ));

        let mut study = Study::new();
        study.push_series("a", "s", vec![slice("0"), slice("1")]);
        store.load(study);

        assert!(store.slice(0, 0, 1).is_ok());
        assert!(matches!(
            store.slice(0, 0, 2),
            Err(ViewerError::IndexOutOfRange { what: "slice", index: 2, len: 2 })
        ));
        assert!(matches!(
            store.series(0, 1),
            Err(ViewerError::IndexOutOfRange { what: "series", .. })
        ));
        assert!(matches!(
            store.series_position(0, "missing"),
            Err(ViewerError::UnknownKey { what: "series", .. })
        ));
        assert_eq!(store.session_position("a").unwrap(), 0);
    }
}
