//! Python module entry point: a live tree that Python code can reconcile and inspect
use crate::converters::to_pyobject;
use crate::{Document, MorphError, MorphOptions, Morpher, NodeId, SelectionRange, TreeMut, TreeRead, inner_html};
use pyo3::exceptions::PyIndexError;
use pyo3::prelude::*;

#[pyclass]
pub struct LiveTree {
    document: Document,
    morpher: Morpher,
}

#[pymethods]
impl LiveTree {
    #[new]
    #[pyo3(signature = (markup=None, options_json=None))]
    fn new(markup: Option<&str>, options_json: Option<&str>) -> PyResult<Self> {
        let options = match options_json {
            Some(json) => MorphOptions::from_json(json)?,
            None => MorphOptions::default(),
        };
        let mut tree = LiveTree {
            document: Document::default(),
            morpher: Morpher::new(options),
        };
        if let Some(markup) = markup {
            tree.reconcile(markup)?;
        }
        Ok(tree)
    }

    fn reconcile(&mut self, markup: &str) -> PyResult<String> {
        let root = self.document.root();
        Ok(self.morpher.reconcile(markup, &mut self.document, root)?)
    }

    /// Like `reconcile`, returning the mutation counts as a dict.
    fn reconcile_with_stats<'py>(&mut self, py: Python<'py>, markup: &str) -> PyResult<Bound<'py, PyAny>> {
        let root = self.document.root();
        let stats = self
            .morpher
            .reconcile_with_stats(markup, &mut self.document, root)?;
        to_pyobject(py, &stats)
    }

    fn inner_html(&self) -> String {
        inner_html(&self.document, self.document.root())
    }

    fn snapshot<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        to_pyobject(py, &self.document.snapshot(self.document.root()))
    }

    fn focus(&mut self, path: Vec<usize>) -> PyResult<()> {
        let node = self.node(&path)?;
        self.document.focus(node).map_err(MorphError::from)?;
        Ok(())
    }

    fn blur(&mut self) {
        self.document.blur();
    }

    fn set_selection(&mut self, path: Vec<usize>, start: usize, end: usize) -> PyResult<()> {
        let node = self.node(&path)?;
        self.document
            .set_selection_range(node, SelectionRange::new(start, end))
            .map_err(MorphError::from)?;
        Ok(())
    }

    fn selection(&self, path: Vec<usize>) -> PyResult<Option<(usize, usize)>> {
        let node = self.node(&path)?;
        Ok(self
            .document
            .selection_range(node)
            .map(|range| (range.start, range.end)))
    }

    fn value(&self, path: Vec<usize>) -> PyResult<Option<String>> {
        let node = self.node(&path)?;
        Ok(self.document.value(node))
    }
}

impl LiveTree {
    fn node(&self, path: &[usize]) -> PyResult<NodeId> {
        self.document
            .node_at(path)
            .ok_or_else(|| PyIndexError::new_err(format!("no node at path {path:?}")))
    }
}

#[pymodule]
fn rust_morpher(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<LiveTree>()?;
    m.add("DEFAULT_KEY_ATTRIBUTE", crate::DEFAULT_KEY_ATTRIBUTE)?;
    Ok(())
}
