//! In-place reconciliation of a live element tree against new markup.
//!
//! The live tree is patched so that its markup-level shape (structure, tags,
//! attributes, text) matches the candidate, while node identity is kept wherever
//! a node is compatible, keyed siblings are reordered with minimal moves, and a
//! focused text control keeps its caret when its value is rewritten.
pub mod align;
pub mod attributes;
pub mod config;
pub mod control_state;
pub mod diff_engine;
pub mod document;
pub mod errors;
pub mod html_generator;
pub mod keys;
pub mod parser;
pub mod sequence;
pub mod tree;
pub mod types;

#[cfg(feature = "python")]
mod converters;
#[cfg(feature = "python")]
mod python;

pub use config::{DEFAULT_KEY_ATTRIBUTE, MorphOptions};
pub use diff_engine::DiffEngine;
pub use document::{Document, NodeId, NodeSnapshot};
pub use errors::{InvariantViolation, MorphError, TreeError};
pub use html_generator::{inner_html, outer_html};
pub use keys::Key;
pub use parser::{FragmentParser, HtmlParser};
pub use tree::{TreeMut, TreeRead};
pub use types::{MorphStats, SelectionRange};

use log::debug;

/// Reconciles live trees against markup parsed with `P`.
#[derive(Debug, Clone, Default)]
pub struct Morpher<P = HtmlParser> {
    parser: P,
    options: MorphOptions,
}

impl Morpher<HtmlParser> {
    pub fn new(options: MorphOptions) -> Self {
        Morpher {
            parser: HtmlParser,
            options,
        }
    }
}

impl<P: FragmentParser> Morpher<P> {
    pub fn with_parser(parser: P, options: MorphOptions) -> Self {
        Morpher { parser, options }
    }

    pub fn options(&self) -> &MorphOptions {
        &self.options
    }

    /// Patches the children of `live_root` to match `markup` and hands the markup
    /// back unchanged.
    pub fn reconcile<L: TreeMut>(
        &self,
        markup: &str,
        live: &mut L,
        live_root: L::Handle,
    ) -> Result<String, MorphError> {
        self.reconcile_with_stats(markup, live, live_root)?;
        Ok(markup.to_string())
    }

    pub fn reconcile_with_stats<L: TreeMut>(
        &self,
        markup: &str,
        live: &mut L,
        live_root: L::Handle,
    ) -> Result<MorphStats, MorphError> {
        let (candidate, candidate_root) = self.parser.parse_fragment(markup);
        self.morph(&candidate, candidate_root, live, live_root)
    }

    /// Reconciles against an already materialised candidate tree. Only the
    /// children of the two roots are compared; the roots themselves are untouched.
    pub fn morph<C: TreeRead, L: TreeMut>(
        &self,
        candidate: &C,
        candidate_root: C::Handle,
        live: &mut L,
        live_root: L::Handle,
    ) -> Result<MorphStats, MorphError> {
        debug!(
            "morph: {} candidate / {} live top-level nodes, key attribute '{}'",
            candidate.children(candidate_root).len(),
            live.children(live_root).len(),
            self.options.key_attribute
        );
        let mut engine = DiffEngine::new(candidate, &mut *live, &self.options);
        let outcome = engine
            .diff(candidate_root, live_root)
            .map(|()| engine.into_stats());
        live.release_detached();
        let stats = outcome?;
        debug!("morph done: {stats:?}");
        Ok(stats)
    }
}

/// Reconciles with the default parser and options.
pub fn reconcile<L: TreeMut>(
    markup: &str,
    live: &mut L,
    live_root: L::Handle,
) -> Result<String, MorphError> {
    Morpher::new(MorphOptions::default()).reconcile(markup, live, live_root)
}
