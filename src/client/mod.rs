//! Generic list/filter/mutate harness. One parameterized implementation of the
//! page pattern (fetch a collection, narrow it with dependent filters, edit
//! records through a dialog draft, re-render with derived stats) instead of a
//! hand-copied module per resource.

pub mod fetch;
pub mod filters;
pub mod form;
pub mod list;
pub mod resources;
pub mod transport;
