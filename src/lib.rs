// Public library interface for facetview-rs
// Layout engines consume models + metamodel and emit instructions into a pipeline.

pub mod layout;
pub mod meta;
pub mod model;
pub mod pipeline;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_support;
