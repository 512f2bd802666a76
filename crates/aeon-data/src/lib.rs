pub mod loader;
pub mod resolve;
pub mod schema;

pub use loader::{DataLoadError, Format};
pub use resolve::{load_study_tree, load_study_tree_file, parse_study_tree, resolve_tree};
