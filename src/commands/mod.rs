pub mod download_history;
pub mod download_snapshots;

pub use download_history::download_history;
pub use download_snapshots::download_snapshots;
