//! CLI command handlers. Each command is in its own file.

mod blocklist;
mod info;
mod scan;
mod url;

pub use blocklist::{run_blocklist, BlocklistAction};
pub use info::run_info;
pub use scan::run_scan;
pub use url::run_url;
