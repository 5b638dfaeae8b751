//! Issue ingest pipeline.
//!
//! Everything upstream of the vector index: loading issue rows from CSV
//! exports, normalizing them into a deduplicated JSON store, tallying team
//! members, rotating assignee suggestions, and looking up recommended
//! actions.
//!
//! ```text
//! issues.csv --> load_issues_csv --> append_to_json_store --> issues_normalized.json
//!                      |                                            |
//!                      v                                            v
//!           team_members.{csv,json}                    RotationQueue / actions
//! ```

mod actions;
mod csv_load;
mod error;
mod json_store;
mod rotation;
mod team;

pub use actions::recommended_action;
pub use csv_load::{
    is_placeholder, load_issues_csv, mandatory_populated, CsvLoad, PLACEHOLDERS, REQUIRED_FIELDS,
};
pub use error::{IngestError, Result};
pub use json_store::{append_to_json_store, load_json_store, AppendSummary};
pub use rotation::{next_assignee, RotationQueue};
pub use team::{extract_team_members, save_team_members, TeamMember, UNASSIGNED};
