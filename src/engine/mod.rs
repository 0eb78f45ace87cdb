//! The monitoring engine: session registry, extraction, decisions, and
//! the two-phase poll cycle that drives them.

pub mod clock;
pub mod decide;
pub mod extract;
pub mod registry;
pub mod runner;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decide::{decide, Decision, DecisionInput, Observation};
pub use extract::{extract_sections, parse_section_cells, ExtractPolicy, Extraction};
pub use registry::{CourseSession, SessionRegistry};
pub use runner::{Runner, RunnerConfig};
pub use state::SectionStates;
