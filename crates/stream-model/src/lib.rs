//! Footfall Stream Model
//!
//! Defines the core data contracts shared by every Footfall crate:
//! - **Observations:** Per-frame tracker output (identity, class, box)
//! - **Stream:** JSONL observation stream header and framing
//! - **Lines:** Virtual counting lines and their crossing direction
//! - **Settings:** The analytics option set for one run
//! - **Report:** Crossing events, counts, and the end-of-run summary
//!
//! All coordinates are frame pixels with the origin at the top-left corner
//! and `y` growing downward.

pub mod line;
pub mod observation;
pub mod report;
pub mod settings;
pub mod stream;

pub use line::*;
pub use observation::*;
pub use report::*;
pub use settings::*;
pub use stream::*;
