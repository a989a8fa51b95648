mod desc;
mod results;
mod spec;

pub use desc::{ElectionDescription, ElectionDetail, ElectionList};
pub use results::{CandidateTally, ElectionResults};
pub use spec::{ElectionSpec, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH};
