pub mod record;
pub mod template;
pub mod utterance;
pub mod verdict;

pub use record::*;
pub use template::*;
pub use utterance::*;
pub use verdict::*;
