pub(crate) mod utils;

pub mod sentiment;
pub mod summarization;
