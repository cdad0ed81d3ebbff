pub mod callbacks;
pub mod jobs;
pub mod preferences;
pub mod purchases;
pub mod results;
