pub mod extract;
pub mod files;
pub mod jobs;
pub mod progress;
pub mod recordings;
pub mod status;
