pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod profile;
pub mod report;
pub mod table;
