//! Compiling statements into jobs and running them.
pub mod job;
pub mod message;
pub mod metadata;
pub mod runner;
pub mod source;
pub mod tasks;
