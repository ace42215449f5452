//! Daily git pull for every local clone.
//!
//! This crate keeps local repositories in sync with their upstream by:
//! - Discovering repository roots below configured folders
//! - Stashing uncommitted and untracked changes
//! - Pulling from the upstream branch
//! - Restoring the stash, reporting anything that could not be restored
//! - Running once a day, with a catch-up run and cooperative abort

pub mod abort;
pub mod cli;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod git;
pub mod history;
pub mod output;
pub mod progress;
pub mod repo;
pub mod run;
pub mod schedule;
