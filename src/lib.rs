/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Validation of multi-node consensus experiments.
//!
//! After an experiment runs, every node leaves behind a platform log, a metrics CSV, and depending on
//! the experiment, a stdout capture, a HAPI client log, event stream hashes, and a snapshot of the test
//! application's expected state. This crate reads those artifacts and decides whether the experiment's
//! correctness and performance invariants held.
//!
//! The usual entry point is [`factory::ValidatorFactory::run_all`], given an
//! [`config::ExperimentConfig`] and an [`factory::ArtifactSource`] such as
//! [`artifacts::DirectoryArtifacts`].

pub mod artifacts;

pub mod config;

pub mod csv_reader;

pub mod expected_map;

pub mod factory;

pub mod log_reader;

pub mod logging;

pub mod node_data;

pub mod report;

pub mod validators;
