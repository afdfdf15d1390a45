/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Selects, builds, and runs the validators an experiment requires.
//!
//! Validators consume their readers, so the factory loads a fresh set of inputs from the
//! [`ArtifactSource`] for every validator it creates. No two validators ever share a reader cursor.
//!
//! ## Selection
//!
//! | Validator | Runs if |
//! |---|---|
//! | Standard, Stdout | always |
//! | Reconnect | `reconnect` is set |
//! | Restart | `freeze_restart` |
//! | RecoverState | `recover_state` |
//! | StreamingServer | `streaming` |
//! | Throttle | `throttle_values` is not empty |
//! | PTAThrottle | `use_throttle` and the app is the Platform Testing App |
//! | PTALifecycle | `pta_lifecycle` |
//! | GossipCompensation | `gossip_compensation` |
//! | Migration | `migration` |
//! | HAPIClient | `hapi_client` |
//! | HGCAA | `hgcaa` |

use crate::{
    config::ExperimentConfig,
    expected_map::ExpectedMapData,
    logging,
    node_data::{NodeData, StreamingServerData},
    report::ExperimentReport,
    validators::{
        gossip_compensation::GossipCompensationValidator,
        hapi_client::{HapiClientValidator, HgcaaValidator},
        migration::MigrationValidator,
        pta_lifecycle::PtaLifecycleValidator,
        reconnect::ReconnectValidator,
        recover_state::RecoverStateValidator,
        restart::RestartValidator,
        standard::{ExceptionPolicy, StandardValidator},
        stdout::StdoutValidator,
        streaming_server::StreamingServerValidator,
        throttle::{PtaThrottleValidator, ThrottleValidator},
        Validator, ValidatorError,
    },
};

/// Provides the artifacts of one experiment, in node order.
///
/// Each call must return fresh readers. An artifact that was never collected for a node is `None` in
/// that node's slot; only failing to read an artifact that exists is an `Err`.
pub trait ArtifactSource {
    fn node_count(&self) -> usize;

    fn node_data(&self) -> Result<Vec<NodeData>, ValidatorError>;

    fn streaming_data(&self) -> Result<Vec<Option<StreamingServerData>>, ValidatorError>;

    fn expected_maps(&self) -> Result<ExpectedMapData, ValidatorError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    Standard,
    Stdout,
    Reconnect,
    Restart,
    RecoverState,
    StreamingServer,
    Throttle,
    PtaThrottle,
    PtaLifecycle,
    GossipCompensation,
    Migration,
    HapiClient,
    Hgcaa,
}

impl ValidatorKind {
    /// Name of the validator of this kind, as it appears in reports.
    pub const fn name(&self) -> &'static str {
        match self {
            ValidatorKind::Standard => "StandardValidator",
            ValidatorKind::Stdout => "StdoutValidator",
            ValidatorKind::Reconnect => "ReconnectValidator",
            ValidatorKind::Restart => "RestartValidator",
            ValidatorKind::RecoverState => "RecoverStateValidator",
            ValidatorKind::StreamingServer => "StreamingServerValidator",
            ValidatorKind::Throttle => "ThrottleValidator",
            ValidatorKind::PtaThrottle => "PTAThrottleValidator",
            ValidatorKind::PtaLifecycle => "PTALifecycleValidator",
            ValidatorKind::GossipCompensation => "GossipCompensationValidator",
            ValidatorKind::Migration => "MigrationValidator",
            ValidatorKind::HapiClient => "HAPIClientValidator",
            ValidatorKind::Hgcaa => "HGCAAValidator",
        }
    }
}

pub struct ValidatorFactory;

impl ValidatorFactory {
    /// The validators an experiment configured like `config` must pass.
    pub fn required(config: &ExperimentConfig) -> Vec<ValidatorKind> {
        let mut kinds = vec![ValidatorKind::Standard, ValidatorKind::Stdout];
        let optional = [
            (config.reconnect.is_some(), ValidatorKind::Reconnect),
            (config.freeze_restart, ValidatorKind::Restart),
            (config.recover_state, ValidatorKind::RecoverState),
            (config.streaming, ValidatorKind::StreamingServer),
            (!config.throttle_values.is_empty(), ValidatorKind::Throttle),
            (
                config.use_throttle && config.runs_platform_testing_app(),
                ValidatorKind::PtaThrottle,
            ),
            (config.pta_lifecycle, ValidatorKind::PtaLifecycle),
            (config.gossip_compensation, ValidatorKind::GossipCompensation),
            (config.migration, ValidatorKind::Migration),
            (config.hapi_client, ValidatorKind::HapiClient),
            (config.hgcaa, ValidatorKind::Hgcaa),
        ];
        kinds.extend(
            optional
                .into_iter()
                .filter_map(|(required, kind)| required.then_some(kind)),
        );
        kinds
    }

    /// Build a validator of `kind` over freshly loaded inputs.
    pub fn create(
        kind: ValidatorKind,
        source: &dyn ArtifactSource,
        config: &ExperimentConfig,
    ) -> Result<Box<dyn Validator>, ValidatorError> {
        let validator: Box<dyn Validator> = match kind {
            ValidatorKind::Standard => Box::new(
                StandardValidator::new(source.node_data()?, config.expect_ptd_finish)
                    .with_policy(ExceptionPolicy::for_config(config)),
            ),
            ValidatorKind::Stdout => Box::new(StdoutValidator::new(source.node_data()?)),
            ValidatorKind::Reconnect => {
                let scenario = config.reconnect.ok_or(ValidatorError::MissingInput {
                    what: "reconnect scenario",
                })?;
                Box::new(ReconnectValidator::new(
                    source.node_data()?,
                    scenario,
                    config.saved_state_start_round,
                ))
            }
            ValidatorKind::Restart => Box::new(RestartValidator::new(source.node_data()?)),
            ValidatorKind::RecoverState => Box::new(RecoverStateValidator::new(source.node_data()?)),
            ValidatorKind::StreamingServer => Box::new(StreamingServerValidator::new(
                source.streaming_data()?,
                config.recover_event_stream,
            )),
            ValidatorKind::Throttle => Box::new(ThrottleValidator::new(
                source.node_data()?,
                config.throttle_values.clone(),
            )),
            ValidatorKind::PtaThrottle => {
                Box::new(PtaThrottleValidator::new(source.node_data()?, config)?)
            }
            ValidatorKind::PtaLifecycle => Box::new(PtaLifecycleValidator::new(source.expected_maps()?)),
            ValidatorKind::GossipCompensation => {
                Box::new(GossipCompensationValidator::new(source.node_data()?))
            }
            ValidatorKind::Migration => Box::new(MigrationValidator::new(source.node_data()?)),
            ValidatorKind::HapiClient => Box::new(HapiClientValidator::new(source.node_data()?)),
            ValidatorKind::Hgcaa => Box::new(HgcaaValidator::new(source.node_data()?)),
        };
        Ok(validator)
    }

    /// Create and run every validator the experiment requires, collecting their outcomes.
    pub fn run_all(source: &dyn ArtifactSource, config: &ExperimentConfig) -> ExperimentReport {
        let mut experiment = ExperimentReport::new();

        for kind in Self::required(config) {
            if config.log_events {
                logging::log_validation_start(kind.name(), source.node_count());
            }

            let outcome = Self::create(kind, source, config).and_then(|mut validator| validator.run());
            match outcome {
                Ok(report) => {
                    if config.log_events {
                        logging::log_validation_end(&report);
                    }
                    experiment.add_report(report);
                }
                Err(error) => {
                    logging::log_validation_failed_to_run(kind.name(), &error);
                    experiment.add_failure(kind.name(), error);
                }
            }
        }

        if config.log_events {
            logging::log_experiment_verdict(&experiment);
        }
        experiment
    }
}
