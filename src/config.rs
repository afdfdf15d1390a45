/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Description of the experiment whose artifacts are being validated.
//!
//! The [`ExperimentConfig`] is defined using the builder pattern, for example:
//!
//! ```
//! use regression_validation::config::{ExperimentConfig, ReconnectScenario};
//!
//! let config = ExperimentConfig::builder()
//!     .reconnect(Some(ReconnectScenario::KillNetwork))
//!     .saved_state_start_round(120)
//!     .throttle_values(vec![1000.0, 5000.0])
//!     .log_events(true)
//!     .build();
//! ```
//!
//! Every setter is optional. An experiment built with no setters at all is a plain run, validated by
//! the standard and stdout validators only.

use std::collections::BTreeMap;

use serde::Deserialize;
use typed_builder::TypedBuilder;

/// File name of the test application whose JSON configuration carries throttle phases.
pub const PLATFORM_TESTING_APP: &str = "PlatformTestingApp.jar";

/// Which fault was injected to force the last node to reconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectScenario {
    /// The node's network was cut and restored. Receive-state errors right after the node becomes
    /// active again are expected churn.
    KillNetwork,
    /// The node's process was killed and restarted. No receive-state error is acceptable.
    KillNode,
}

#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building an [ExperimentConfig]. Every setter is optional:
    - `.reconnect(...)`
    - `.saved_state_start_round(...)`
    - `.freeze_restart(...)`
    - `.recover_state(...)`
    - `.streaming(...)`
    - `.recover_event_stream(...)`
    - `.throttle_values(...)`
    - `.use_throttle(...)`
    - `.app_jar(...)`
    - `.app_config_json(...)`
    - `.pta_lifecycle(...)`
    - `.migration(...)`
    - `.gossip_compensation(...)`
    - `.hapi_client(...)`
    - `.hgcaa(...)`
    - `.expect_ptd_finish(...)`
    - `.log_events(...)`
"))]
pub struct ExperimentConfig {
    #[builder(default, setter(doc = "Set the reconnect scenario the last node was put through."))]
    pub reconnect: Option<ReconnectScenario>,
    #[builder(default, setter(doc = "Set the round of the saved state the experiment started from."))]
    pub saved_state_start_round: u64,
    #[builder(default, setter(doc = "Set whether nodes were frozen and restarted from saved state."))]
    pub freeze_restart: bool,
    #[builder(default, setter(doc = "Set whether nodes recovered their state from a saved state and event stream."))]
    pub recover_state: bool,
    #[builder(default, setter(doc = "Set whether nodes wrote event streams."))]
    pub streaming: bool,
    #[builder(default, setter(doc = "Set whether event streams were recovered and compared against the original."))]
    pub recover_event_stream: bool,
    #[builder(default, setter(doc = "Set the expected per-node transactions/sec of each throttle phase, in phase order."))]
    pub throttle_values: Vec<f64>,
    #[builder(default, setter(doc = "Set whether the test application throttles its submissions."))]
    pub use_throttle: bool,
    #[builder(default, setter(into, doc = "Set the file name of the test application."))]
    pub app_jar: String,
    #[builder(default, setter(strip_option, into, doc = "Set the JSON configuration of the test application."))]
    pub app_config_json: Option<String>,
    #[builder(default, setter(doc = "Set whether nodes saved expected-map snapshots."))]
    pub pta_lifecycle: bool,
    #[builder(default, setter(doc = "Set whether nodes migrated their state on startup."))]
    pub migration: bool,
    #[builder(default, setter(doc = "Set whether stale-event gossip compensation should be audited."))]
    pub gossip_compensation: bool,
    #[builder(default, setter(doc = "Set whether HAPI client suites ran against the nodes."))]
    pub hapi_client: bool,
    #[builder(default, setter(doc = "Set whether the nodes run the services application (HGCAA)."))]
    pub hgcaa: bool,
    #[builder(default, setter(doc = "Set whether every node is expected to log that the test application finished."))]
    pub expect_ptd_finish: bool,
    #[builder(default, setter(doc = "Enable logging of validator start and end events?"))]
    pub log_events: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig::builder().build()
    }
}

impl ExperimentConfig {
    pub fn runs_platform_testing_app(&self) -> bool {
        self.app_jar == PLATFORM_TESTING_APP
    }
}

/// The parts of the Platform Testing App's JSON configuration that validation reads.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PtaConfig {
    #[serde(default)]
    pub submit_config: Option<SubmitConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitConfig {
    /// Target transactions/sec of each throttle phase, keyed by phase ordinal.
    #[serde(default)]
    pub tps_map: BTreeMap<u64, f64>,
}

impl PtaConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Target transactions/sec of every throttle phase, in phase order.
    pub fn throttle_values(&self) -> Vec<f64> {
        self.submit_config
            .as_ref()
            .map(|submit| submit.tps_map.values().copied().collect())
            .unwrap_or_default()
    }
}
