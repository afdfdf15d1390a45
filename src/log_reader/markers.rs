/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The closed vocabulary of log markers that the log-parsing front end tags entries with.

use std::fmt::{self, Display, Formatter};

// Wire names of each marker, as they appear in the third column of a platform log line:
pub const EXCEPTION: &str = "EXCEPTION";
pub const SOCKET_EXCEPTIONS: &str = "SOCKET_EXCEPTIONS";
pub const TESTING_EXCEPTIONS_ACCEPTABLE: &str = "TESTING_EXCEPTIONS_ACCEPTABLE";

pub const RECONNECT_START: &str = "RECONNECT_START";
pub const RECONNECT_FINISHED: &str = "RECONNECT_FINISHED";
pub const RECV_STATE_ERROR: &str = "RECV_STATE_ERROR";
pub const RECV_STATE_IO_EXCEPTION: &str = "RECV_STATE_IO_EXCEPTION";
pub const RECV_STATE_HASH_MISMATCH: &str = "RECV_STATE_HASH_MISMATCH";
pub const CHANGED_TO_ACTIVE: &str = "CHANGED_TO_ACTIVE";
pub const SYNC_STALE_COMPENSATION_SUCCESS: &str = "SYNC_STALE_COMPENSATION_SUCCESS";
pub const SYNC_STALE_COMPENSATION_FAILURE: &str = "SYNC_STALE_COMPENSATION_FAILURE";

pub const FREEZE_STATE_SAVED: &str = "FREEZE_STATE_SAVED";
pub const LOAD_RESTART: &str = "LOAD_RESTART";
pub const SIGNED_STATE_DELETE_QUEUE_TOO_BIG: &str = "SIGNED_STATE_DELETE_QUEUE_TOO_BIG";

pub const PTD_SUCCESS: &str = "PTD_SUCCESS";
pub const PTD_FINISH: &str = "PTD_FINISH";
pub const STATE_SAVED: &str = "STATE_SAVED";

pub const MIGRATION_START_LOAD: &str = "MIGRATION_START_LOAD";
pub const MIGRATION_END_LOAD: &str = "MIGRATION_END_LOAD";
pub const MIGRATION_START_PROCESS: &str = "MIGRATION_START_PROCESS";
pub const MIGRATION_END_PROCESS: &str = "MIGRATION_END_PROCESS";

pub const SUITE_START: &str = "SUITE_START";
pub const SUITE_PASSED: &str = "SUITE_PASSED";
pub const SUITE_FAILED: &str = "SUITE_FAILED";
pub const WRONG_STATUS: &str = "WRONG_STATUS";

pub const STARTUP: &str = "STARTUP";
pub const PLATFORM_STATUS: &str = "PLATFORM_STATUS";
pub const UNSTRUCTURED: &str = "UNSTRUCTURED";
pub const OTHER: &str = "OTHER";

/// Category tag of a single log entry.
///
/// Every state machine in [`crate::validators`] matches over this enumeration instead of searching
/// raw log text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogMarker {
    Exception,
    SocketException,
    TestingExceptionsAcceptable,

    ReconnectStart,
    ReconnectFinished,
    ReceiveStateError,
    ReceiveStateIoException,
    ReceiveStateHashMismatch,
    ChangedToActive,
    SyncStaleCompensationSuccess,
    SyncStaleCompensationFailure,

    FreezeStateSaved,
    LoadRestart,
    SignedStateDeleteQueueTooBig,

    PtdSuccess,
    PtdFinish,
    StateSaved,

    MigrationStartLoad,
    MigrationEndLoad,
    MigrationStartProcess,
    MigrationEndProcess,

    SuiteStart,
    SuitePassed,
    SuiteFailed,
    WrongStatus,

    Startup,
    PlatformStatus,
    /// A line that does not follow the structured log layout and mentions no exception.
    Unstructured,
    /// A structured line whose marker is outside this vocabulary.
    Other,
}

impl LogMarker {
    /// Look up a marker by its wire name. Unknown names map to [`LogMarker::Other`].
    pub fn from_name(name: &str) -> LogMarker {
        match name {
            EXCEPTION => LogMarker::Exception,
            SOCKET_EXCEPTIONS => LogMarker::SocketException,
            TESTING_EXCEPTIONS_ACCEPTABLE => LogMarker::TestingExceptionsAcceptable,
            RECONNECT_START => LogMarker::ReconnectStart,
            RECONNECT_FINISHED => LogMarker::ReconnectFinished,
            RECV_STATE_ERROR => LogMarker::ReceiveStateError,
            RECV_STATE_IO_EXCEPTION => LogMarker::ReceiveStateIoException,
            RECV_STATE_HASH_MISMATCH => LogMarker::ReceiveStateHashMismatch,
            CHANGED_TO_ACTIVE => LogMarker::ChangedToActive,
            SYNC_STALE_COMPENSATION_SUCCESS => LogMarker::SyncStaleCompensationSuccess,
            SYNC_STALE_COMPENSATION_FAILURE => LogMarker::SyncStaleCompensationFailure,
            FREEZE_STATE_SAVED => LogMarker::FreezeStateSaved,
            LOAD_RESTART => LogMarker::LoadRestart,
            SIGNED_STATE_DELETE_QUEUE_TOO_BIG => LogMarker::SignedStateDeleteQueueTooBig,
            PTD_SUCCESS => LogMarker::PtdSuccess,
            PTD_FINISH => LogMarker::PtdFinish,
            STATE_SAVED => LogMarker::StateSaved,
            MIGRATION_START_LOAD => LogMarker::MigrationStartLoad,
            MIGRATION_END_LOAD => LogMarker::MigrationEndLoad,
            MIGRATION_START_PROCESS => LogMarker::MigrationStartProcess,
            MIGRATION_END_PROCESS => LogMarker::MigrationEndProcess,
            SUITE_START => LogMarker::SuiteStart,
            SUITE_PASSED => LogMarker::SuitePassed,
            SUITE_FAILED => LogMarker::SuiteFailed,
            WRONG_STATUS => LogMarker::WrongStatus,
            STARTUP => LogMarker::Startup,
            PLATFORM_STATUS => LogMarker::PlatformStatus,
            UNSTRUCTURED => LogMarker::Unstructured,
            _ => LogMarker::Other,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            LogMarker::Exception => EXCEPTION,
            LogMarker::SocketException => SOCKET_EXCEPTIONS,
            LogMarker::TestingExceptionsAcceptable => TESTING_EXCEPTIONS_ACCEPTABLE,
            LogMarker::ReconnectStart => RECONNECT_START,
            LogMarker::ReconnectFinished => RECONNECT_FINISHED,
            LogMarker::ReceiveStateError => RECV_STATE_ERROR,
            LogMarker::ReceiveStateIoException => RECV_STATE_IO_EXCEPTION,
            LogMarker::ReceiveStateHashMismatch => RECV_STATE_HASH_MISMATCH,
            LogMarker::ChangedToActive => CHANGED_TO_ACTIVE,
            LogMarker::SyncStaleCompensationSuccess => SYNC_STALE_COMPENSATION_SUCCESS,
            LogMarker::SyncStaleCompensationFailure => SYNC_STALE_COMPENSATION_FAILURE,
            LogMarker::FreezeStateSaved => FREEZE_STATE_SAVED,
            LogMarker::LoadRestart => LOAD_RESTART,
            LogMarker::SignedStateDeleteQueueTooBig => SIGNED_STATE_DELETE_QUEUE_TOO_BIG,
            LogMarker::PtdSuccess => PTD_SUCCESS,
            LogMarker::PtdFinish => PTD_FINISH,
            LogMarker::StateSaved => STATE_SAVED,
            LogMarker::MigrationStartLoad => MIGRATION_START_LOAD,
            LogMarker::MigrationEndLoad => MIGRATION_END_LOAD,
            LogMarker::MigrationStartProcess => MIGRATION_START_PROCESS,
            LogMarker::MigrationEndProcess => MIGRATION_END_PROCESS,
            LogMarker::SuiteStart => SUITE_START,
            LogMarker::SuitePassed => SUITE_PASSED,
            LogMarker::SuiteFailed => SUITE_FAILED,
            LogMarker::WrongStatus => WRONG_STATUS,
            LogMarker::Startup => STARTUP,
            LogMarker::PlatformStatus => PLATFORM_STATUS,
            LogMarker::Unstructured => UNSTRUCTURED,
            LogMarker::Other => OTHER,
        }
    }

    /// Whether entries carrying this marker go into a [`LogReader`](super::LogReader)'s exception
    /// accumulator.
    pub const fn is_exception(&self) -> bool {
        matches!(
            self,
            LogMarker::Exception
                | LogMarker::SocketException
                | LogMarker::TestingExceptionsAcceptable
                | LogMarker::ReceiveStateError
                | LogMarker::ReceiveStateIoException
                | LogMarker::ReceiveStateHashMismatch
                | LogMarker::SyncStaleCompensationFailure
                | LogMarker::SignedStateDeleteQueueTooBig
        )
    }
}

impl Display for LogMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
