// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Commissioner error types

use crate::CommissioningState;
use core::fmt;
use std::time::Duration;
use thread_common::TlvError;

/// Error codes reported by the native commissioner library
///
/// Success (`kNone`) has no variant: a successful call returns `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Cancelled,
    InvalidArgs,
    InvalidCommand,
    Timeout,
    NotFound,
    Security,
    Unimplemented,
    BadFormat,
    Busy,
    OutOfMemory,
    IoError,
    IoBusy,
    AlreadyExists,
    Aborted,
    InvalidState,
    Rejected,
    CoapError,
    RegistryError,
    Unknown,
}

impl ErrorCode {
    /// Name as printed by the native library
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cancelled => "kCancelled",
            Self::InvalidArgs => "kInvalidArgs",
            Self::InvalidCommand => "kInvalidCommand",
            Self::Timeout => "kTimeout",
            Self::NotFound => "kNotFound",
            Self::Security => "kSecurity",
            Self::Unimplemented => "kUnimplemented",
            Self::BadFormat => "kBadFormat",
            Self::Busy => "kBusy",
            Self::OutOfMemory => "kOutOfMemory",
            Self::IoError => "kIOError",
            Self::IoBusy => "kIOBusy",
            Self::AlreadyExists => "kAlreadyExists",
            Self::Aborted => "kAborted",
            Self::InvalidState => "kInvalidState",
            Self::Rejected => "kRejected",
            Self::CoapError => "kCOAPError",
            Self::RegistryError => "kRegistryError",
            Self::Unknown => "kUnknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed native call: code and message, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct NativeError {
    pub code: ErrorCode,
    pub message: String,
}

impl NativeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Native call that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Petition,
    SetDataset,
    GetDataset,
    GeneratePskc,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Petition => "petition",
            Self::SetDataset => "setCommissionerDataset",
            Self::GetDataset => "getRawActiveDataset",
            Self::GeneratePskc => "generatePSKc",
        })
    }
}

/// Errors that end a commissioning session
#[derive(Debug, thiserror::Error)]
pub enum CommissioningError {
    /// The native commissioner reported an error
    #[error("{stage} failed: {error}")]
    Native {
        stage: Stage,
        #[source]
        error: NativeError,
    },

    /// The fetched Active Operational Dataset is malformed
    #[error("Invalid active dataset: {0}")]
    Dataset(#[from] TlvError),

    /// No joiner finished within the allowed time
    #[error("No joiner completed within {0:?}")]
    TimedOut(Duration),

    /// The session was cancelled
    #[error("Commissioning cancelled")]
    Cancelled,

    /// Another session is using the commissioner
    #[error("A commissioning session is already active")]
    SessionActive,

    /// The operation does not apply to the session's current state
    #[error("Operation not valid in state {0}")]
    InvalidState(CommissioningState),

    /// The session task ended without a result
    #[error("Commissioning worker stopped unexpectedly")]
    WorkerGone,
}

impl CommissioningError {
    /// Native error code, if a native call failed
    pub fn native_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Native { error, .. } => Some(error.code),
            _ => None,
        }
    }

    /// Whether the joiner wait ran out, as opposed to a failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    pub(crate) fn native(stage: Stage) -> impl FnOnce(NativeError) -> Self {
        move |error| Self::Native { stage, error }
    }
}
