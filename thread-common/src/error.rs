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

//! Error types shared across the Thread commissioning layers.

/// Errors parsing fixed-size identifiers (extended PAN ID, PSKc)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// Wrong number of bytes
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Not a valid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Errors decoding MeshCoP TLVs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// The blob ends in the middle of a TLV header or value
    #[error("truncated TLV at offset {offset}")]
    Truncated { offset: usize },

    /// A value does not fit the single-byte or extended length encoding
    #[error("TLV value too long: {0} bytes")]
    ValueTooLong(usize),

    /// The dataset blob is empty
    #[error("empty dataset")]
    Empty,

    /// Not a valid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
