// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Port for the encoder that receives streamed batches.

use crate::domain::entities::RowBatch;
use crate::domain::errors::Result;

/// Consumes row batches in order.
pub trait BatchSink {
    /// Encodes every row of `batch` and returns how many were written.
    fn write_batch(&mut self, batch: &RowBatch) -> Result<u64>;
}
