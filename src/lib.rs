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

//! Streams large Oracle query results into CSV files and publishes them
//! atomically to shared storage.
//!
//! Layout follows ports and adapters: `domain` holds the data model and
//! errors, `ports` the traits the pipeline depends on, `infrastructure` the
//! Oracle, local-disk and in-memory adapters, and `application` the
//! pipeline and job runner.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
