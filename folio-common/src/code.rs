// Copyright 2026 folio Project Authors
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

//! Type constraints of cacheable payloads.

/// Payload type served by a paged source and stored by the cache.
///
/// The cache hands entries out by value, so payloads must be cloneable and
/// shareable across tasks. Auto-implemented for every qualifying type.
pub trait Item: Send + Sync + Clone + 'static {}
impl<T> Item for T where T: Send + Sync + Clone + 'static {}
