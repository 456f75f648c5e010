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

//! Cache entries handed out to callers.

use serde::{Deserialize, Serialize};

/// One cached item together with its absolute position in the remote list.
///
/// Entries are returned by value and never alias the cache's interior;
/// mutating the cache after a read does not affect entries already handed
/// out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<T> {
    index: usize,
    item: T,
}

impl<T> Entry<T> {
    /// Creates an entry holding `item` at absolute position `index`.
    pub fn new(index: usize, item: T) -> Self {
        Self { index, item }
    }

    /// Absolute index of the item in the remote list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based position, as presented to end users.
    pub fn display_index(&self) -> usize {
        self.index + 1
    }

    /// The cached payload.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Consumes the entry, returning the payload.
    pub fn into_item(self) -> T {
        self.item
    }
}
