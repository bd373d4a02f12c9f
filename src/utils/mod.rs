// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod snapshot;

pub use snapshot::SnapshotCell;
