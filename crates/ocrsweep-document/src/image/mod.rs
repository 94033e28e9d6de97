// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — page loading, region cropping, and PNG encoding.

pub mod processor;

pub use processor::{PageImage, encode_png};
