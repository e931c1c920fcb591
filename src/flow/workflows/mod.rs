// SPDX-License-Identifier: MIT

//! Workflows shipped with the service

pub mod code_review;
