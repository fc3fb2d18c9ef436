// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error recovery for the Recall memory engine.
//!
//! The [`RecoveryCoordinator`] receives recoverable errors together with an
//! operation-specific fallback value and/or retry closure, and applies the
//! strategy assigned to the error's variant: fallback substitution, a single
//! retry against an alternative resource, or exponential backoff. It never
//! returns an error itself; failures come back as a [`RecoveryResult`] with
//! `success == false`.

pub mod coordinator;
pub mod strategy;

pub use coordinator::{
    RecoveryContext, RecoveryCoordinator, RecoveryOptions, RecoveryResult, RetryFn,
};
pub use strategy::{strategy_for, RecoveryStrategy};
