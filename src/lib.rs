// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test Signer - Tamper-evident receipts for submitted test answers
//!
//! A caller submits the answers to a test and receives an opaque, sealed
//! signature. Presenting that signature later proves which answers were
//! recorded, when, and for whom.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token authentication (HS256 JWT)
//! - `sealing` - Authenticated encryption of signature tokens
//! - `service` - Signature creation and verification
//! - `storage` - Signature persistence (redb, in-memory)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod sealing;
pub mod service;
pub mod state;
pub mod storage;
