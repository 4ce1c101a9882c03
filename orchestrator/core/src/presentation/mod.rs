// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`agent-dispatch-core`)
//!
//! HTTP surface that translates external requests into pipeline calls.
//! No selection, dispatch or fusion logic lives here.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /query` | `{message, sessionId?}` → `{agentsCalled, responses, fused}` |
//! | `GET /agents` | Registry listing |
//! | `GET /health` | Liveness and agent count |

pub mod api;
