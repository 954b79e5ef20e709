//! # Syncsched Server
//!
//! HTTP operations surface for the syncsched periodic task scheduler.
//!
//! ## Overview
//!
//! `syncsched-server` exposes the scheduler's administrative operations over a
//! small JSON API: reconciling triggers against storage, inspecting scheduler
//! state, validating cron expressions, and submitting immediate executions to
//! the task runner.
//!
//! ```text
//! ┌──────────────┐   fetch configs   ┌────────────────────────────┐
//! │ Config store │ ─────────────────▶│                            │
//! └──────────────┘                   │      syncsched-server      │
//!                                    │  (reconciliation + HTTP)   │
//! ┌──────────────┐   submit/result   │                            │
//! │ Task runner  │ ◀────────────────▶│                            │
//! └──────────────┘                   └────────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! | Method | Path | Effect |
//! |---|---|---|
//! | POST | `/task/scheduler/refresh-tasks` | reconcile triggers from storage |
//! | GET | `/task/scheduler/task-status` | scheduler state snapshot |
//! | POST | `/task/scheduler/validate-cron` | validate a cron expression |
//! | DELETE | `/task/scheduler/clear-tasks` | cancel every trigger |
//! | POST | `/task/scheduler/execute-sync/{config_id}` | submit one immediate execution |
//! | POST | `/task/scheduler/execute-all-enabled` | submit one execution per enabled config |
//! | GET | `/task/scheduler/task-result/{task_id}` | current task result |

pub mod error;
pub mod message;
pub mod server;

pub use error::{Error, Result};
pub use server::{router, AppState, SchedulerServer};
