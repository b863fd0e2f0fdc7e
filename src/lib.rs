//! Client core for the NexusFlow issue tracker.
//!
//! | Module       | Responsibility                                          |
//! |--------------|---------------------------------------------------------|
//! | `models`     | Domain types: `Project`, `Issue`, `OrgMember`, `Invite` |
//! | `wire`       | Wire DTOs, response envelopes, enum translation         |
//! | `api`        | `Api` trait and the reqwest-backed `HttpApi`            |
//! | `store`      | `Store` actions, `AppState`, `StoreEvent`               |
//! | `board`      | Column grouping and drag planning                       |
//! | `validation` | Client-side form checks                                 |
//! | `config`     | Layered configuration (file, env, CLI)                  |
//! | `errors`     | `ClientError`, `ValidationErrors`                       |

pub mod api;
pub mod board;
pub mod config;
pub mod errors;
pub mod models;
pub mod store;
pub mod validation;
pub mod wire;

pub use api::{Api, HttpApi};
pub use errors::{ClientError, ValidationErrors};
pub use store::{AppState, PendingUpdate, Store, StoreEvent};
