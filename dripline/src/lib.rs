//! dripline: queue-driven outreach email delivery.
//!
//! Dispatches campaign batch emails and walks multi-step drip sequences,
//! tracking per-recipient delivery outcomes in a relational store and
//! sending through provider-specific transports (SMTP, OAuth2-refreshed
//! Gmail, or a log-only console transport).
//!
//! # Architecture
//!
//! - [`jobs`]: in-process durable-queue semantics: typed job payloads,
//!   delayed enqueue, one consumer per queue, retry with exponential
//!   backoff, retained dead letters.
//! - [`email`]: message type, transport trait, provider backends, and the
//!   account registry with its `default` fallback.
//! - [`outreach`]: the campaign and sequence-step job handlers, the delay
//!   calculator, and the [`outreach::OutreachRuntime`] composition root.
//! - [`store`]: campaign/sequence/step/tracking entities behind the
//!   [`store::OutreachStore`] trait, with a Postgres implementation.
//! - [`config`]: figment-loaded worker configuration.
//! - [`testing`]: in-memory doubles for embedding applications and tests.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use dripline::config::Config;
//! use dripline::email::TransportRegistry;
//! use dripline::outreach::{OutreachRuntime, SendCampaignJob};
//! use dripline::store::PgStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let pool = sqlx::PgPool::connect(&config.database.url).await?;
//!
//! let runtime = OutreachRuntime::start(
//!     Arc::new(PgStore::new(pool)),
//!     Arc::new(TransportRegistry::from_providers(config.providers.clone())),
//!     &config.worker,
//! );
//!
//! runtime.launch_campaign(SendCampaignJob {
//!     campaign_id: 1,
//!     user_id: 7,
//!     from_account: "sales@myapp.com".into(),
//!     subject: "Hello".into(),
//!     body: "<p>Hi!</p>".into(),
//!     recipients: vec!["prospect@example.com".into()],
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod email;
pub mod jobs;
pub mod outreach;
pub mod store;
pub mod testing;
