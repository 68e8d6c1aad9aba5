//! Import of projects from Zoho Projects.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use serde::Serialize;

pub mod client;
pub mod sync;

pub use client::ZohoClient;
pub use sync::{SyncSummary, sync_projects};

/// A project as seen by Zoho, already decoded from the wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZohoProject {
    pub id: String,
    pub name: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub owner_email: Option<String>,
}

pub type ZohoFuture<'a, T> = Pin<Box<dyn Future<Output = crate::Result<T>> + Send + 'a>>;

/// Source of projects to synchronize.
pub trait ZohoApi: Send + Sync {
    fn fetch_projects(&self) -> ZohoFuture<'_, Vec<ZohoProject>>;
}
