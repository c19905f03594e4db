use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::catalog::CallDuration;

/// One entry in the in-memory event log. The log is append-only and
/// volatile: it lives for the process lifetime and is lost on restart.
#[derive(Debug, Clone)]
pub enum CallEvent {
    Started {
        conversation_id: String,
        child_age: u8,
        call_duration: CallDuration,
        parent_email: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Completed {
        conversation_id: String,
        actual_duration_seconds: u32,
        parent_rating: Option<u8>,
        parent_feedback: Option<String>,
        child_enjoyed: Option<bool>,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_calls: usize,
    pub calls_today: usize,
    pub average_duration_seconds: f64,
    pub average_rating: f64,
    pub calls_by_duration: HashMap<String, usize>,
    pub calls_by_age: HashMap<String, usize>,
}

impl AnalyticsSummary {
    fn empty() -> Self {
        Self {
            total_calls: 0,
            calls_today: 0,
            average_duration_seconds: 0.0,
            average_rating: 0.0,
            calls_by_duration: HashMap::new(),
            calls_by_age: HashMap::new(),
        }
    }
}

/// Sole owner of the event log. Appends go through the lock so concurrent
/// requests never corrupt or drop entries; reads see only fully-appended
/// events.
#[derive(Debug, Default)]
pub struct AnalyticsStore {
    events: RwLock<Vec<CallEvent>>,
}

impl AnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, event: CallEvent) {
        self.events.write().await.push(event);
    }

    pub async fn started_count(&self) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| matches!(event, CallEvent::Started { .. }))
            .count()
    }

    /// Recomputes the aggregate from the full log on every call. "Today" is
    /// judged by each event's own timestamp against the current UTC date, so
    /// the count rolls over at the UTC day boundary even for a long-running
    /// process.
    pub async fn summarize(&self) -> AnalyticsSummary {
        let events = self.events.read().await;
        if events.is_empty() {
            return AnalyticsSummary::empty();
        }

        let today = Utc::now().date_naive();

        let mut total_calls = 0usize;
        let mut calls_today = 0usize;
        let mut calls_by_duration: HashMap<String, usize> = HashMap::new();
        let mut calls_by_age: HashMap<String, usize> = HashMap::new();
        let mut duration_sum = 0u64;
        let mut completed = 0usize;
        let mut rating_sum = 0u32;
        let mut rated = 0usize;

        for event in events.iter() {
            match event {
                CallEvent::Started {
                    child_age,
                    call_duration,
                    timestamp,
                    ..
                } => {
                    total_calls += 1;
                    if timestamp.date_naive() == today {
                        calls_today += 1;
                    }
                    *calls_by_duration
                        .entry(call_duration.as_str().to_string())
                        .or_insert(0) += 1;
                    *calls_by_age.entry(child_age.to_string()).or_insert(0) += 1;
                }
                CallEvent::Completed {
                    actual_duration_seconds,
                    parent_rating,
                    ..
                } => {
                    duration_sum += u64::from(*actual_duration_seconds);
                    completed += 1;
                    if let Some(rating) = parent_rating {
                        rating_sum += u32::from(*rating);
                        rated += 1;
                    }
                }
            }
        }

        let average_duration_seconds = if completed > 0 {
            round_to(duration_sum as f64 / completed as f64, 10.0)
        } else {
            0.0
        };
        let average_rating = if rated > 0 {
            round_to(f64::from(rating_sum) / rated as f64, 100.0)
        } else {
            0.0
        };

        AnalyticsSummary {
            total_calls,
            calls_today,
            average_duration_seconds,
            average_rating,
            calls_by_duration,
            calls_by_age,
        }
    }
}

fn round_to(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}

const RECORDER_QUEUE_CAPACITY: usize = 256;

/// Fire-and-forget front door to the store. Events are queued and drained by
/// a background task so a slow append never delays the response path; a full
/// queue drops the event with a warning instead of blocking.
#[derive(Clone)]
pub struct AnalyticsRecorder {
    tx: mpsc::Sender<CallEvent>,
}

impl AnalyticsRecorder {
    pub fn spawn(store: Arc<AnalyticsStore>) -> Self {
        let (tx, mut rx) = mpsc::channel(RECORDER_QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                store.record(event).await;
            }
            debug!("Analytics recorder channel closed");
        });
        Self { tx }
    }

    pub fn record(&self, event: CallEvent) {
        if let Err(err) = self.tx.try_send(event) {
            warn!("Dropping analytics event: {}", err);
        }
    }
}
