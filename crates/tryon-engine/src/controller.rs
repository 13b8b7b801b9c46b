use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tryon_contracts::events::{EventWriter, SessionEvent};
use tryon_contracts::{GarmentVariant, ImageSlot};

use crate::client::GenerationClient;
use crate::error::{TriggerRejected, TryOnError};
use crate::ingest::{ingest, ImageSource};
use crate::session::{Session, Status};

/// Drives one [`Session`] against a [`GenerationClient`].
///
/// The session lock is only held for the synchronous transitions, never
/// across the remote call, so uploads made while a request is in flight are
/// picked up by the next trigger.
pub struct TryOnController {
    session: Arc<Mutex<Session>>,
    client: Arc<dyn GenerationClient>,
    events: Option<EventWriter>,
}

impl TryOnController {
    pub fn new(variant: GarmentVariant, client: Arc<dyn GenerationClient>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(variant))),
            client,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    /// Copy of the current state for rendering.
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn set_variant(&self, variant: GarmentVariant) -> Result<(), TriggerRejected> {
        self.lock().set_variant(variant)
    }

    /// Reads `source` into `slot`. On failure the slot keeps its previous
    /// image and gets a slot-scoped message; the status is never touched.
    pub async fn load_image(&self, slot: ImageSlot, source: &ImageSource) -> Result<(), TryOnError> {
        match ingest(source).await {
            Ok(image) => {
                let event = SessionEvent::ImageLoaded {
                    slot,
                    media_type: image.media_type().to_string(),
                    bytes: image.byte_len(),
                };
                self.lock().set_image(slot, image);
                self.emit(&event);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(slot = slot.label(), error = %err, "image ingestion failed");
                let message = self.lock().record_slot_failure(slot);
                self.emit(&SessionEvent::ImageFailed { slot, message });
                Err(err)
            }
        }
    }

    /// Runs one generation attempt. Refused without calling the client when
    /// slots are missing or a request is already in flight.
    pub async fn trigger(&self) -> Result<Status, TriggerRejected> {
        let request = self.lock().begin()?;
        tracing::info!(
            client = self.client.name(),
            variant = ?request.variant(),
            "try-on request started"
        );
        self.emit(&SessionEvent::GenerationStarted {
            variant: request.variant(),
            image_parts: request.images().count(),
        });

        let started = Instant::now();
        let result = self.client.generate(&request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let event = match &result {
            Ok(image) => SessionEvent::GenerationSucceeded {
                media_type: image.media_type.clone(),
                latency_ms,
            },
            Err(err) => SessionEvent::GenerationFailed {
                message: err.user_message(),
                latency_ms,
            },
        };
        let status = self.lock().finish(result);
        self.emit(&event);
        Ok(status)
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: &SessionEvent) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.emit(event) {
            tracing::warn!(
                session_id = events.session_id(),
                path = %events.path().display(),
                error = %err,
                "event log write failed"
            );
        }
    }
}
