//! Session state machine read by the display layer.
//!
//! `Idle → Loading → {Succeeded, Failed}`; a new trigger from a terminal
//! state re-enters `Loading`. Slot updates never change the status.

use std::collections::HashMap;

use tryon_contracts::{build, EncodedImage, GarmentVariant, GenerationRequest, ImageSlot};

use crate::client::GeneratedImage;
use crate::error::{slot_error_message, TriggerRejected, TryOnError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// What the last finished generation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Image(GeneratedImage),
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    variant: GarmentVariant,
    images: HashMap<ImageSlot, EncodedImage>,
    slot_errors: HashMap<ImageSlot, String>,
    status: Status,
    outcome: Option<Outcome>,
}

impl Session {
    pub fn new(variant: GarmentVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn variant(&self) -> GarmentVariant {
        self.variant
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        match self.outcome.as_ref()? {
            Outcome::Error(message) => Some(message.as_str()),
            Outcome::Image(_) => None,
        }
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&EncodedImage> {
        self.images.get(&slot)
    }

    pub fn preview(&self, slot: ImageSlot) -> Option<&str> {
        self.image(slot).map(EncodedImage::preview)
    }

    pub fn slot_error(&self, slot: ImageSlot) -> Option<&str> {
        self.slot_errors.get(&slot).map(String::as_str)
    }

    /// Slots the active variant still needs, person first.
    pub fn missing_slots(&self) -> Vec<ImageSlot> {
        self.required_slots()
            .filter(|slot| !self.images.contains_key(slot))
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.missing_slots().is_empty()
    }

    /// Whether the trigger affordance should be enabled.
    pub fn can_trigger(&self) -> bool {
        self.status != Status::Loading && self.is_ready()
    }

    /// Replaces the image in `slot`. Allowed in every state; only the next
    /// request sees the new image.
    pub fn set_image(&mut self, slot: ImageSlot, image: EncodedImage) {
        self.slot_errors.remove(&slot);
        self.images.insert(slot, image);
    }

    /// Records a failed upload for `slot`, keeping whatever image it held.
    pub fn record_slot_failure(&mut self, slot: ImageSlot) -> String {
        let message = slot_error_message(slot);
        self.slot_errors.insert(slot, message.clone());
        message
    }

    /// Switches garment configuration, keeping the person image.
    pub fn set_variant(&mut self, variant: GarmentVariant) -> Result<(), TriggerRejected> {
        if self.status == Status::Loading {
            return Err(TriggerRejected::InFlight);
        }
        self.variant = variant;
        let keep: Vec<ImageSlot> = self.required_slots().collect();
        self.images.retain(|slot, _| keep.contains(slot));
        self.slot_errors.retain(|slot, _| keep.contains(slot));
        Ok(())
    }

    /// Enters `Loading` and returns the request to send.
    ///
    /// Refused, with the session untouched, while a request is in flight or
    /// while any required slot is empty. On success the previous outcome and
    /// every slot error are cleared.
    pub fn begin(&mut self) -> Result<GenerationRequest, TriggerRejected> {
        if self.status == Status::Loading {
            return Err(TriggerRejected::InFlight);
        }
        let missing = self.missing_slots();
        if !missing.is_empty() {
            return Err(TriggerRejected::MissingImages(missing));
        }

        let mut clothing = Vec::with_capacity(self.variant.clothing_slots().len());
        for slot in self.variant.clothing_slots() {
            match self.images.get(slot) {
                Some(image) => clothing.push(image.clone()),
                None => return Err(TriggerRejected::MissingImages(vec![*slot])),
            }
        }
        let Some(person) = self.images.get(&ImageSlot::Person) else {
            return Err(TriggerRejected::MissingImages(vec![ImageSlot::Person]));
        };
        let request = build(person, &clothing);

        self.outcome = None;
        self.slot_errors.clear();
        self.status = Status::Loading;
        Ok(request)
    }

    /// Leaves `Loading` with the outcome of the remote call.
    pub fn finish(&mut self, result: Result<GeneratedImage, TryOnError>) -> Status {
        match result {
            Ok(image) => {
                self.outcome = Some(Outcome::Image(image));
                self.status = Status::Succeeded;
            }
            Err(err) => {
                self.outcome = Some(Outcome::Error(format!(
                    "Failed to generate image: {}",
                    err.user_message()
                )));
                self.status = Status::Failed;
            }
        }
        self.status
    }

    fn required_slots(&self) -> impl Iterator<Item = ImageSlot> + '_ {
        std::iter::once(ImageSlot::Person).chain(self.variant.clothing_slots().iter().copied())
    }
}
