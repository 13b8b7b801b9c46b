use serde_json::{json, Value};

use crate::images::{EncodedImage, GarmentVariant, ImageSlot};

const SINGLE_GARMENT_INSTRUCTION: &str = "Dress the person in the first image in the clothing \
shown in the second image. The result must show exactly one person, and that person must be \
the person from the first image; never generate a different person. Keep the face, hairstyle, \
pose, body, and background of the first image unchanged. Replace only the garment, using the \
clothing from the second image, and make the result look photorealistic.";

const TOP_AND_BOTTOM_INSTRUCTION: &str = "Dress the person in the first image in the top \
shown in the second image and the bottom shown in the third image. The result must show \
exactly one person, and that person must be the person from the first image; never generate a \
different person. Keep the face, hairstyle, pose, body, and background of the first image \
unchanged. Replace only the garments, using the top from the second image and the bottom from \
the third image, and make the result look photorealistic.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    Image { slot: ImageSlot, image: EncodedImage },
    Text(String),
}

impl RequestPart {
    /// Wire shape of one `generateContent` part.
    pub fn to_wire(&self) -> Value {
        match self {
            RequestPart::Image { image, .. } => json!({
                "inlineData": {
                    "mimeType": image.media_type(),
                    "data": image.payload(),
                }
            }),
            RequestPart::Text(text) => json!({ "text": text }),
        }
    }
}

/// Ordered multi-part request: image parts first, then one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    variant: GarmentVariant,
    parts: Vec<RequestPart>,
}

impl GenerationRequest {
    pub fn variant(&self) -> GarmentVariant {
        self.variant
    }

    pub fn parts(&self) -> &[RequestPart] {
        &self.parts
    }

    pub fn images(&self) -> impl Iterator<Item = &EncodedImage> {
        self.parts.iter().filter_map(|part| match part {
            RequestPart::Image { image, .. } => Some(image),
            RequestPart::Text(_) => None,
        })
    }

    pub fn instruction(&self) -> &str {
        self.parts
            .iter()
            .rev()
            .find_map(|part| match part {
                RequestPart::Text(text) => Some(text.as_str()),
                RequestPart::Image { .. } => None,
            })
            .unwrap_or_default()
    }

    pub fn wire_parts(&self) -> Vec<Value> {
        self.parts.iter().map(RequestPart::to_wire).collect()
    }
}

pub fn instruction_for(variant: GarmentVariant) -> &'static str {
    match variant {
        GarmentVariant::Single => SINGLE_GARMENT_INSTRUCTION,
        GarmentVariant::TopAndBottom => TOP_AND_BOTTOM_INSTRUCTION,
    }
}

/// Assembles `[person, clothing…, instruction]`.
///
/// `clothing` must hold exactly one item (single garment) or two (top then
/// bottom). Any other length is a caller bug; the trigger path only calls
/// this once every slot is filled.
pub fn build(person: &EncodedImage, clothing: &[EncodedImage]) -> GenerationRequest {
    let variant = GarmentVariant::for_clothing_count(clothing.len());
    assert!(
        variant.is_some(),
        "try-on request needs 1 or 2 clothing images, got {}",
        clothing.len()
    );
    let variant = variant.unwrap_or_default();

    let mut parts = Vec::with_capacity(variant.image_count() + 1);
    parts.push(RequestPart::Image {
        slot: ImageSlot::Person,
        image: person.clone(),
    });
    for (slot, image) in variant.clothing_slots().iter().zip(clothing) {
        parts.push(RequestPart::Image {
            slot: *slot,
            image: image.clone(),
        });
    }
    parts.push(RequestPart::Text(instruction_for(variant).to_string()));

    GenerationRequest { variant, parts }
}
