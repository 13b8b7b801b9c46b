pub mod events;
pub mod images;
pub mod request;

pub use images::{EncodedImage, GarmentVariant, ImageSlot};
pub use request::{build, instruction_for, GenerationRequest, RequestPart};
