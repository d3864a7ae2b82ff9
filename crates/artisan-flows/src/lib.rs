//! Artisan Flows
//!
//! The use cases built on the generation pipeline. A [`Flow`] fixes its
//! variations, the parameters and media it needs, and the prompt templates
//! for each variation. A variation's template also fixes its capability, so
//! one flow can mix images, text and video. Validation happens here, before
//! the orchestrator runs.
//!
//! | Flow | Variations | Required params | Media |
//! |---|---|---|---|
//! | `enhance-image` | natural, white_background, high_resolution | | image |
//! | `festival-images` | traditional, modern, social_square | festival | image |
//! | `festival-video` | promo_video | festival | optional |
//! | `festival-campaign` | campaign_image, social_square, caption, hashtags, promo_video | festival | image |
//! | `product-details` | description, caption, hashtags | language, platform | image or audio |
//! | `pricing` | pricing | material, hours | optional |
//! | `transcribe` | transcript | | audio |

mod error;
mod flow;
mod prompts;

pub use error::FlowError;
pub use flow::{Flow, MediaRequirement};
