pub mod answer_synthesizer;
pub mod auth;
pub mod captcha;

pub use answer_synthesizer::{synthesize, SynthesisOptions};
pub use auth::{AuthSession, AuthenticatedClient};
pub use captcha::{CaptchaSolver, ManualClassifier, OcrClassifier};
